//! Upload orchestrator
//!
//! The [`UploadOrchestrator`] takes a batch of newly appeared local files
//! and makes sure each of them ends up on the remote exactly once.
//!
//! ## Flow
//!
//! 1. **List**: fetch the remote tree fresh (never cached between batches)
//! 2. **Diff**: split the batch into files missing remotely and files
//!    already present
//! 3. **Upload**: transfer the missing files one by one, in path order
//! 4. **Cleanup**: with `clear_downloads`, delete every local file of the
//!    batch once it is known to be on the remote
//!
//! Any store failure aborts the batch. Files deleted before the failure
//! stay deleted; the rest are left untouched and picked up again by the
//! next fresh listing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, instrument};
use upsync_core::domain::diff::{missing_remotely, present_remotely};
use upsync_core::domain::newtypes::{PathSet, RelativePath};
use upsync_core::ports::{RemoteStore, UploadTask};

use crate::filesystem::remove_local_file;
use crate::retry::{with_retry, RetryPolicy};
use crate::SyncError;

// ============================================================================
// BatchReport
// ============================================================================

/// Summary of one orchestrated batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Files transferred during this batch, in upload order
    pub uploaded: Vec<RelativePath>,
    /// Files of the batch that the remote already had
    pub already_remote: Vec<RelativePath>,
    /// Local files removed after being confirmed remotely
    pub deleted: Vec<RelativePath>,
}

// ============================================================================
// NewFilesHandler
// ============================================================================

/// Receives the files that appeared on disk since the previous tick
///
/// The sync loop only knows this seam; [`UploadOrchestrator`] is the
/// production implementation.
#[async_trait::async_trait]
pub trait NewFilesHandler: Send + Sync {
    /// Processes one batch of newly seen files
    async fn handle(&self, batch: &PathSet) -> Result<BatchReport, SyncError>;
}

// ============================================================================
// UploadOrchestrator
// ============================================================================

/// Mirrors batches of new local files to a [`RemoteStore`]
pub struct UploadOrchestrator {
    /// The backend, selected once at startup
    store: Arc<dyn RemoteStore>,
    /// Root the batch paths are relative to
    local_root: PathBuf,
    /// Delete local files once they are confirmed on the remote
    clear_downloads: bool,
    /// Retry policy for the remote listing
    list_retry: RetryPolicy,
}

impl UploadOrchestrator {
    /// Creates an orchestrator with retries disabled
    pub fn new(store: Arc<dyn RemoteStore>, local_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            local_root: local_root.into(),
            clear_downloads: false,
            list_retry: RetryPolicy::none(),
        }
    }

    /// Enables or disables delete-after-upload
    #[must_use]
    pub fn with_clear_downloads(mut self, enabled: bool) -> Self {
        self.clear_downloads = enabled;
        self
    }

    /// Sets the retry policy for the remote listing
    #[must_use]
    pub fn with_list_retry(mut self, policy: RetryPolicy) -> Self {
        self.list_retry = policy;
        self
    }

    /// The local root this orchestrator resolves batch paths against
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    async fn list_remote(&self) -> Result<PathSet, SyncError> {
        let root = self.store.root();
        let remote = with_retry(self.list_retry, "list_tree", || self.store.list_tree(root)).await?;
        debug!(count = remote.len(), %root, "Remote tree listed");
        Ok(remote)
    }

    async fn delete_local(
        &self,
        relative: &RelativePath,
        report: &mut BatchReport,
    ) -> Result<(), SyncError> {
        let path = relative.to_local(&self.local_root);
        if remove_local_file(&path).await? {
            report.deleted.push(relative.clone());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl NewFilesHandler for UploadOrchestrator {
    #[instrument(skip_all, fields(backend = self.store.name(), batch = batch.len()))]
    async fn handle(&self, batch: &PathSet) -> Result<BatchReport, SyncError> {
        let mut report = BatchReport::default();

        let remote = self.list_remote().await?;
        let missing = missing_remotely(batch, &remote);
        let present = present_remotely(batch, &remote);
        report.already_remote = present.iter().cloned().collect();

        if missing.is_empty() {
            if self.clear_downloads {
                for relative in batch {
                    self.delete_local(relative, &mut report).await?;
                }
            }
            info!("All new files already on remote");
            return Ok(report);
        }

        info!(
            count = missing.len(),
            files = ?missing.iter().map(RelativePath::as_str).collect::<Vec<_>>(),
            "Files not on the remote"
        );

        if self.clear_downloads {
            for relative in &present {
                self.delete_local(relative, &mut report).await?;
            }
        }

        let root = self.store.root();
        let tasks: Vec<UploadTask> = missing
            .into_iter()
            .map(|relative| UploadTask::new(&self.local_root, relative, root))
            .collect();

        info!(count = tasks.len(), "Start uploading");

        let mut results = self.store.upload(tasks);
        while let Some(result) = results.next().await {
            let uploaded = result?;
            info!(
                path = %uploaded.relative,
                "\"{}\" has been uploaded",
                uploaded.display_name
            );

            if self.clear_downloads {
                self.delete_local(&uploaded.relative, &mut report).await?;
            }
            report.uploaded.push(uploaded.relative);
        }

        info!(uploaded = report.uploaded.len(), "Uploading finished");
        Ok(report)
    }
}
