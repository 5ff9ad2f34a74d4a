//! GoogleDriveStore - RemoteStore implementation for Google Drive
//!
//! Wraps the [`DriveClient`] and delegates to the client and upload modules
//! to fulfil the [`RemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - The root folder is resolved once, by exact name, when the store is
//!   connected. Zero matches or several matches are configuration errors.
//! - Drive has no real paths: `list_tree` rebuilds them by descending
//!   parent/child queries from the root folder.
//! - Uploads are flat: every file lands directly in the root folder under
//!   its base name, whatever its relative path locally.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use futures_util::stream;
use tracing::{debug, info, warn};

use upsync_core::domain::newtypes::{FolderId, PathSet, RelativePath};
use upsync_core::domain::remote::RemoteRoot;
use upsync_core::ports::{RemoteStore, StoreError, UploadResult, UploadStream, UploadTask};

use crate::auth::{CredentialKey, TokenSource};
use crate::client::DriveClient;
use crate::upload;

/// Remote store backed by a single Google Drive folder
pub struct GoogleDriveStore {
    /// Drive API client
    client: DriveClient,
    /// The configured folder name, for logs
    folder_name: String,
    /// The resolved root folder
    root: RemoteRoot,
}

impl GoogleDriveStore {
    /// Resolves `folder_name` to a unique folder and returns a store rooted there
    ///
    /// # Errors
    /// - [`StoreError::RootNotFound`] if no folder has that name
    /// - [`StoreError::AmbiguousRoot`] if several folders share it
    /// - [`StoreError::BackendUnavailable`] if the lookup itself fails
    pub async fn connect(
        client: DriveClient,
        folder_name: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let folder_name = folder_name.into();

        let matches = client
            .find_folders_by_name(&folder_name)
            .await
            .map_err(|e| StoreError::unavailable(&e))?;

        let folder = match matches.as_slice() {
            [] => return Err(StoreError::RootNotFound(folder_name)),
            [single] => single,
            several => {
                return Err(StoreError::AmbiguousRoot {
                    name: folder_name,
                    count: several.len(),
                })
            }
        };

        let id = FolderId::new(folder.id.clone())
            .map_err(|e| StoreError::InvalidRoot(e.to_string()))?;

        info!(folder = %folder_name, id = %id, "Resolved Drive root folder");

        Ok(Self {
            client,
            folder_name,
            root: RemoteRoot::Folder(id),
        })
    }

    /// Loads credentials from `key_path` and connects to the Drive API
    pub async fn from_key_file(
        key_path: &Path,
        folder_name: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let session = |e: anyhow::Error| StoreError::Session(format!("{e:#}"));

        let key = CredentialKey::load(key_path).map_err(session)?;
        let tokens = TokenSource::from_key(&key).map_err(session)?;
        let client = DriveClient::new(tokens).map_err(session)?;
        Self::connect(client, folder_name).await
    }

    /// Recursively collects the files below `folder_id`
    ///
    /// A folder without children contributes its own path.
    fn walk_folder<'a>(
        &'a self,
        folder_id: &'a str,
        prefix: Option<&'a RelativePath>,
        out: &'a mut PathSet,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let children = self.client.list_children(folder_id).await?;

            if children.is_empty() {
                if let Some(prefix) = prefix {
                    out.insert(prefix.clone());
                }
                return Ok(());
            }

            for child in children {
                let joined = match prefix {
                    Some(p) => format!("{}/{}", p, child.name),
                    None => child.name.clone(),
                };
                let path = match RelativePath::new(&joined) {
                    Ok(path) => path,
                    Err(err) => {
                        warn!(name = %child.name, %err, "Skipping remote entry");
                        continue;
                    }
                };

                if child.is_folder() {
                    self.walk_folder(&child.id, Some(&path), out).await?;
                } else {
                    out.insert(path);
                }
            }

            Ok(())
        })
    }
}

#[async_trait::async_trait]
impl RemoteStore for GoogleDriveStore {
    fn name(&self) -> &str {
        "google-drive"
    }

    fn root(&self) -> &RemoteRoot {
        &self.root
    }

    async fn list_tree(&self, root: &RemoteRoot) -> Result<PathSet, StoreError> {
        let RemoteRoot::Folder(id) = root else {
            return Err(StoreError::InvalidRoot(format!(
                "Drive roots are folder IDs, got {root}"
            )));
        };

        let mut files = PathSet::new();
        self.walk_folder(id.as_str(), None, &mut files)
            .await
            .map_err(|e| StoreError::unavailable(&e))?;

        debug!(folder = %self.folder_name, count = files.len(), "Drive tree listed");
        Ok(files)
    }

    fn upload(&self, batch: Vec<UploadTask>) -> UploadStream<'_> {
        Box::pin(stream::unfold(
            (batch.into_iter(), false),
            move |(mut tasks, failed)| async move {
                if failed {
                    return None;
                }
                let task = tasks.next()?;

                let outcome = match &task.destination.folder {
                    RemoteRoot::Folder(parent) => upload::upload_file(
                        &self.client,
                        parent.as_str(),
                        &task.destination.file_name,
                        &task.source,
                    )
                    .await
                    .map_err(|e| StoreError::upload_failed(&task.source, &e)),
                    other => Err(StoreError::UploadFailed {
                        path: task.source.clone(),
                        reason: format!("Drive uploads need a folder ID, got {other}"),
                    }),
                };

                match outcome {
                    Ok(created) => Some((
                        Ok(UploadResult::completed(task, created.name)),
                        (tasks, false),
                    )),
                    Err(err) => Some((Err(err), (tasks, true))),
                }
            },
        ))
    }
}
