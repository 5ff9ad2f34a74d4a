//! Remote store port (driven/secondary port)
//!
//! The contract every storage backend satisfies: enumerate the files under
//! a remote root, and upload a batch of local files one at a time while
//! reporting each completed transfer as soon as it lands.
//!
//! ## Design Notes
//!
//! - Backends are selected once at startup and used through
//!   `Arc<dyn RemoteStore>`; nothing switches them at runtime.
//! - `upload` returns a stream rather than a future so the caller can
//!   react to every confirmed transfer (log it, delete the local copy)
//!   before the next one starts.
//! - Errors are classified with [`StoreError`]; adapters use `anyhow`
//!   internally and map at this boundary.

use std::path::PathBuf;

use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::newtypes::{PathSet, RelativePath};
use crate::domain::remote::{RemoteDestination, RemoteRoot};

// ============================================================================
// StoreError
// ============================================================================

/// Errors surfaced by a [`RemoteStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The remote root name matched nothing
    #[error("Remote folder \"{0}\" not found")]
    RootNotFound(String),

    /// The remote root name matched more than one object
    #[error("Several folders ({count}) were found with the same name \"{name}\"")]
    AmbiguousRoot {
        /// The name that was looked up
        name: String,
        /// How many objects matched
        count: usize,
    },

    /// The root reference is of the wrong kind for this backend
    #[error("Invalid remote root: {0}")]
    InvalidRoot(String),

    /// The backend could not be reached or refused the request
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// An authenticated session could not be established
    #[error("Session error: {0}")]
    Session(String),

    /// A single transfer failed; the rest of the batch was not attempted
    #[error("Upload failed for {path}: {reason}")]
    UploadFailed {
        /// Local source of the failed transfer
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

impl StoreError {
    /// Builds a `BackendUnavailable` from an adapter error, keeping its chain
    pub fn unavailable(err: &anyhow::Error) -> Self {
        Self::BackendUnavailable(format!("{err:#}"))
    }

    /// Builds an `UploadFailed` from an adapter error, keeping its chain
    pub fn upload_failed(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self::UploadFailed {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }

    /// Whether the error stems from configuration rather than a transient
    /// backend condition
    ///
    /// Configuration errors are never worth retrying.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::RootNotFound(_) | Self::AmbiguousRoot { .. } | Self::InvalidRoot(_)
        )
    }
}

// ============================================================================
// Upload DTOs
// ============================================================================

/// A single pending transfer: a local source and where it should land
///
/// Constructed per batch and consumed immediately by [`RemoteStore::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Absolute local path of the file
    pub source: PathBuf,
    /// The file's path relative to the local root
    pub relative: RelativePath,
    /// Destination folder and name on the remote
    pub destination: RemoteDestination,
}

impl UploadTask {
    /// Creates a task for `relative` below `local_root`, targeting `remote_root`
    pub fn new(
        local_root: &std::path::Path,
        relative: RelativePath,
        remote_root: &RemoteRoot,
    ) -> Self {
        Self {
            source: relative.to_local(local_root),
            destination: remote_root.destination_for(&relative),
            relative,
        }
    }
}

/// Outcome of one completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Name the remote reports for the created file
    pub display_name: String,
    /// Local source that was uploaded
    pub source: PathBuf,
    /// The file's path relative to the local root
    pub relative: RelativePath,
}

impl UploadResult {
    /// Builds the result for a finished task
    pub fn completed(task: UploadTask, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            source: task.source,
            relative: task.relative,
        }
    }
}

/// Lazy per-item upload results, in input order
pub type UploadStream<'a> = BoxStream<'a, Result<UploadResult, StoreError>>;

// ============================================================================
// RemoteStore trait
// ============================================================================

/// Port trait for remote storage backends
///
/// ## Implementation Notes
///
/// - `list_tree` returns paths relative to `root`. An empty root yields an
///   empty set; an unreachable or invalid root fails with
///   [`StoreError::BackendUnavailable`] or [`StoreError::InvalidRoot`].
/// - `upload` transfers items one at a time in input order and yields each
///   result right after its transfer completes. The first failure is
///   yielded as [`StoreError::UploadFailed`] and ends the stream; later
///   items are not attempted.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable backend name, for logs
    fn name(&self) -> &str;

    /// The remote root this store mirrors into
    fn root(&self) -> &RemoteRoot;

    /// Enumerates every file under `root`
    async fn list_tree(&self, root: &RemoteRoot) -> Result<PathSet, StoreError>;

    /// Uploads `batch` sequentially, yielding one result per transfer
    fn upload(&self, batch: Vec<UploadTask>) -> UploadStream<'_>;
}
