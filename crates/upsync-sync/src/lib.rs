//! upsync sync - poll, diff and upload engine
//!
//! Provides:
//! - Recursive enumeration of the local tree
//! - Upload orchestration against any [`RemoteStore`](upsync_core::ports::RemoteStore)
//! - The poll loop that feeds newly appeared files to the orchestrator
//!
//! ## Modules
//!
//! - [`filesystem`] - Local tree walk and local cleanup
//! - [`orchestrator`] - Per-batch listing, upload and delete-after-upload
//! - [`retry`] - Exponential backoff for the remote listing
//! - [`scheduler`] - The snapshot-owning poll loop

pub mod filesystem;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;

use std::path::PathBuf;

use thiserror::Error;
use upsync_core::domain::errors::DomainError;
use upsync_core::ports::StoreError;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local tree could not be read
    #[error("Failed to read directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A local file confirmed on the remote could not be removed
    #[error("Failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote backend failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A domain-level error propagated from upsync-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Whether the error comes from configuration (bad or ambiguous root)
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_configuration())
    }
}
