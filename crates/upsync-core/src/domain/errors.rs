//! Domain error types
//!
//! Validation failures for relative paths, remote paths and remote root
//! references.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid relative path format or content
    #[error("Invalid relative path: {0}")]
    InvalidRelativePath(String),

    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote folder ID format
    #[error("Invalid folder ID: {0}")]
    InvalidFolderId(String),

    /// Path is not within the root it was resolved against
    #[error("Path not within root: {0}")]
    PathNotInRoot(String),
}
