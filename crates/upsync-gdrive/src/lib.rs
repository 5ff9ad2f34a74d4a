//! upsync gdrive - Google Drive v3 backend
//!
//! Provides async client for:
//! - OAuth2 access tokens from a service-account key or an authorized-user
//!   credential file
//! - Drive file queries (`files.list`) with pagination
//! - Resumable uploads in fixed-size chunks
//!
//! ## Modules
//!
//! - [`auth`] - Credential file loading and token refresh
//! - [`client`] - Drive API HTTP client
//! - [`upload`] - Resumable upload sessions
//! - [`store`] - [`RemoteStore`](upsync_core::ports::RemoteStore) implementation

pub mod auth;
pub mod client;
pub mod store;
pub mod upload;

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

pub use store::GoogleDriveStore;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other unexpected status
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// The HTTP status returned
        status: StatusCode,
        /// Response body, for diagnostics
        body: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl DriveError {
    /// Classifies a non-success HTTP status
    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(body),
            StatusCode::FORBIDDEN => Self::Forbidden(body),
            StatusCode::NOT_FOUND => Self::NotFound(body),
            s if s.is_server_error() => Self::ServerError(format!("{s}: {body}")),
            status => Self::UnexpectedStatus { status, body },
        }
    }
}
