//! upsync Synology - File Station Web API backend
//!
//! Implements the [`RemoteStore`](upsync_core::ports::RemoteStore) port on
//! top of a Synology NAS:
//! - **Credentials** - connection details loaded from a JSON key file
//! - **Session** - `SYNO.API.Auth` login/logout, scoped to one operation
//! - **Client** - `SYNO.FileStation.List` and `SYNO.FileStation.Upload`
//! - **Store** - the `RemoteStore` adapter rooted at an absolute NAS path

pub mod client;
pub mod credentials;
pub mod session;
pub mod store;

use reqwest::StatusCode;
use thiserror::Error;

pub use credentials::NasCredentials;
pub use store::SynologyStore;

/// Errors reported by the Synology Web API
#[derive(Debug, Error)]
pub enum SynologyError {
    /// The API answered `success: false`
    #[error("{api} failed with code {code}: {}", describe(api, *code))]
    Api {
        /// The API that was called, e.g. `SYNO.FileStation.List`
        api: &'static str,
        /// The error code from the response envelope
        code: i64,
    },

    /// The HTTP request itself failed
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

    /// The envelope could not be parsed or was missing its data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SynologyError {
    /// Returns true when the error means the session is no longer valid
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api { code: 106 | 107 | 119, .. })
    }
}

/// Human-readable text for a Web API error code
///
/// Codes below 400 are shared by every API; from 400 up they depend on
/// which API answered.
pub fn describe(api: &str, code: i64) -> &'static str {
    match code {
        100 => "Unknown error",
        101 => "No parameter of API, method or version",
        102 => "The requested API does not exist",
        103 => "The requested method does not exist",
        104 => "The requested version does not support the functionality",
        105 => "The logged in session does not have permission",
        106 => "Session timeout",
        107 => "Session interrupted by duplicate login",
        119 => "SID not found",
        _ if api == session::AUTH_API => match code {
            400 => "No such account or incorrect password",
            401 => "Account disabled",
            402 => "Permission denied",
            403 => "2-step verification code required",
            404 => "Failed to authenticate 2-step verification code",
            _ => "Unknown authentication error",
        },
        400 => "Invalid parameter of file operation",
        401 => "Unknown error of file operation",
        402 => "System is too busy",
        403 => "Invalid user does this file operation",
        404 => "Invalid group does this file operation",
        405 => "Invalid user and group does this file operation",
        406 => "Can't get user/group information from the account server",
        407 => "Operation not permitted",
        408 => "No such file or directory",
        409 => "Non-supported file system",
        410 => "Failed to connect internet-based file system",
        411 => "Read-only file system",
        412 => "Filename too long in the non-encrypted file system",
        413 => "Filename too long in the encrypted file system",
        414 => "File already exists",
        415 => "Disk quota exceeded",
        416 => "No space left on device",
        417 => "Input/output error",
        418 => "Illegal name or path",
        419 => "Illegal file name",
        420 => "Illegal file name on FAT file system",
        421 => "Device or resource busy",
        599 => "No such task of the file operation",
        1800 => "Upload: content length missing or file info incomplete",
        1801 => "Upload: timed out waiting for data",
        1802 => "Upload: no file name in the file information",
        1803 => "Upload: connection cancelled",
        1804 => "Upload: file too big for the file system",
        1805 => "Upload: cannot overwrite or skip the existing file",
        _ => "Unrecognized error code",
    }
}
