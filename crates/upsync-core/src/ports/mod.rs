//! Port definitions (hexagonal architecture interfaces)
//!
//! - [`RemoteStore`] - remote storage operations (Google Drive, Synology NAS)

pub mod remote_store;

pub use remote_store::{RemoteStore, StoreError, UploadResult, UploadStream, UploadTask};
