//! Backend selection
//!
//! The backend is chosen once from `remote.drive_type` and handed to the
//! engine as a trait object.

use std::sync::Arc;

use tracing::info;
use upsync_core::config::{Config, DriveType};
use upsync_core::ports::{RemoteStore, StoreError};
use upsync_gdrive::GoogleDriveStore;
use upsync_synology::SynologyStore;

/// Builds the configured backend, resolving its remote root
///
/// Both backends talk to the remote here: Google Drive looks the folder up
/// by name, the NAS logs in and lists the root path. A missing root or an
/// unreachable remote is reported before the first scan.
pub async fn connect(config: &Config) -> Result<Arc<dyn RemoteStore>, StoreError> {
    let remote = &config.remote;

    let store: Arc<dyn RemoteStore> = match remote.drive_type {
        DriveType::Google => {
            Arc::new(GoogleDriveStore::from_key_file(&remote.auth_key_path, remote.folder.as_str()).await?)
        }
        DriveType::Synology => {
            Arc::new(SynologyStore::from_key_file(&remote.auth_key_path, &remote.folder).await?)
        }
    };

    info!(
        backend = store.name(),
        root = %store.root(),
        "Remote store ready"
    );
    Ok(store)
}

/// Whether a startup failure ends the process quietly
///
/// Configuration errors, rejected credentials and an unreachable remote are
/// all setup failures: one error line, no scan, success status.
pub fn is_fatal_setup(err: &StoreError) -> bool {
    err.is_configuration()
        || matches!(
            err,
            StoreError::Session(_) | StoreError::BackendUnavailable(_)
        )
}
