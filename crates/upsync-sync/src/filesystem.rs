//! Local filesystem access for the sync loop
//!
//! Two operations: enumerate every regular file below the local root as a
//! [`PathSet`], and remove a single local file once it is confirmed on the
//! remote.
//!
//! Symbolic links are neither followed nor reported. Directories contribute
//! nothing by themselves; only the files inside them are listed.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use tracing::{debug, instrument, warn};
use upsync_core::domain::newtypes::{PathSet, RelativePath};

use crate::SyncError;

/// Recursively lists every regular file below `root`
///
/// Each entry is named by its `/`-separated path relative to `root`. The
/// result is a set, so the host's directory iteration order does not leak
/// into it.
#[instrument(fields(root = %root.display()))]
pub async fn list_local_files(root: &Path) -> Result<PathSet, SyncError> {
    let mut files = PathSet::new();
    walk_directory(root, root, &mut files).await?;
    debug!(count = files.len(), "Local tree enumerated");
    Ok(files)
}

fn walk_directory<'a>(
    dir: &'a Path,
    root: &'a Path,
    files: &'a mut PathSet,
) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + 'a>> {
    Box::pin(async move {
        let walk_err = |source| SyncError::Walk {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = tokio::fs::read_dir(dir).await.map_err(walk_err)?;

        while let Some(entry) = entries.next_entry().await.map_err(walk_err)? {
            let entry_path = entry.path();

            // file_type() does not follow symlinks
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(err) => {
                    warn!(path = %entry_path.display(), %err, "Skipping unreadable entry");
                    continue;
                }
            };

            if file_type.is_dir() {
                walk_directory(&entry_path, root, files).await?;
            } else if file_type.is_file() {
                match RelativePath::from_local(root, &entry_path) {
                    Ok(rel) => {
                        files.insert(rel);
                    }
                    Err(err) => {
                        warn!(path = %entry_path.display(), %err, "Skipping invalid path");
                    }
                }
            } else {
                debug!(path = %entry_path.display(), "Skipping non-regular file");
            }
        }

        Ok(())
    })
}

/// Removes a local file that is confirmed present on the remote
///
/// A file that is already gone is not an error: it only means someone else
/// cleaned it up first. Returns whether a file was actually removed.
#[instrument(fields(path = %path.display()))]
pub async fn remove_local_file(path: &Path) -> Result<bool, SyncError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Local copy removed");
            Ok(true)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("Local file already removed");
            Ok(false)
        }
        Err(source) => Err(SyncError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
