//! Remote root references and upload destinations

use std::fmt::{self, Display, Formatter};

use super::newtypes::{FolderId, RelativePath, RemotePath};

/// The top-level location on the backend that the local root mirrors into
///
/// Exactly one remote root is active per process. Object-addressed backends
/// hold a folder ID resolved once at startup, path-addressed backends hold
/// an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemoteRoot {
    /// A folder object identified by its ID
    Folder(FolderId),
    /// A folder identified by its absolute path
    Path(RemotePath),
}

impl RemoteRoot {
    /// Computes where a local file should land on the remote
    ///
    /// Path roots keep the nested structure: the destination folder is the
    /// root joined with the relative parent directories. Folder roots are
    /// flat: every file targets the root folder itself under its base name.
    #[must_use]
    pub fn destination_for(&self, relative: &RelativePath) -> RemoteDestination {
        let folder = match self {
            Self::Folder(id) => Self::Folder(id.clone()),
            Self::Path(root) => match relative.parent() {
                Some(parent) => match RelativePath::new(parent) {
                    Ok(parent) => Self::Path(root.join_relative(&parent)),
                    Err(_) => Self::Path(root.clone()),
                },
                None => Self::Path(root.clone()),
            },
        };

        RemoteDestination {
            folder,
            file_name: relative.file_name().to_string(),
        }
    }
}

impl Display for RemoteRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(id) => write!(f, "folder:{id}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

/// Where a single upload lands: a destination folder plus a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDestination {
    /// The folder the file is created in
    pub folder: RemoteRoot,
    /// The name of the created file
    pub file_name: String,
}

impl Display for RemoteDestination {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.folder {
            RemoteRoot::Path(path) if path.as_str() == "/" => write!(f, "/{}", self.file_name),
            folder => write!(f, "{folder}/{}", self.file_name),
        }
    }
}
