//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the values the engine compares and passes
//! around. Each newtype validates at construction time.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// RelativePath
// ============================================================================

/// A file location relative to its root, using `/` as separator
///
/// This is the comparison key between local and remote state, so the same
/// file always produces the same value regardless of the host separator:
/// - never empty, never absolute
/// - no `.` or `..` components, no empty components
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a RelativePath from a `/`-separated string
    ///
    /// Leading, trailing and repeated separators as well as `.` components
    /// are dropped.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidRelativePath` if the path is empty or
    /// contains a `..` component
    pub fn new(path: impl AsRef<str>) -> Result<Self, DomainError> {
        let raw = path.as_ref();
        let mut parts = Vec::new();

        for part in raw.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    return Err(DomainError::InvalidRelativePath(format!(
                        "Path escapes its root: {raw}"
                    )));
                }
                other => parts.push(other),
            }
        }

        if parts.is_empty() {
            return Err(DomainError::InvalidRelativePath(format!(
                "Path has no components: '{raw}'"
            )));
        }

        Ok(Self(parts.join("/")))
    }

    /// Build a RelativePath from a local path below `root`
    ///
    /// Uses the host path components, so Windows separators are normalized
    /// to `/` as well.
    ///
    /// # Errors
    /// Returns an error if `path` is not below `root` or a component is not
    /// valid UTF-8
    pub fn from_local(root: &Path, path: &Path) -> Result<Self, DomainError> {
        let stripped = path.strip_prefix(root).map_err(|_| {
            DomainError::PathNotInRoot(format!(
                "{} is not within {}",
                path.display(),
                root.display()
            ))
        })?;

        let mut parts = Vec::new();
        for component in stripped.components() {
            match component {
                Component::Normal(c) => {
                    let s = c.to_str().ok_or_else(|| {
                        DomainError::InvalidRelativePath(format!(
                            "Non UTF-8 component in {}",
                            path.display()
                        ))
                    })?;
                    parts.push(s);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidRelativePath(format!(
                        "Unexpected component in {}",
                        stripped.display()
                    )));
                }
            }
        }

        Self::new(parts.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last component (the file name)
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The components before the file name, if any
    ///
    /// `"a/b/c.txt"` has parent `"a/b"`; `"c.txt"` has none.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.0.rfind('/').map(|idx| &self.0[..idx])
    }

    /// Iterate over the `/`-separated components
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Resolve this path below a local root directory
    #[must_use]
    pub fn to_local(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for component in self.components() {
            path.push(component);
        }
        path
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

/// A set of relative paths
///
/// Used uniformly for files on disk, files on the remote, and files newly
/// seen since the last poll. Ordered so logs and iteration are stable.
pub type PathSet = BTreeSet<RelativePath>;

// ============================================================================
// RemotePath
// ============================================================================

/// An absolute remote path (must start with /)
///
/// Used by path-addressed backends, e.g. "/home/uploads/report.pdf".
/// A trailing slash is dropped except for the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new RemotePath
    ///
    /// # Errors
    /// Returns error if path doesn't start with /, contains double slashes
    /// or a `..` component
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let mut path = path.into();

        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path must start with '/': {path}"
            )));
        }

        while path.len() > 1 && path.ends_with('/') {
            path.pop();
        }

        if path.contains("//") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains invalid double slashes: {path}"
            )));
        }

        if path.split('/').any(|c| c == "..") {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path contains invalid traversal: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join every component of a relative path
    #[must_use]
    pub fn join_relative(&self, relative: &RelativePath) -> Self {
        let mut path = self.0.clone();
        for component in relative.components() {
            if !path.ends_with('/') {
                path.push('/');
            }
            path.push_str(component);
        }
        // RelativePath components are already validated
        Self(path)
    }

    /// Strip this path from the front of `other`, yielding a relative path
    ///
    /// Returns `None` when `other` is this path itself or lies outside it.
    #[must_use]
    pub fn relative(&self, other: &str) -> Option<RelativePath> {
        let rest = if self.0 == "/" {
            other.strip_prefix('/')?
        } else {
            other.strip_prefix(self.0.as_str())?.strip_prefix('/')?
        };
        RelativePath::new(rest).ok()
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// FolderId
// ============================================================================

/// Opaque identifier of a remote folder object (e.g. a Drive file ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId(String);

impl FolderId {
    /// Create a new FolderId
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains characters outside
    /// `[A-Za-z0-9_-]`
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidFolderId(
                "Folder ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidFolderId(format!(
                "Folder ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FolderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for FolderId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.0
    }
}

// ============================================================================
// Tests
// ============================================================================
