//! The mail store root that the index covers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{EpistleError, Result};

/// Absolute path of the mail store root (notmuch's `database.path`).
///
/// Cheap to clone; every [`Message`](super::message::Message) from a query
/// holds one so it can relativize its own file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLocation(Arc<Path>);

impl IndexLocation {
    /// Wrap an absolute path. Relative paths are rejected.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(EpistleError::InvalidLocation(format!(
                "'{}' is not an absolute path",
                path.display()
            )));
        }
        Ok(Self(Arc::from(path)))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// `path` relative to the store root.
    pub fn relativize<'a>(&self, path: &'a Path) -> Result<&'a Path> {
        path.strip_prefix(&self.0)
            .map_err(|_| EpistleError::PathOutsideStore {
                path: path.to_path_buf(),
                root: self.0.to_path_buf(),
            })
    }

    /// Path of the index write-lock marker.
    pub fn lock_marker(&self) -> PathBuf {
        self.0.join(".lock")
    }
}

impl fmt::Display for IndexLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
