//! Filesystem port for the mail store.
//!
//! Everything that touches the maildir tree goes through [`MailFs`], so tests
//! can run against a temporary directory or a recording fake.

use std::path::Path;

use tracing::debug;

use crate::error::{EpistleError, Result};

/// The filesystem operations epistle performs on the mail store.
pub trait MailFs {
    fn exists(&self, path: &Path) -> bool;

    /// Names of the immediate subdirectories of `dir`.
    fn list_dir_names(&self, dir: &Path) -> Result<Vec<String>>;

    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;
}

/// The real local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl MailFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir_names(&self, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| EpistleError::io(dir, e))? {
            let entry = entry.map_err(|e| EpistleError::io(dir, e))?;
            // `is_dir` follows symlinks.
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        debug!(from = %from.display(), to = %to.display(), "Copying mail file");
        std::fs::copy(from, to).map_err(|e| EpistleError::io(from, e))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        debug!(from = %from.display(), to = %to.display(), "Moving mail file");
        std::fs::rename(from, to).map_err(|e| EpistleError::io(from, e))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        debug!(path = %path.display(), "Removing mail file");
        std::fs::remove_file(path).map_err(|e| EpistleError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_dir_names_skips_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("b@yahoo.com")).unwrap();
        std::fs::create_dir(tmp.path().join("a@gmail.com")).unwrap();
        std::fs::write(tmp.path().join(".lock"), b"").unwrap();

        let names = LocalFs.list_dir_names(tmp.path()).unwrap();
        assert_eq!(names, vec!["a@gmail.com", "b@yahoo.com"]);
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LocalFs
            .rename(&tmp.path().join("nope"), &tmp.path().join("dest"))
            .unwrap_err();
        assert!(matches!(err, EpistleError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_list_dir_names_follows_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("a@gmail.com")).unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), tmp.path().join("b@yahoo.com")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("missing"), tmp.path().join("dangling"))
            .unwrap();

        let names = LocalFs.list_dir_names(tmp.path()).unwrap();
        assert_eq!(names, vec!["a@gmail.com", "b@yahoo.com"]);
    }
}
