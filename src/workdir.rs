//! Working directories owned by one protein.
//!
//! Every file a [`Protein`](crate::Protein) reads or writes lives under its [`WorkDir`].
//! Operations touching the directory hold a [`WorkDirGuard`], which creates the directory
//! and holds an advisory lock on a marker file for the duration of the operation. The lock
//! is released when the guard drops, including on early returns through `?`, and by the OS
//! when the process dies. The marker file itself stays in place.

use crate::ops::Error;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".holoforge.lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Creates the directory if needed and takes its lock.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or another operation holds the lock.
    pub fn enter(&self) -> Result<WorkDirGuard<'_>, Error> {
        fs::create_dir_all(&self.path).map_err(|e| Error::filesystem(e, &self.path))?;

        let path = self.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::filesystem(e, &path))?;
        match lock.try_lock() {
            Ok(()) => Ok(WorkDirGuard { dir: self, lock }),
            Err(TryLockError::WouldBlock) => Err(Error::filesystem(
                std::io::Error::new(
                    ErrorKind::WouldBlock,
                    "working directory is in use by another operation",
                ),
                path,
            )),
            Err(TryLockError::Error(e)) => Err(Error::filesystem(e, path)),
        }
    }
}

/// Scope during which the working directory is in use.
#[derive(Debug)]
pub struct WorkDirGuard<'a> {
    dir: &'a WorkDir,
    lock: File,
}

impl WorkDirGuard<'_> {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.join(name)
    }

    /// Copies `source` into the directory as `file_name` and returns the new path.
    ///
    /// Nothing is copied when `source` already is that file.
    pub fn import(&self, source: &Path, file_name: impl AsRef<Path>) -> Result<PathBuf, Error> {
        let dest = self.join(file_name);
        let same = match (source.canonicalize(), dest.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same {
            fs::copy(source, &dest).map_err(|e| Error::filesystem(e, source))?;
            log::debug!("Copied {} to {}", source.display(), dest.display());
        }
        Ok(dest)
    }
}

impl Drop for WorkDirGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lock.unlock() {
            log::warn!("Could not unlock {}: {}", self.dir.path().display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_creates_the_directory_and_releases_the_lock_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let dir = WorkDir::new(root.path().join("nested").join("1abc"));

        {
            let guard = dir.enter().unwrap();
            assert!(guard.path().is_dir());
            assert!(guard.join(LOCK_FILE).is_file());
        }
        assert!(dir.enter().is_ok());
    }

    #[test]
    fn leftover_lock_file_without_holder_does_not_block() {
        let root = tempfile::tempdir().unwrap();
        let dir = WorkDir::new(root.path());
        fs::write(dir.join(LOCK_FILE), "").unwrap();

        let guard = dir.enter().unwrap();
        assert!(matches!(dir.enter(), Err(Error::Io(_))));
        drop(guard);
        assert!(dir.enter().is_ok());
    }

    #[test]
    fn nested_entry_is_refused_while_locked() {
        let root = tempfile::tempdir().unwrap();
        let dir = WorkDir::new(root.path());

        let _guard = dir.enter().unwrap();
        assert!(matches!(dir.enter(), Err(Error::Io(_))));
    }

    #[test]
    fn lock_is_released_on_error_paths() {
        fn failing(dir: &WorkDir) -> Result<(), Error> {
            let guard = dir.enter()?;
            guard.import(Path::new("/nonexistent/input.pdb"), "input.pdb")?;
            Ok(())
        }

        let root = tempfile::tempdir().unwrap();
        let dir = WorkDir::new(root.path());
        assert!(failing(&dir).is_err());
        assert!(dir.enter().is_ok());
    }

    #[test]
    fn import_copies_once_and_skips_self_copies() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("source.pdb");
        fs::write(&source, "END\n").unwrap();
        let dir = WorkDir::new(root.path().join("work"));
        let guard = dir.enter().unwrap();

        let copied = guard.import(&source, "1abc.pdb").unwrap();
        assert_eq!(fs::read_to_string(&copied).unwrap(), "END\n");
        assert_eq!(guard.import(&copied, "1abc.pdb").unwrap(), copied);
    }
}
