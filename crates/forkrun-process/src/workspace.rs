//! Per-run scratch directory ferrying results across the fork boundary.
//!
//! Layout: `retval` (encoded return value), `stdout`, `stderr` (raw captured bytes).
//! Only the process that created the directory may delete it; a copy of the guard
//! that ends up in a forked child never touches the filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ForkError, Result};

pub const RETVAL_FILE: &str = "retval";
pub const STDOUT_FILE: &str = "stdout";
pub const STDERR_FILE: &str = "stderr";

const WORKSPACE_PREFIX: &str = "forkrun-";

/// Owned workspace directory.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    owner_pid: u32,
    removed: bool,
}

impl Workspace {
    /// Create a uniquely named directory under `root` (system temp dir when `None`).
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|source| ForkError::Workspace {
            path: root.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            source,
        })?;
        Ok(Self {
            path: dir.keep(),
            owner_pid: std::process::id(),
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn retval_path(&self) -> PathBuf {
        self.path.join(RETVAL_FILE)
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.path.join(STDOUT_FILE)
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.path.join(STDERR_FILE)
    }

    /// Create an empty placeholder file inside the workspace.
    pub fn ensure_file(&self, path: &Path) -> Result<()> {
        fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map(drop)
            .map_err(|source| ForkError::Workspace {
                path: path.to_path_buf(),
                source,
            })
    }

    /// True when called from the process that created the workspace.
    pub fn is_owner(&self) -> bool {
        std::process::id() == self.owner_pid
    }

    /// Delete the directory. Repeated calls, an already missing directory, and calls
    /// from a non-owning process all succeed without doing anything.
    pub fn remove(&mut self) -> Result<()> {
        if self.removed || !self.is_owner() {
            return Ok(());
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ForkError::Workspace {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        self.removed = true;
        tracing::debug!(path = %self.path.display(), "workspace removed");
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!("failed to remove workspace: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_under_root_and_remove_twice() {
        let root = tempfile::tempdir().unwrap();
        let mut ws = Workspace::create(Some(root.path())).unwrap();
        assert!(ws.path().starts_with(root.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(WORKSPACE_PREFIX));

        ws.ensure_file(&ws.retval_path()).unwrap();
        assert!(ws.retval_path().exists());

        ws.remove().unwrap();
        assert!(!ws.path().exists());
        ws.remove().unwrap();
    }

    #[test]
    fn test_remove_tolerates_external_deletion() {
        let mut ws = Workspace::create(None).unwrap();
        fs::remove_dir_all(ws.path()).unwrap();
        ws.remove().unwrap();
    }

    #[test]
    fn test_drop_removes_directory() {
        let ws = Workspace::create(None).unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.is_dir());
        drop(ws);
        assert!(!path.exists());
    }

    #[test]
    fn test_non_owner_never_deletes() {
        let mut ws = Workspace::create(None).unwrap();
        ws.owner_pid = ws.owner_pid.wrapping_add(1);
        assert!(!ws.is_owner());
        ws.remove().unwrap();
        assert!(ws.path().is_dir());

        ws.owner_pid = std::process::id();
        ws.remove().unwrap();
        assert!(!ws.path().exists());
    }

    #[test]
    fn test_create_in_missing_root_fails() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        let err = Workspace::create(Some(&missing)).unwrap_err();
        assert!(matches!(err, ForkError::Workspace { .. }));
    }
}
