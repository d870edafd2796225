//! Advisory file locks.
//!
//! The install root is shared by every package installed under a profile,
//! and a package record may be driven from two terminals at once. Both are
//! guarded by an exclusive `flock`-style lock on a sidecar file.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::core::errors::KeelError;
use crate::util::fs::ensure_dir;

/// An exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Block until the lock at `path` is acquired.
    pub fn exclusive(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .with_context(|| format!("failed to lock {}", path.display()))?;

        tracing::debug!("acquired lock {}", path.display());
        Ok(FileLock {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Acquire the lock at `path`, failing with [`KeelError::Locked`] if
    /// another process holds it.
    pub fn try_exclusive(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(KeelError::Locked {
                path: path.to_path_buf(),
            }
            .into());
        }

        Ok(FileLock {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // The lock file itself stays; removing it would race with a waiter
        // that already opened it.
        let _ = FileExt::unlock(&self.file);
        tracing::debug!("released lock {}", self.path.display());
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .with_context(|| format!("failed to open lock file: {}", path.display()))
}
