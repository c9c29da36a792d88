//! Cross-process sender exclusivity.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use beacon_core::errors::StorageError;

/// Advisory exclusive lock on `<data_dir>/sender.lock`.
///
/// A flush cycle runs only inside [`SenderLock::try_run`], so two processes
/// sharing the queue never send the same rows concurrently.
pub struct SenderLock {
    lock: fd_lock::RwLock<File>,
    path: PathBuf,
}

impl SenderLock {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            lock: fd_lock::RwLock::new(open_lock_file(path)?),
            path: path.to_path_buf(),
        })
    }

    /// Run `f` while holding the lock. Returns `Ok(None)` without running
    /// `f` if another holder has it.
    pub fn try_run<T>(&mut self, f: impl FnOnce() -> T) -> Result<Option<T>, StorageError> {
        match self.lock.try_write() {
            Ok(_guard) => Ok(Some(f())),
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                tracing::debug!(path = %self.path.display(), "sender lock held elsewhere");
                Ok(None)
            }
            Err(e) => Err(StorageError::LockError {
                message: format!("sender lock {}: {e}", self.path.display()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Shared presence lock on `<data_dir>/instance.lock`, held by every live
/// process for as long as it keeps this value.
///
/// A process that can take the lock exclusively at startup is the only one
/// running against the data directory; it runs `on_first` before any other
/// starting process is admitted.
pub struct InstanceLock {
    _lock: fd_lock::RwLock<File>,
    first: bool,
}

impl InstanceLock {
    pub fn acquire<F>(path: &Path, on_first: F) -> Result<Self, StorageError>
    where
        F: FnOnce() -> Result<(), StorageError>,
    {
        let mut lock = fd_lock::RwLock::new(open_lock_file(path)?);
        let first = match lock.try_write() {
            Ok(_guard) => {
                on_first()?;
                true
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => false,
            Err(e) => return Err(lock_error(path, &e)),
        };

        // Blocks while a first process is still resetting.
        let guard = lock.read().map_err(|e| lock_error(path, &e))?;
        // The shared lock stays held until the file is closed on drop.
        std::mem::forget(guard);
        tracing::debug!(path = %path.display(), first, "instance lock held");
        Ok(Self { _lock: lock, first })
    }

    /// Whether no other process was alive when this one started.
    pub fn is_first(&self) -> bool {
        self.first
    }
}

fn open_lock_file(path: &Path) -> Result<File, StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::LockError {
                message: format!("cannot create {}: {e}", parent.display()),
            })?;
        }
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| StorageError::LockError {
            message: format!("cannot open {}: {e}", path.display()),
        })
}

fn lock_error(path: &Path, e: &std::io::Error) -> StorageError {
    StorageError::LockError {
        message: format!("instance lock {}: {e}", path.display()),
    }
}
