//! Advisory per-thread locks
//!
//! A thread lock is an exclusive `flock` on `{lock_dir}/{thread_id}.lock`.
//! Locks taken through separate file handles conflict even inside one
//! process, so the same mechanism guards against a second in-process caller
//! and a second process resuming the same thread.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{CheckpointError, Result};

/// Exclusive hold on one thread; released on drop
#[derive(Debug)]
pub struct ThreadLock {
    file: File,
    path: PathBuf,
    thread_id: String,
}

impl ThreadLock {
    /// Try to take the lock without waiting
    ///
    /// Returns `CheckpointError::Busy` if another holder has it.
    pub fn try_acquire(lock_dir: &Path, thread_id: &str) -> Result<Self> {
        debug!(?lock_dir, %thread_id, "ThreadLock::try_acquire: called");
        fs::create_dir_all(lock_dir)?;
        let path = lock_dir.join(format!("{}.lock", thread_id));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!(%thread_id, "ThreadLock::try_acquire: acquired");
                Ok(Self {
                    file,
                    path,
                    thread_id: thread_id.to_string(),
                })
            }
            Err(e) if is_contended(&e) => {
                debug!(%thread_id, "ThreadLock::try_acquire: contended");
                Err(CheckpointError::Busy(thread_id.to_string()))
            }
            Err(e) => Err(CheckpointError::Io(e)),
        }
    }

    /// Thread this lock guards
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Path of the lock file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ThreadLock {
    fn drop(&mut self) {
        debug!(thread_id = %self.thread_id, "ThreadLock::drop: releasing");
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(error = %e, "ThreadLock::drop: unlock failed");
        }
    }
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
