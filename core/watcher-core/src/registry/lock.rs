//! Advisory, non-blocking lock for the registry file.
//!
//! The lock is a zero-byte file created with `create_new` (atomic
//! create-if-absent), which works across independent processes without shared
//! memory or OS-specific mutexes. Whoever creates the file owns the lock; the
//! guard deletes it on drop.
//!
//! # Discipline
//!
//! Acquire-or-abandon: if the file already exists, the caller gives up instead
//! of waiting. Under heavy contention some updates are lost. That is accepted;
//! blocking the host tool is not.
//!
//! # Stale Locks
//!
//! A recorder killed while holding the lock leaves the file behind, which would
//! starve every later update. A lock file older than [`STALE_LOCK_SECS`] is
//! removed and acquisition is retried exactly once. Two recorders can both
//! decide the same lock is stale; the second removal can then delete the
//! first one's fresh lock. The window is tiny and the lock is advisory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fs_err as fs;
use fs_err::OpenOptions;

use crate::error::{Result, WatcherError};

/// A healthy update takes milliseconds; anything this old was abandoned.
pub const STALE_LOCK_SECS: u64 = 30;

/// Scoped ownership of the registry lock file. Released on drop.
#[derive(Debug)]
pub struct RegistryLock {
    path: PathBuf,
}

impl RegistryLock {
    /// Tries once to take the lock (twice if the existing lock is stale).
    ///
    /// Returns [`WatcherError::LockContended`] when another process holds it.
    pub fn try_acquire(path: &Path) -> Result<Self> {
        match create_exclusive(path) {
            Ok(lock) => Ok(lock),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if !is_stale(path, SystemTime::now()) {
                    return Err(WatcherError::LockContended(path.to_path_buf()));
                }

                tracing::debug!(lock = %path.display(), "Removing stale registry lock");
                let _ = fs::remove_file(path);
                create_exclusive(path).map_err(|e| {
                    if e.kind() == ErrorKind::AlreadyExists {
                        WatcherError::LockContended(path.to_path_buf())
                    } else {
                        WatcherError::io("acquire registry lock", e)
                    }
                })
            }
            Err(e) => Err(WatcherError::io("acquire registry lock", e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RegistryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::debug!(error = %e, "Failed to release registry lock");
        }
    }
}

fn create_exclusive(path: &Path) -> std::io::Result<RegistryLock> {
    OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(RegistryLock {
        path: path.to_path_buf(),
    })
}

/// A lock is stale when its mtime is more than [`STALE_LOCK_SECS`] before `now`.
/// Unreadable metadata and future mtimes count as fresh.
fn is_stale(path: &Path, now: SystemTime) -> bool {
    let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    now.duration_since(modified)
        .map(|age| age > Duration::from_secs(STALE_LOCK_SECS))
        .unwrap_or(false)
}
