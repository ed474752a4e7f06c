//! Serialization of writers on one certs directory.
//!
//! Threads in this process queue on a mutex keyed by the canonical directory
//! path; on Unix an exclusive `flock` on `.server.lock` extends the same
//! guarantee to other processes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::{CertError, Result};

pub const LOCK_FILE: &str = ".server.lock";

static DIRECTORY_LOCKS: Lazy<DashMap<PathBuf, Arc<Mutex<()>>>> = Lazy::new(DashMap::new);

/// Run `f` while holding both the in-process and the file lock for `dir`.
/// `dir` must already exist.
pub(crate) fn with_directory_lock<T>(dir: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let key = dir.canonicalize().map_err(|source| CertError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let slot = DIRECTORY_LOCKS
        .entry(key.clone())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .value()
        .clone();

    // A panic in another holder leaves nothing half-done in memory.
    let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let _file_lock = acquire_file_lock(&key)?;
    f()
}

#[cfg(unix)]
fn acquire_file_lock(dir: &Path) -> Result<nix::fcntl::Flock<std::fs::File>> {
    use nix::fcntl::{Flock, FlockArg};

    let path = dir.join(LOCK_FILE);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|source| CertError::Io {
            path: path.clone(),
            source,
        })?;

    Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| CertError::Io {
        path,
        source: std::io::Error::from(errno),
    })
}

#[cfg(not(unix))]
fn acquire_file_lock(_dir: &Path) -> Result<()> {
    Ok(())
}
