//! Filesystem lock guarding a store directory.
//!
//! Every handle holds a `flock` on `<path>/LOCK`: shared handles take
//! `LOCK_SH`, exclusive handles take `LOCK_EX`. Acquisition never blocks; a
//! conflicting holder makes the open fail. The lock is released when the
//! file descriptor is closed, i.e. when the [`LockFile`] is dropped.
//!
//! `flock` locks belong to the open file description, so two handles opened
//! by the same process conflict exactly like handles in different processes.
//! Platforms without `flock` cannot open a store at all.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::types::AccessMode;

/// Name of the lock file inside a store directory.
pub const LOCK_FILE_NAME: &str = "LOCK";

/// An acquired lock on a store directory.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
    mode: AccessMode,
}

impl LockFile {
    /// Acquire the lock for `dir` in the given mode without blocking.
    pub fn acquire(dir: &Path, mode: AccessMode) -> Result<Self> {
        let path = dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if !try_flock(&file, mode)? {
            return Err(StoreError::Locked {
                path: dir.to_path_buf(),
                mode,
            });
        }

        tracing::trace!(path = %path.display(), %mode, "acquired store lock");
        Ok(Self { file, path, mode })
    }

    /// The mode this lock was acquired in.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying lock file.
    pub fn file(&self) -> &File {
        &self.file
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn try_flock(file: &File, mode: AccessMode) -> io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let op = match mode {
        AccessMode::Shared => libc::LOCK_SH,
        AccessMode::Exclusive => libc::LOCK_EX,
    };
    let fd = file.as_raw_fd();
    // SAFETY: `fd` comes from an open `File` that outlives this call, and
    // `flock` with `LOCK_NB` has no memory-safety preconditions.
    let rc = unsafe { libc::flock(fd, op | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    if err.kind() == io::ErrorKind::WouldBlock || err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        return Ok(false);
    }
    Err(err)
}

#[cfg(not(unix))]
fn try_flock(_: &File, _: AccessMode) -> io::Result<bool> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "store locking requires flock",
    ))
}
