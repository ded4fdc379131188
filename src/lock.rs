use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};
use std::{
    fs::{File, OpenOptions},
    path::Path,
};
use thiserror::Error;

/// A custom error for describing the error cases for the run lock
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock file cannot be opened or created.
    #[error("cannot open lock file: {0}")]
    FailedOpen(#[from] std::io::Error),
    /// Another invocation holds the lock. The scheduler overlapped two runs,
    /// the later one backs off instead of racing the state files.
    #[error("another run is already in progress")]
    AlreadyRunning,
    /// The lock syscall itself failed.
    #[error("cannot acquire lock: {0}")]
    FailedLock(Errno),
}

/// A scoped exclusive lock held for the whole duration of a run.
///
/// The external scheduler is supposed to never overlap invocations, but the
/// lock makes the guarantee hold even if it misbehaves. It is an advisory
/// flock on a lock file and releases automatically on every exit path,
/// including panics, when the guard is dropped.
#[derive(Debug)]
pub struct RunLock {
    _lock: Flock<File>,
}

impl RunLock {
    /// Try to take the exclusive lock without blocking. If another run holds
    /// it, fail immediately so the scheduler sees a clean non-zero exit.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let file = OpenOptions::new().create(true).write(true).open(path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(lock) => Ok(RunLock { _lock: lock }),
            Err((_, Errno::EWOULDBLOCK)) => Err(LockError::AlreadyRunning),
            Err((_, errno)) => Err(LockError::FailedLock(errno)),
        }
    }
}
