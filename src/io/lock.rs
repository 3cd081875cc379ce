use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::trace;

/// Name of the lock file inside `tally/`
pub const LOCK_FILE: &str = ".lock";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exclusive advisory lock held while the data file is rewritten.
///
/// Every process that saves `data.json` takes this first, so concurrent
/// `tally` invocations (and a running `tally watch`) never interleave writes.
pub struct DataLock {
    _file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not create lock file at {path}: {source}")]
    CreateError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("timed out waiting for {path}: another tally process is writing")]
    Timeout { path: PathBuf },
}

impl DataLock {
    /// Take the lock in `dir`, retrying until `timeout` elapses
    pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| LockError::CreateError {
                path: path.clone(),
                source: e,
            })?;

        let start = Instant::now();
        loop {
            match try_lock(&file) {
                Ok(()) => {
                    trace!(path = %path.display(), "lock acquired");
                    return Ok(DataLock { _file: file, path });
                }
                Err(_) if start.elapsed() < timeout => std::thread::sleep(RETRY_INTERVAL),
                Err(_) => return Err(LockError::Timeout { path }),
            }
        }
    }

    pub fn acquire_default(dir: &Path) -> Result<Self, LockError> {
        Self::acquire(dir, DEFAULT_TIMEOUT)
    }
}

impl Drop for DataLock {
    fn drop(&mut self) {
        // flock is released with the descriptor
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> Result<(), std::io::Error> {
    use std::os::unix::io::AsRawFd;
    let fd = file.as_raw_fd();
    let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> Result<(), std::io::Error> {
    Ok(())
}
