//! # Data Directory Lock
//!
//! Uses `fs2` for cross-platform file locking (flock on Unix, LockFile on
//! Windows) so two daemons never share one finality database.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use thiserror::Error;

/// How long to wait for a competing process to release the lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Why the data directory could not be locked.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("cannot open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("finality database {} is held by another fpd (pid {})", .path.display(), .holder.map_or_else(|| "unknown".to_string(), |p| p.to_string()))]
    Held { path: PathBuf, holder: Option<u32> },
}

/// Exclusive `fpd.lock` inside a data directory. Dropping it unlocks and
/// removes the file.
pub struct DatabaseLock {
    file: File,
    path: PathBuf,
}

const LOCK_FILE: &str = "fpd.lock";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl DatabaseLock {
    /// Takes the lock, polling until `timeout` elapses. The holder's pid is
    /// written into the file for the error message of the next contender.
    pub fn acquire(data_dir: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = data_dir.join(LOCK_FILE);
        let io_err = |source| LockError::Io { path: path.clone(), source };

        std::fs::create_dir_all(data_dir).map_err(io_err)?;
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_err)?;

        let started = Instant::now();
        while file.try_lock_exclusive().is_err() {
            if started.elapsed() >= timeout {
                return Err(LockError::Held {
                    holder: holder_pid(&path),
                    path: path.clone(),
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        file.set_len(0).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;

        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn holder_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

impl Drop for DatabaseLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}
