//! Advisory file lock guarding lock-file read-modify-write (§5,
//! "shared-resource policy"). Acquisition waits up to a timeout for a
//! concurrent holder to release rather than failing immediately.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub hostname: String,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
#[error("timed out after {timeout:?} waiting for lock at {path}")]
pub struct LockTimeoutError {
    pub path: PathBuf,
    pub timeout: Duration,
}

/// Held for the lifetime of a read-modify-write cycle; releases the
/// lock file on drop.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    pub fn holder(&self) -> std::io::Result<LockHolder> {
        let text = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(std::io::Error::other)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Polls every 25ms attempting an atomic `create_new` of the lock file
/// until it succeeds or `timeout` elapses.
pub fn acquire(lock_path: &Path, timeout: Duration) -> Result<LockGuard, LockTimeoutError> {
    if let Some(parent) = lock_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let holder = LockHolder { pid: std::process::id(), hostname: gethostname::gethostname().to_string_lossy().into_owned(), acquired_at: Utc::now() };
    let json = serde_json::to_string_pretty(&holder).expect("LockHolder always serializes");

    let deadline = Instant::now() + timeout;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(lock_path) {
            Ok(mut file) => {
                let _ = file.write_all(json.as_bytes());
                return Ok(LockGuard { path: lock_path.to_path_buf() });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                if Instant::now() >= deadline {
                    return Err(LockTimeoutError { path: lock_path.to_path_buf(), timeout });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(_) => {
                if Instant::now() >= deadline {
                    return Err(LockTimeoutError { path: lock_path.to_path_buf(), timeout });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_allows_reacquire() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("global.lock.json");
        let guard = acquire(&path, Duration::from_secs(1)).unwrap();
        assert!(path.is_file());
        drop(guard);
        assert!(!path.is_file());
        let _guard2 = acquire(&path, Duration::from_secs(1)).unwrap();
    }

    #[test]
    fn second_acquire_times_out_while_held() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("global.lock.json");
        let _held = acquire(&path, Duration::from_secs(1)).unwrap();
        let err = acquire(&path, Duration::from_millis(80)).unwrap_err();
        assert_eq!(err.path, path);
    }
}
