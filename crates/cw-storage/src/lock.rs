use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// How long `acquire` waits for a contended lock.
const ACQUIRE_WAIT: Duration = Duration::from_secs(30);

/// Probe interval while waiting.
const PROBE_INTERVAL: Duration = Duration::from_millis(100);

/// A lock older than this is considered abandoned regardless of its pid.
const LOCK_TTL_MS: u128 = 5 * 60 * 1000;

#[derive(Debug, Serialize, Deserialize)]
struct LockPayload {
    pid: u32,
    timestamp: u128,
    operation: String,
}

/// File-based mutual exclusion per project.
///
/// The lock file holds `{pid, timestamp, operation}`. A lock is honored only
/// while its process is alive and its timestamp is fresh; the post-write
/// read-back guards against two processes writing the file at once.
pub struct ProcessLock {
    path: PathBuf,
    pid: u32,
}

impl ProcessLock {
    /// Acquire the lock, waiting up to 30 s.
    pub fn acquire(path: &Path, operation: &str) -> Result<Self, StorageError> {
        Self::acquire_with(path, operation, ACQUIRE_WAIT, PROBE_INTERVAL)
    }

    /// Acquire with explicit wait/probe intervals (tests).
    pub fn acquire_with(
        path: &Path,
        operation: &str,
        wait: Duration,
        probe: Duration,
    ) -> Result<Self, StorageError> {
        let pid = std::process::id();
        let deadline = std::time::Instant::now() + wait;

        loop {
            match read_payload(path) {
                Some(existing) if existing.pid != pid && is_lock_valid(&existing) => {
                    if std::time::Instant::now() >= deadline {
                        return Err(StorageError::LockContended {
                            pid: existing.pid,
                            operation: existing.operation,
                        });
                    }
                    std::thread::sleep(probe);
                    continue;
                }
                _ => {}
            }

            let payload = LockPayload {
                pid,
                timestamp: now_ms(),
                operation: operation.to_string(),
            };
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_vec(&payload).unwrap_or_default())?;

            // Read back: if another process raced us and won, keep waiting.
            match read_payload(path) {
                Some(written) if written.pid == pid => {
                    return Ok(Self {
                        path: path.to_path_buf(),
                        pid,
                    });
                }
                _ => {
                    if std::time::Instant::now() >= deadline {
                        let holder = read_payload(path);
                        return Err(StorageError::LockContended {
                            pid: holder.as_ref().map(|p| p.pid).unwrap_or(0),
                            operation: holder.map(|p| p.operation).unwrap_or_default(),
                        });
                    }
                    std::thread::sleep(probe);
                }
            }
        }
    }

    /// Release the lock if this process still owns it.
    pub fn release(&self) {
        if let Some(payload) = read_payload(&self.path) {
            if payload.pid == self.pid {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        self.release();
    }
}

fn read_payload(path: &Path) -> Option<LockPayload> {
    let data = std::fs::read(path).ok()?;
    serde_json::from_slice(&data).ok()
}

/// A lock is valid only if it is fresh and its holder is alive.
fn is_lock_valid(payload: &LockPayload) -> bool {
    let age = now_ms().saturating_sub(payload.timestamp);
    if age > LOCK_TTL_MS {
        return false;
    }
    pid_alive(payload.pid)
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Signal-0 probe. EPERM means the process exists but belongs to another
/// user, which still counts as alive.
#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    let ret = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if ret == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.lock");

        let lock = ProcessLock::acquire(&path, "scan").unwrap();
        assert!(path.exists());
        lock.release();
        assert!(!path.exists());
    }

    #[test]
    fn drop_releases() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.lock");
        {
            let _lock = ProcessLock::acquire(&path, "scan").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn reacquire_by_same_pid() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.lock");

        let first = ProcessLock::acquire(&path, "scan").unwrap();
        // Same pid: a second acquire steals its own stale-looking entry.
        let second = ProcessLock::acquire_with(
            &path,
            "scan",
            Duration::from_millis(200),
            Duration::from_millis(10),
        )
        .unwrap();
        drop(second);
        drop(first);
    }

    #[test]
    fn dead_pid_lock_is_stolen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.lock");

        // Fake a lock from a pid that is (almost certainly) not running.
        let payload = LockPayload {
            pid: u32::MAX - 1,
            timestamp: now_ms(),
            operation: "scan".into(),
        };
        std::fs::write(&path, serde_json::to_vec(&payload).unwrap()).unwrap();

        let lock = ProcessLock::acquire_with(
            &path,
            "scan",
            Duration::from_millis(500),
            Duration::from_millis(10),
        )
        .unwrap();
        lock.release();
    }

    #[test]
    fn expired_lock_is_stolen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.lock");

        let payload = LockPayload {
            pid: std::process::id(),
            timestamp: now_ms().saturating_sub(LOCK_TTL_MS + 1000),
            operation: "scan".into(),
        };
        std::fs::write(&path, serde_json::to_vec(&payload).unwrap()).unwrap();

        let lock = ProcessLock::acquire_with(
            &path,
            "rescan",
            Duration::from_millis(500),
            Duration::from_millis(10),
        )
        .unwrap();
        lock.release();
    }

    #[test]
    fn garbage_lock_file_is_stolen() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("index.lock");
        std::fs::write(&path, b"not json at all").unwrap();

        let lock = ProcessLock::acquire_with(
            &path,
            "scan",
            Duration::from_millis(500),
            Duration::from_millis(10),
        )
        .unwrap();
        lock.release();
    }
}
