//! Single-writer lock for a moot state directory
//!
//! The case store assumes one writer per case. Mutating commands hold this
//! advisory lock for the lifetime of the process so two pipeline runs never
//! interleave checkpoints in the same state directory. The lock is advisory
//! and coordinates moot processes only.

use camino::{Utf8Path, Utf8PathBuf};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Age after which a lock left by a dead process counts as stale (1 hour)
pub const DEFAULT_STALE_THRESHOLD_SECS: u64 = 3600;

const LOCK_FILE_NAME: &str = "moot.lock";
const MAX_ACQUIRE_ATTEMPTS: u32 = 3;
const MAX_READ_RETRIES: u32 = 3;
const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Contents of the lock file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Process ID holding the lock
    pub pid: u32,
    /// Seconds since UNIX epoch when the lock was taken
    pub created_at: u64,
    /// Command that took the lock (`run`, `case`, `verdict`)
    pub command: String,
    /// moot version that wrote the lock
    pub moot_version: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error(
        "State directory '{state_dir}' is locked by PID {pid} (created {created_ago} ago)"
    )]
    ConcurrentExecution {
        state_dir: String,
        pid: u32,
        created_ago: String,
    },

    #[error(
        "Stale lock in '{state_dir}' (PID {pid}, age {age_secs}s). Use --force to override"
    )]
    StaleLock {
        state_dir: String,
        pid: u32,
        age_secs: u64,
    },

    #[error("Lock file is corrupted or invalid: {reason}")]
    CorruptedLock { reason: String },

    #[error("Failed to acquire lock: {reason}")]
    AcquisitionFailed { reason: String },

    #[error("Failed to release lock: {reason}")]
    ReleaseFailed { reason: String },

    #[error("IO error during lock operation: {0}")]
    Io(#[from] io::Error),
}

/// Exclusive lock over a state directory, released on drop.
pub struct StoreLock {
    lock_path: Utf8PathBuf,
    state_dir: Utf8PathBuf,
    _fd_lock: Option<Box<RwLock<fs::File>>>,
    info: LockInfo,
}

impl StoreLock {
    /// Acquire the lock for `state_dir`.
    ///
    /// Creation uses `create_new` so two processes cannot both win. An
    /// existing lock is overridden only when its owner is gone and either
    /// `force` is set or the lock is older than `ttl_seconds`
    /// (default [`DEFAULT_STALE_THRESHOLD_SECS`]).
    pub fn acquire(
        state_dir: &Utf8Path,
        command: &str,
        force: bool,
        ttl_seconds: Option<u64>,
    ) -> Result<Self, LockError> {
        fs::create_dir_all(state_dir).map_err(|e| LockError::AcquisitionFailed {
            reason: format!("Failed to create state directory '{state_dir}': {e}"),
        })?;

        let lock_path = Self::lock_path(state_dir);
        let ttl = ttl_seconds.unwrap_or(DEFAULT_STALE_THRESHOLD_SECS);

        for attempt in 0..MAX_ACQUIRE_ATTEMPTS {
            let info = LockInfo {
                pid: process::id(),
                created_at: now_secs(),
                command: command.to_string(),
                moot_version: env!("CARGO_PKG_VERSION").to_string(),
            };

            match fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&lock_path)
            {
                Ok(file) => return Self::finalize(state_dir, lock_path, file, info),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    Self::check_existing(&lock_path, state_dir, force, ttl)?;
                    Self::remove_stale(&lock_path)?;
                    if attempt + 1 < MAX_ACQUIRE_ATTEMPTS {
                        // Another process may win the race after removal; back off briefly.
                        let delay_ms = 10u64.saturating_mul(2u64.saturating_pow(attempt));
                        std::thread::sleep(Duration::from_millis(delay_ms.min(100)));
                    }
                }
                Err(e) => {
                    return Err(LockError::AcquisitionFailed {
                        reason: format!("Failed to create lock file '{lock_path}': {e}"),
                    });
                }
            }
        }

        Err(LockError::AcquisitionFailed {
            reason: format!(
                "Gave up after {MAX_ACQUIRE_ATTEMPTS} attempts on '{lock_path}'; another process keeps taking it"
            ),
        })
    }

    fn finalize(
        state_dir: &Utf8Path,
        lock_path: Utf8PathBuf,
        file: fs::File,
        info: LockInfo,
    ) -> Result<Self, LockError> {
        let json = serde_json::to_string_pretty(&info).map_err(|e| {
            LockError::AcquisitionFailed {
                reason: format!("Failed to serialize lock info: {e}"),
            }
        })?;

        let mut rw_lock = Box::new(RwLock::new(file));
        {
            let guard = rw_lock
                .try_write()
                .map_err(|_| LockError::ConcurrentExecution {
                    state_dir: state_dir.to_string(),
                    pid: 0,
                    created_ago: "unknown".to_string(),
                })?;
            let mut file_ref = &*guard;
            file_ref.write_all(json.as_bytes())?;
            file_ref.flush()?;
            file_ref.sync_all()?;
        }

        Ok(Self {
            lock_path,
            state_dir: state_dir.to_path_buf(),
            _fd_lock: Some(rw_lock),
            info,
        })
    }

    /// Read the lock file of `state_dir`, if one exists.
    pub fn read_info(state_dir: &Utf8Path) -> Result<Option<LockInfo>, LockError> {
        let lock_path = Self::lock_path(state_dir);
        if !lock_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&lock_path).map_err(|e| LockError::CorruptedLock {
            reason: format!("Failed to read lock file: {e}"),
        })?;
        let info = serde_json::from_str(&content).map_err(|e| LockError::CorruptedLock {
            reason: format!("Failed to parse lock file: {e}"),
        })?;
        Ok(Some(info))
    }

    /// Release the lock explicitly. Dropping the lock has the same effect.
    pub fn release(mut self) -> Result<(), LockError> {
        self._fd_lock.take();
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path).map_err(|e| LockError::ReleaseFailed {
                reason: format!("Failed to remove lock file: {e}"),
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn info(&self) -> &LockInfo {
        &self.info
    }

    #[must_use]
    pub fn state_dir(&self) -> &Utf8Path {
        &self.state_dir
    }

    #[must_use]
    pub fn lock_path(state_dir: &Utf8Path) -> Utf8PathBuf {
        state_dir.join(LOCK_FILE_NAME)
    }

    /// Returns `Ok(())` when the existing lock may be removed.
    ///
    /// Empty or half-written files are re-read a few times since the owner
    /// may be between `create_new` and its first write.
    fn check_existing(
        lock_path: &Utf8Path,
        state_dir: &Utf8Path,
        force: bool,
        ttl_seconds: u64,
    ) -> Result<(), LockError> {
        for attempt in 0..MAX_READ_RETRIES {
            let last_try = attempt + 1 == MAX_READ_RETRIES;
            let content = match fs::read_to_string(lock_path) {
                Ok(content) => content,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) if !last_try => {
                    tracing::debug!(error = %e, "Lock file unreadable, retrying");
                    std::thread::sleep(READ_RETRY_DELAY);
                    continue;
                }
                Err(e) => {
                    return Err(LockError::CorruptedLock {
                        reason: format!("Failed to read existing lock '{lock_path}': {e}"),
                    });
                }
            };

            match serde_json::from_str::<LockInfo>(&content) {
                Ok(existing) => {
                    return Self::validate_existing(&existing, state_dir, force, ttl_seconds);
                }
                Err(e) if (content.trim().is_empty() || e.is_eof()) && !last_try => {
                    std::thread::sleep(READ_RETRY_DELAY);
                }
                Err(e) => {
                    if force {
                        return Ok(());
                    }
                    return Err(LockError::CorruptedLock {
                        reason: format!("Failed to parse existing lock '{lock_path}': {e}"),
                    });
                }
            }
        }
        Err(LockError::CorruptedLock {
            reason: format!("Lock file '{lock_path}' stayed empty"),
        })
    }

    fn validate_existing(
        existing: &LockInfo,
        state_dir: &Utf8Path,
        force: bool,
        ttl_seconds: u64,
    ) -> Result<(), LockError> {
        if force {
            return Ok(());
        }

        let age = now_secs().saturating_sub(existing.created_at);
        if is_process_running(existing.pid) {
            return Err(LockError::ConcurrentExecution {
                state_dir: state_dir.to_string(),
                pid: existing.pid,
                created_ago: format_age(age),
            });
        }

        if age > ttl_seconds {
            tracing::warn!(
                pid = existing.pid,
                age_secs = age,
                "Removing stale lock left by a dead process"
            );
            Ok(())
        } else {
            Err(LockError::StaleLock {
                state_dir: state_dir.to_string(),
                pid: existing.pid,
                age_secs: age,
            })
        }
    }

    /// Rename-then-delete so a racing reader never sees a half-removed file.
    fn remove_stale(lock_path: &Utf8Path) -> Result<(), LockError> {
        let stale_path = lock_path.with_extension(format!("stale.{}", process::id()));
        match fs::rename(lock_path, &stale_path) {
            Ok(()) => {
                let _ = fs::remove_file(&stale_path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LockError::AcquisitionFailed {
                reason: format!("Failed to remove stale lock '{lock_path}': {e}"),
            }),
        }
    }
}

impl std::fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLock")
            .field("lock_path", &self.lock_path)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        self._fd_lock.take();
        if self.lock_path.exists() {
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_age(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

fn is_process_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // kill(pid, 0) probes existence; EPERM means it exists under another user.
        let rc = unsafe { libc::kill(pid as i32, 0) };
        if rc == 0 {
            true
        } else {
            matches!(
                io::Error::last_os_error().raw_os_error(),
                Some(code) if code == libc::EPERM
            )
        }
    }

    #[cfg(windows)]
    {
        use winapi::um::handleapi::CloseHandle;
        use winapi::um::minwinbase::STILL_ACTIVE;
        use winapi::um::processthreadsapi::{GetExitCodeProcess, OpenProcess};
        use winapi::um::winnt::PROCESS_QUERY_LIMITED_INFORMATION;

        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
            if handle.is_null() {
                return false;
            }
            let mut exit_code: u32 = 0;
            let ok = GetExitCodeProcess(handle, &mut exit_code);
            CloseHandle(handle);
            ok != 0 && exit_code == STILL_ACTIVE
        }
    }

    #[cfg(not(any(unix, windows)))]
    {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn state_dir() -> (TempDir, Utf8PathBuf) {
        let td = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(td.path().join("state")).unwrap();
        (td, path)
    }

    fn write_foreign_lock(dir: &Utf8Path, pid: u32, created_at: u64) {
        fs::create_dir_all(dir).unwrap();
        let info = LockInfo {
            pid,
            created_at,
            command: "run".to_string(),
            moot_version: "0.0.0".to_string(),
        };
        fs::write(
            StoreLock::lock_path(dir),
            serde_json::to_string(&info).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_acquire_and_release() {
        let (_td, dir) = state_dir();

        let lock = StoreLock::acquire(&dir, "run", false, None).unwrap();
        assert!(StoreLock::lock_path(&dir).exists());
        assert_eq!(lock.info().pid, process::id());
        assert_eq!(lock.info().command, "run");

        let second = StoreLock::acquire(&dir, "case", false, None);
        assert!(matches!(
            second,
            Err(LockError::ConcurrentExecution { .. })
        ));

        lock.release().unwrap();
        assert!(!StoreLock::lock_path(&dir).exists());
        let _again = StoreLock::acquire(&dir, "run", false, None).unwrap();
    }

    #[test]
    fn test_drop_removes_lock_file() {
        let (_td, dir) = state_dir();
        {
            let _lock = StoreLock::acquire(&dir, "verdict", false, None).unwrap();
            assert!(StoreLock::lock_path(&dir).exists());
        }
        assert!(!StoreLock::lock_path(&dir).exists());
    }

    #[test]
    fn test_read_info_roundtrip() {
        let (_td, dir) = state_dir();
        assert!(StoreLock::read_info(&dir).unwrap().is_none());
        let _lock = StoreLock::acquire(&dir, "run", false, None).unwrap();
        let info = StoreLock::read_info(&dir).unwrap().unwrap();
        assert_eq!(info.pid, process::id());
        assert!(!info.moot_version.is_empty());
    }

    #[test]
    fn test_old_lock_from_dead_process_is_replaced() {
        let (_td, dir) = state_dir();
        // PIDs near u32::MAX / 2 are not in use on test machines.
        write_foreign_lock(&dir, 999_999_999, 1);

        let lock = StoreLock::acquire(&dir, "run", false, Some(60)).unwrap();
        assert_eq!(lock.info().pid, process::id());
    }

    #[test]
    fn test_recent_lock_from_dead_process_needs_force() {
        let (_td, dir) = state_dir();
        write_foreign_lock(&dir, 999_999_999, now_secs());

        let result = StoreLock::acquire(&dir, "run", false, Some(3600));
        assert!(matches!(result, Err(LockError::StaleLock { .. })));

        let forced = StoreLock::acquire(&dir, "run", true, Some(3600));
        assert!(forced.is_ok());
    }

    #[test]
    fn test_corrupted_lock_is_reported() {
        let (_td, dir) = state_dir();
        fs::create_dir_all(&dir).unwrap();
        fs::write(StoreLock::lock_path(&dir), "{not json").unwrap();

        let result = StoreLock::acquire(&dir, "run", false, None);
        assert!(matches!(result, Err(LockError::CorruptedLock { .. })));
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(5), "5s");
        assert_eq!(format_age(120), "2m");
        assert_eq!(format_age(7200), "2h");
        assert_eq!(format_age(172_800), "2d");
    }
}
