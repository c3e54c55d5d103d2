//! A JSON array document held in memory and mirrored to one file.
//!
//! Mutations run against a copy; the copy replaces the in-memory state only
//! after the file was written, so memory and disk never disagree about what
//! was committed.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use moot_utils::atomic_write::write_file_atomic;
use moot_utils::error::StoreError;

pub(crate) struct Document<T> {
    path: Option<Utf8PathBuf>,
    items: Mutex<Vec<T>>,
    fail_writes: AtomicBool,
}

impl<T> Document<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// In-memory document with no backing file.
    pub fn memory() -> Self {
        Self {
            path: None,
            items: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Load `path`, or start empty when it does not exist yet.
    pub fn open(path: Utf8PathBuf) -> Result<Self, StoreError> {
        let items = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                path: path.to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_string(),
                    source,
                });
            }
        };

        Ok(Self {
            path: Some(path),
            items: Mutex::new(items),
            fail_writes: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Make every following write fail. Used to exercise checkpoint failures.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.lock())
    }

    /// Apply `f` to a copy, persist the copy, then commit it.
    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Vec<T>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }

    fn persist(&self, items: &[T]) -> Result<(), StoreError> {
        let target = self.path.as_deref().map_or("<memory>", Utf8Path::as_str);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                path: target.to_string(),
                reason: "writes disabled".to_string(),
            });
        }
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(items).map_err(|e| StoreError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        let result = write_file_atomic(path, &json).map_err(|e| StoreError::WriteFailed {
            path: path.to_string(),
            reason: format!("{e:#}"),
        })?;
        for warning in result.warnings {
            tracing::warn!(path = %path, "{warning}");
        }
        Ok(())
    }
}
