//! Durable string key-value storage.
//!
//! Writes are last-writer-wins per key. A batch passed to
//! [`KeyValueStore::apply`] lands completely or not at all.
//! [`JsonFileStore`] survives restarts, [`MemoryStore`] does not.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::StorageError;

/// Storage keys shared by the filter and session stores.
pub mod keys {
    pub const FILTER_DISTANCE: &str = "filter_distance";
    pub const CENTER_LAT: &str = "center_lat";
    pub const CENTER_LNG: &str = "center_lng";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const EXPIRES_AT: &str = "expires_at";
    pub const TOKEN_TYPE: &str = "token_type";
}

/// One entry of a batch: `Some` sets the key, `None` removes it.
pub type Change<'a> = (&'a str, Option<&'a str>);

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Applies every change or none of them. On error the visible state is
    /// what it was before the call.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the batch cannot be made durable.
    fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns [`StorageError`] if the value cannot be made durable.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.apply(&[(key, Some(value))])
    }

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the removal cannot be made durable.
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.apply(&[(key, None)])
    }
}

/// Returns the map after `changes`, or `None` if nothing would change.
fn merged(
    entries: &BTreeMap<String, String>,
    changes: &[Change<'_>],
) -> Option<BTreeMap<String, String>> {
    let mut next = entries.clone();
    for (key, value) in changes {
        match value {
            Some(value) => {
                next.insert((*key).to_owned(), (*value).to_owned());
            }
            None => {
                next.remove(*key);
            }
        }
    }
    (next != *entries).then_some(next)
}

fn lock(entries: &Mutex<BTreeMap<String, String>>) -> MutexGuard<'_, BTreeMap<String, String>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        if let Some(next) = merged(&entries, changes) {
            *entries = next;
        }
        Ok(())
    }
}

/// Flat JSON object on disk. Every change rewrites a temporary file next to
/// it and renames it into place, so a crash never leaves a partial file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store; the file
    /// and its parent directories are created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if an existing file cannot be read and
    /// [`StorageError::Json`] if it is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|source| StorageError::Json {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        tracing::debug!(path = %path.display(), keys = entries.len(), "opened state file");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io {
            path: self.path.display().to_string(),
            source,
        };
        let content = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Json {
            path: self.path.display().to_string(),
            source,
        })?;
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(content.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn apply(&self, changes: &[Change<'_>]) -> Result<(), StorageError> {
        let mut entries = lock(&self.entries);
        let Some(next) = merged(&entries, changes) else {
            return Ok(());
        };
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}
