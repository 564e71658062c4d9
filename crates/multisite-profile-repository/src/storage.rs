//! JSON file backed store with atomic writes

use crate::error::StorageError;
use crate::store::{BackingStore, BatchOp, apply_to_map, keys_with_prefix};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// JSON file holding every key
    pub path: PathBuf,
    /// Enable atomic writes (write to temp, then rename)
    pub atomic_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("site-options.json"),
            atomic_writes: true,
        }
    }
}

impl StorageConfig {
    /// Create a new storage configuration for the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set atomic writes option
    pub fn with_atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// Key-value store persisted as a single JSON object
///
/// The whole map is held in memory and written back after every change.
/// [`BackingStore::apply_batch`] commits all of its operations with one
/// file write.
#[derive(Debug)]
pub struct FileStorage {
    config: StorageConfig,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open the store at `path`, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or an existing file cannot be
    /// read or parsed. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::with_config(StorageConfig::new(path))
    }

    /// Open with custom configuration
    ///
    /// # Errors
    ///
    /// See [`FileStorage::open`].
    pub fn with_config(config: StorageConfig) -> Result<Self, StorageError> {
        if let Some(parent) = config.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StorageError::write_failed(parent, e))?;
        }

        let entries = read_entries(&config.path)?;
        debug!(path = ?config.path, keys = entries.len(), "Opened file storage");

        Ok(Self {
            config,
            entries: RwLock::new(entries),
        })
    }

    /// Discard the in-memory map and read the file again
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn reload(&self) -> Result<(), StorageError> {
        let entries = read_entries(&self.config.path)?;
        *self.entries.write() = entries;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn update<F>(&self, mutate: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        mutate(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let path = &self.config.path;
        let json = serde_json::to_string_pretty(entries).map_err(|e| StorageError::Corrupt {
            path: path.clone(),
            source: e,
        })?;

        if self.config.atomic_writes {
            write_atomic(path, &json)
        } else {
            fs::write(path, json).map_err(|e| StorageError::write_failed(path, e))
        }
    }
}

/// Write content to a file atomically
///
/// Writes to `<path>.tmp` first and renames it over `path`, so the original
/// file is preserved if the write fails.
fn write_atomic(path: &Path, content: &str) -> Result<(), StorageError> {
    debug!(path = ?path, "Writing file atomically");

    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content).map_err(|e| StorageError::write_failed(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| StorageError::write_failed(path, e))?;

    Ok(())
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(StorageError::read_failed(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
        path: path.to_path_buf(),
        source: e,
    })
}

impl BackingStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if !self.entries.read().contains_key(key) {
            return Ok(false);
        }
        self.update(|entries| {
            entries.remove(key);
        })?;
        Ok(true)
    }

    fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(keys_with_prefix(&self.entries.read(), prefix))
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        debug!(path = ?self.config.path, ops = ops.len(), "Applying batch");
        self.update(|entries| apply_to_map(entries, ops))
    }
}
