//! Backing key-value store interface
//!
//! Keys are global strings; the store enforces no namespacing of its own.
//! Implementations use interior mutability so a store can be shared between
//! the profile repository and other components.

use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One write in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Create or overwrite a key
    Set {
        /// Key to write
        key: String,
        /// New value
        value: String,
    },
    /// Remove a key
    Delete {
        /// Key to remove
        key: String,
    },
}

impl BatchOp {
    /// Create a set operation
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a delete operation
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }
}

/// Key-value persistence used for every profile read and write
pub trait BackingStore {
    /// Value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Create or overwrite `key`
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`, returning whether a value was present
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Every key starting with `prefix`
    fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Value stored under `key`, or `default` when absent
    fn get_or(&self, key: &str, default: &str) -> Result<String, StorageError> {
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Apply several writes
    ///
    /// The default implementation applies them one by one and stops at the
    /// first failure, leaving earlier writes in place. Stores that can commit
    /// several keys at once override this.
    fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        for op in ops {
            match op {
                BatchOp::Set { key, value } => self.set(key, value)?,
                BatchOp::Delete { key } => {
                    self.delete(key)?;
                }
            }
        }
        Ok(())
    }
}

impl<T: BackingStore + ?Sized> BackingStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        (**self).delete(key)
    }

    fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list_keys_by_prefix(prefix)
    }

    fn get_or(&self, key: &str, default: &str) -> Result<String, StorageError> {
        (**self).get_or(key, default)
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        (**self).apply_batch(ops)
    }
}

impl<T: BackingStore + ?Sized> BackingStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        (**self).delete(key)
    }

    fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        (**self).list_keys_by_prefix(prefix)
    }

    fn get_or(&self, key: &str, default: &str) -> Result<String, StorageError> {
        (**self).get_or(key, default)
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        (**self).apply_batch(ops)
    }
}

/// Apply `ops` to an in-memory map
pub(crate) fn apply_to_map(map: &mut BTreeMap<String, String>, ops: &[BatchOp]) {
    for op in ops {
        match op {
            BatchOp::Set { key, value } => {
                map.insert(key.clone(), value.clone());
            }
            BatchOp::Delete { key } => {
                map.remove(key);
            }
        }
    }
}

/// Keys of `map` starting with `prefix`, in key order
pub(crate) fn keys_with_prefix(map: &BTreeMap<String, String>, prefix: &str) -> Vec<String> {
    map.range(prefix.to_string()..)
        .take_while(|(key, _)| key.starts_with(prefix))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Volatile store backed by a sorted map
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `entries`
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }

    /// Copy of every stored entry
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries.read().clone()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl BackingStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.write().remove(key).is_some())
    }

    fn list_keys_by_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(keys_with_prefix(&self.entries.read(), prefix))
    }

    fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), StorageError> {
        apply_to_map(&mut self.entries.write(), ops);
        Ok(())
    }
}
