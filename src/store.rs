use std::collections::HashMap;

use crate::error::StoreError;

/// A key-value byte store that event states are persisted to.
///
/// Keys are event names; values are opaque encoded records. The cache only
/// reads a key the first time an event is referenced, and only writes during
/// [`EventCache::synchronize`](crate::EventCache::synchronize).
pub trait PersistentStore {
    /// Fetch the bytes stored under `key`, or `None` if there are none.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Make previous writes durable. Best effort: stores without a notion
    /// of durability return `Ok(())`.
    fn flush(&mut self) -> Result<(), StoreError>;
}

impl<S: PersistentStore + ?Sized> PersistentStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

impl<S: PersistentStore + ?Sized> PersistentStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

/// In-memory [`PersistentStore`]. Nothing survives the process.
///
/// # Examples
///
/// ```
/// use eventtally::{MemoryStore, PersistentStore};
///
/// let mut store = MemoryStore::new();
/// store.set("k", b"v".to_vec()).unwrap();
/// assert_eq!(store.get("k").unwrap(), Some(b"v".to_vec()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
