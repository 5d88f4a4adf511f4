//! Key-value blob stores
//!
//! The history is persisted as a single blob under a fixed key. Any medium
//! that can get and set bytes by string key will do; the backends live in
//! `persistence` (files), `sqlite` (SQLite table) and here (memory).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::error::StorageResult;

/// A durable byte store addressed by string key
pub trait KeyValueStore: Send {
    /// Read the value for `key`, `None` if nothing was stored
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the value for `key` in one step
    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Short backend name for status output
    fn backend_name(&self) -> &'static str;
}

/// In-process store, for tests and throwaway sessions
///
/// Clones share the same map, so a test can keep a handle and inspect
/// what was written after handing the store to a session.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
