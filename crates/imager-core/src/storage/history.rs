//! Durable history of extractions
//!
//! The whole record collection is serialized as one JSON array and written
//! under a fixed key. Every save replaces the previous blob; there are no
//! incremental writes. That keeps the format trivial at the expected size
//! (hundreds of records) at the cost of rewriting everything per change.
//!
//! Loading never fails: a missing, unreadable or undecodable blob is treated
//! as an empty history so a corrupt file cannot take the session down.

use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;
use crate::models::HistoryRecord;

/// Key under which the history blob is stored
pub const HISTORY_KEY: &str = "history_items";

/// Persistence boundary for the history record collection
pub struct HistoryStore {
    backend: Box<dyn KeyValueStore>,
}

impl HistoryStore {
    /// Create a store over any key-value backend
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Create a store from an already boxed backend
    pub fn from_boxed(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Load all records in stored order
    ///
    /// Returns an empty history when nothing was saved yet or the stored
    /// data cannot be read or decoded.
    pub fn load(&self) -> Vec<HistoryRecord> {
        match self.try_load() {
            Ok(records) => {
                info!("loaded {} history records", records.len());
                records
            }
            Err(e) => {
                warn!("treating history as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Load, reporting why the history could not be read
    pub fn try_load(&self) -> StorageResult<Vec<HistoryRecord>> {
        let Some(bytes) = self.backend.get(HISTORY_KEY)? else {
            debug!("no stored history under {:?}", HISTORY_KEY);
            return Ok(Vec::new());
        };
        decode(&bytes)
    }

    /// Replace the stored history with `records`
    pub fn save(&mut self, records: &[HistoryRecord]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(records).map_err(StorageError::Encode)?;
        self.backend.set(HISTORY_KEY, &bytes)?;
        debug!("saved {} history records ({} bytes)", records.len(), bytes.len());
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> StorageResult<Vec<HistoryRecord>> {
    serde_json::from_slice(bytes).map_err(|e| StorageError::Decode {
        key: HISTORY_KEY.to_string(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileKeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample_records() -> Vec<HistoryRecord> {
        let mut first = HistoryRecord::new("Invoice 42\nTotal: 10.00\n");
        first.created_at = Utc.timestamp_opt(1_719_915_330, 123_456_789).unwrap();
        first.edited_text = "Invoice 42\nTotal: 12.00\n".to_string();
        first.is_favorite = true;

        let second = HistoryRecord::new("");

        let third = HistoryRecord::new("Invoice 42\nTotal: 10.00\n");

        vec![first, second, third]
    }

    #[test]
    fn test_load_empty_backend() {
        let store = HistoryStore::new(MemoryKeyValueStore::new());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_content_and_order() {
        let records = sample_records();
        let mut store = HistoryStore::new(MemoryKeyValueStore::new());

        store.save(&records).unwrap();

        assert_eq!(store.load(), records);
    }

    #[test]
    fn test_round_trip_through_files_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let records = sample_records();

        {
            let backend = FileKeyValueStore::open(temp_dir.path()).unwrap();
            let mut store = HistoryStore::new(backend);
            store.save(&records).unwrap();
        }

        let backend = FileKeyValueStore::open(temp_dir.path()).unwrap();
        let store = HistoryStore::new(backend);
        let loaded = store.load();

        assert_eq!(loaded, records);
        assert_eq!(loaded[0].created_at, records[0].created_at);
        assert_eq!(loaded[0].id, records[0].id);
    }

    #[test]
    fn test_round_trip_through_sqlite() {
        let records = sample_records();
        let mut store = HistoryStore::new(SqliteKeyValueStore::open_in_memory().unwrap());

        store.save(&records).unwrap();

        assert_eq!(store.load(), records);
        assert_eq!(store.backend_name(), "sqlite");
    }

    #[test]
    fn test_save_replaces_previous_blob() {
        let mut store = HistoryStore::new(MemoryKeyValueStore::new());
        let records = sample_records();

        store.save(&records).unwrap();
        store.save(&records[..1]).unwrap();

        assert_eq!(store.load(), records[..1].to_vec());
    }

    #[test]
    fn test_corrupt_blob_loads_as_empty() {
        let mut backend = MemoryKeyValueStore::new();
        backend.set(HISTORY_KEY, b"{not json at all").unwrap();
        let store = HistoryStore::new(backend);

        assert!(store.load().is_empty());
        assert!(matches!(store.try_load(), Err(StorageError::Decode { .. })));
    }

    #[test]
    fn test_wrong_shape_loads_as_empty() {
        let mut backend = MemoryKeyValueStore::new();
        backend
            .set(HISTORY_KEY, br#"[{"id": "not-a-uuid", "extracted_text": 3}]"#)
            .unwrap();
        let store = HistoryStore::new(backend);

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_blob_is_overwritten_by_next_save() {
        let mut backend = MemoryKeyValueStore::new();
        backend.set(HISTORY_KEY, &[0xff, 0xfe, 0x00]).unwrap();
        let mut store = HistoryStore::new(backend);

        let records = store.load();
        assert!(records.is_empty());

        let fresh = vec![HistoryRecord::new("after recovery\n")];
        store.save(&fresh).unwrap();
        assert_eq!(store.load(), fresh);
    }

    #[test]
    fn test_unreadable_medium_loads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileKeyValueStore::open(temp_dir.path()).unwrap();
        // A directory where the history file should be makes every read fail
        std::fs::create_dir(backend.path_for(HISTORY_KEY)).unwrap();
        let store = HistoryStore::new(backend);

        assert!(store.load().is_empty());
        assert!(matches!(
            store.try_load(),
            Err(StorageError::ReadError { .. })
        ));
    }
}
