//! SQLite-backed key-value persistence
//!
//! Stores each key as a row in the `kv` table. A `set` replaces the row
//! inside a transaction, so readers only ever see a complete value.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::error::{StorageError, StorageResult};
use super::kv::KeyValueStore;
use super::schema::{init_schema, needs_init};

/// Key-value store in a SQLite database
pub struct SqliteKeyValueStore {
    conn: Connection,
}

impl SqliteKeyValueStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        if needs_init(&conn) {
            init_schema(&conn)?;
        }
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        tx.commit()?;
        debug!("wrote {} bytes to kv row {:?}", value.len(), key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing_key() {
        let store = SqliteKeyValueStore::open_in_memory().unwrap();
        assert!(store.get("history_items").unwrap().is_none());
    }

    #[test]
    fn test_set_replaces_value() {
        let mut store = SqliteKeyValueStore::open_in_memory().unwrap();

        store.set("history_items", b"old").unwrap();
        store.set("history_items", b"new").unwrap();

        assert_eq!(store.get("history_items").unwrap().unwrap(), b"new");
        let rows: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("imager.db");

        {
            let mut store = SqliteKeyValueStore::open(&path).unwrap();
            store.set("k", "héllo".as_bytes()).unwrap();
        }

        let store = SqliteKeyValueStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), "héllo".as_bytes());
    }
}
