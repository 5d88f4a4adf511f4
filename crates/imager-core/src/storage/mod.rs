//! Storage layer
//!
//! Persists the history collection as a single blob in a key-value medium.
//!
//! ## Architecture
//!
//! - **HistoryStore**: encodes/decodes the record collection (JSON)
//! - **KeyValueStore**: byte blobs by key, with file, SQLite and
//!   in-memory backends
//!
//! The backend is picked from `Config::storage_backend` by `open_backend`.

pub mod error;
pub mod history;
pub mod kv;
pub mod persistence;
pub mod schema;
pub mod sqlite;

pub use error::{IoOp, StorageError, StorageResult};
pub use history::{HistoryStore, HISTORY_KEY};
pub use kv::{KeyValueStore, MemoryKeyValueStore};
pub use persistence::{atomic_write, FileKeyValueStore};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteKeyValueStore;

use crate::config::{Config, StorageBackend};

/// Open the key-value backend selected by the configuration
pub fn open_backend(config: &Config) -> StorageResult<Box<dyn KeyValueStore>> {
    let backend: Box<dyn KeyValueStore> = match config.storage_backend {
        StorageBackend::File => Box::new(FileKeyValueStore::open(config.history_dir())?),
        StorageBackend::Sqlite => Box::new(SqliteKeyValueStore::open(&config.sqlite_path())?),
    };
    Ok(backend)
}
