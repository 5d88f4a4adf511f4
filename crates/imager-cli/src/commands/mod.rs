//! Command handlers

pub mod config;
pub mod history;
pub mod scan;
pub mod status;

use anyhow::{Context, Result};
use uuid::Uuid;

use imager_core::{HistorySession, SessionError, SessionResult};

use crate::output::Output;

/// Resolve a full UUID or a unique prefix to a record id
pub fn parse_record_id(session: &HistorySession, id: &str) -> Result<Uuid> {
    session.resolve_prefix(id).map_err(|e| {
        if let SessionError::AmbiguousId(prefix) = &e {
            let candidates: Vec<String> = session
                .all()
                .iter()
                .map(|r| r.id.to_string())
                .filter(|s| s.starts_with(&prefix.to_lowercase()))
                .collect();
            eprintln!("Matches:");
            for candidate in candidates {
                eprintln!("  {}", candidate);
            }
        }
        anyhow::Error::new(e)
    })
}

/// Turn a mutation result into a command result
///
/// A change that was applied in memory but not written is retried once; the
/// process is about to exit, so an unsaved change would be lost.
pub fn ensure_saved<T>(
    session: &mut HistorySession,
    result: SessionResult<T>,
    output: &Output,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.change_was_applied() => {
            output.warning(&e.to_string());
            if let SessionError::NotPersisted(cause) = &e {
                if let Some(hint) = cause.recovery_suggestion() {
                    output.warning(hint);
                }
            }
            session
                .flush()
                .context("Failed to save history; the change was discarded")?;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use imager_core::storage::MemoryKeyValueStore;
    use imager_core::{HistoryRecord, HistorySession, HistoryStore};

    /// Session over an in-memory store seeded with one record per text
    pub fn session_with(texts: &[&str]) -> (HistorySession, MemoryKeyValueStore) {
        let backend = MemoryKeyValueStore::new();
        let mut store = HistoryStore::new(backend.clone());
        let records: Vec<HistoryRecord> = texts.iter().map(|t| HistoryRecord::new(*t)).collect();
        store.save(&records).unwrap();
        (HistorySession::open(store), backend)
    }
}
