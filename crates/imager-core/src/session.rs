//! History session
//!
//! `HistorySession` owns the ordered record collection for the lifetime of
//! the process. It loads once from the `HistoryStore` at construction and
//! writes the full collection back after every mutation.
//!
//! ## Failure policy
//!
//! - A mutation aimed at an unknown id fails with `SessionError::NotFound`
//!   and leaves the collection untouched.
//! - A mutation whose write fails is *kept* in memory and reported as
//!   `SessionError::NotPersisted`. The session stays dirty until a later
//!   save (any mutation, or `flush`) succeeds. Dropping a user's edit would be
//!   worse than a temporarily stale file.
//!
//! ## Observation
//!
//! `subscribe` hands out a channel receiving a `HistoryEvent` after every
//! successful in-memory mutation. Snapshots are always available via `all`.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Export, HistoryRecord};
use crate::storage::{HistoryStore, StorageError};

/// Errors from session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// No record with this id
    #[error("History record not found: {0}")]
    NotFound(Uuid),

    /// An id prefix matched more than one record
    #[error("Ambiguous id prefix '{0}'. Please provide more characters.")]
    AmbiguousId(String),

    /// No record id starts with this prefix
    #[error("No history record matches '{0}'")]
    NoMatch(String),

    /// A record with this id is already in the history
    #[error("History record {0} is already present")]
    DuplicateId(Uuid),

    /// The change was applied in memory but could not be written
    #[error("Change kept in memory but not saved: {0}")]
    NotPersisted(#[source] StorageError),
}

impl SessionError {
    /// Whether the in-memory state changed despite the error
    pub fn change_was_applied(&self) -> bool {
        matches!(self, SessionError::NotPersisted(_))
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Change notifications for subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    /// A record was added at the end
    Appended(Uuid),
    /// The latest record was replaced; carries (old id, new id)
    Replaced { old: Uuid, new: Uuid },
    /// A record's edited text changed
    Edited(Uuid),
    /// A record's favorite flag flipped
    FavoriteToggled { id: Uuid, is_favorite: bool },
    /// A record was removed
    Deleted(Uuid),
}

/// In-memory coordinator of the history collection
pub struct HistorySession {
    records: Vec<HistoryRecord>,
    store: HistoryStore,
    dirty: bool,
    subscribers: Vec<mpsc::UnboundedSender<HistoryEvent>>,
}

impl HistorySession {
    /// Build a session, loading the stored history once
    pub fn open(store: HistoryStore) -> Self {
        let records = store.load();
        debug!("history session opened with {} records", records.len());
        Self {
            records,
            store,
            dirty: false,
            subscribers: Vec::new(),
        }
    }

    // ==================== Mutations ====================

    /// Add a record at the end of the history
    pub fn append(&mut self, record: HistoryRecord) -> SessionResult<()> {
        if self.position(record.id).is_some() {
            return Err(SessionError::DuplicateId(record.id));
        }
        let id = record.id;
        self.records.push(record);
        self.notify(HistoryEvent::Appended(id));
        self.persist()
    }

    /// Replace the most recent record, or append if the history is empty
    pub fn replace_latest(&mut self, record: HistoryRecord) -> SessionResult<()> {
        let new = record.id;
        let Some(old) = self.latest().map(|r| r.id) else {
            return self.append(record);
        };
        if old != new && self.records.iter().any(|r| r.id == new) {
            return Err(SessionError::DuplicateId(new));
        }
        if let Some(last) = self.records.last_mut() {
            *last = record;
        }
        self.notify(HistoryEvent::Replaced { old, new });
        self.persist()
    }

    /// Set the edited text of the record with `id`
    ///
    /// `extracted_text`, `created_at` and the id stay as they are.
    pub fn commit_edit(&mut self, id: Uuid, new_text: impl Into<String>) -> SessionResult<()> {
        let index = self.position(id).ok_or(SessionError::NotFound(id))?;
        self.records[index].edited_text = new_text.into();
        self.notify(HistoryEvent::Edited(id));
        self.persist()
    }

    /// Flip the favorite flag, returning the new value
    ///
    /// On `NotPersisted` the flag has still been flipped.
    pub fn toggle_favorite(&mut self, id: Uuid) -> SessionResult<bool> {
        let index = self.position(id).ok_or(SessionError::NotFound(id))?;
        let record = &mut self.records[index];
        record.is_favorite = !record.is_favorite;
        let is_favorite = record.is_favorite;
        self.notify(HistoryEvent::FavoriteToggled { id, is_favorite });
        self.persist()?;
        Ok(is_favorite)
    }

    /// Remove the record with `id` for good, returning it
    pub fn delete(&mut self, id: Uuid) -> SessionResult<HistoryRecord> {
        let index = self.position(id).ok_or(SessionError::NotFound(id))?;
        let removed = self.records.remove(index);
        self.notify(HistoryEvent::Deleted(id));
        self.persist()?;
        Ok(removed)
    }

    /// Retry writing the current collection
    pub fn flush(&mut self) -> SessionResult<()> {
        self.persist()
    }

    // ==================== Queries ====================

    /// All records in insertion order
    pub fn all(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn get(&self, id: Uuid) -> Option<&HistoryRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn latest(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Favorite records in insertion order
    pub fn favorites(&self) -> Vec<&HistoryRecord> {
        self.records.iter().filter(|r| r.is_favorite).collect()
    }

    /// Records whose text contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&HistoryRecord> {
        let query = query.trim();
        self.records.iter().filter(|r| r.matches(query)).collect()
    }

    /// Resolve a full id or a unique id prefix
    pub fn resolve_prefix(&self, prefix: &str) -> SessionResult<Uuid> {
        if let Ok(id) = Uuid::parse_str(prefix) {
            return self
                .get(id)
                .map(|r| r.id)
                .ok_or(SessionError::NotFound(id));
        }

        let needle = prefix.to_lowercase();
        let mut matches = self
            .records
            .iter()
            .filter(|r| r.id.to_string().starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(record), None) if !needle.is_empty() => Ok(record.id),
            (Some(_), _) => Err(SessionError::AmbiguousId(prefix.to_string())),
            (None, _) => Err(SessionError::NoMatch(prefix.to_string())),
        }
    }

    /// Plain-text export of a record's current text
    pub fn export(&self, id: Uuid) -> SessionResult<Export> {
        self.get(id)
            .map(HistoryRecord::export)
            .ok_or(SessionError::NotFound(id))
    }

    /// Current text of a record, for the clipboard
    pub fn clipboard_text(&self, id: Uuid) -> SessionResult<&str> {
        self.get(id)
            .map(HistoryRecord::clipboard_text)
            .ok_or(SessionError::NotFound(id))
    }

    /// Whether the last write failed and memory is ahead of storage
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Name of the storage backend in use
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    // ==================== Observation ====================

    /// Receive an event after every successful mutation
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<HistoryEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    // ==================== Private helpers ====================

    fn position(&self, id: Uuid) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn notify(&mut self, event: HistoryEvent) {
        // Receivers that were dropped are pruned here
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    fn persist(&mut self) -> SessionResult<()> {
        match self.store.save(&self.records) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("history change not saved, keeping it in memory: {}", e);
                self.dirty = true;
                Err(SessionError::NotPersisted(e))
            }
        }
    }
}
