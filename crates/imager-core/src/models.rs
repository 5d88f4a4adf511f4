//! Data models for Imager
//!
//! Defines the History Record, the unit persisted for every OCR extraction,
//! and the plain-text export handed to share/export collaborators.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::atomic_write;
use crate::storage::error::StorageResult;

/// Suggested filename for exported text
pub const EXPORT_FILENAME: &str = "detected_text.txt";

/// One OCR extraction and its current edited state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryRecord {
    /// Unique identifier, assigned at creation
    pub id: Uuid,
    /// When the extraction happened
    pub created_at: DateTime<Utc>,
    /// Text as returned by OCR. Never overwritten.
    pub extracted_text: String,
    /// Text the user currently sees
    pub edited_text: String,
    /// Marked as favorite in the history list
    #[serde(default)]
    pub is_favorite: bool,
}

impl HistoryRecord {
    /// Create a record for freshly extracted text
    pub fn new(extracted_text: impl Into<String>) -> Self {
        let extracted_text = extracted_text.into();
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            edited_text: extracted_text.clone(),
            extracted_text,
            is_favorite: false,
        }
    }

    /// Whether the user has changed the text since extraction
    pub fn is_edited(&self) -> bool {
        self.edited_text != self.extracted_text
    }

    /// Whether there is nothing but whitespace to show
    pub fn is_blank(&self) -> bool {
        self.edited_text.trim().is_empty()
    }

    /// First line of the current text, truncated to `max_chars`
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.edited_text.lines().next().unwrap_or("");
        truncate_chars(first_line, max_chars)
    }

    /// Case-insensitive substring match against edited or extracted text
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        self.edited_text.to_lowercase().contains(&needle)
            || self.extracted_text.to_lowercase().contains(&needle)
    }

    /// Text placed on the clipboard
    pub fn clipboard_text(&self) -> &str {
        &self.edited_text
    }

    /// Plain-text export of the current text
    pub fn export(&self) -> Export {
        Export {
            filename: EXPORT_FILENAME.to_string(),
            contents: self.edited_text.clone(),
        }
    }
}

/// Plain UTF-8 text plus a suggested filename
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub filename: String,
    pub contents: String,
}

impl Export {
    /// Write the export into `dir` under its suggested filename
    ///
    /// Returns the path written.
    pub fn write_to(&self, dir: &Path) -> StorageResult<PathBuf> {
        let path = dir.join(&self.filename);
        atomic_write(&path, self.contents.as_bytes())?;
        Ok(path)
    }
}

/// Truncate on a char boundary, adding "..." if anything was cut
fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
