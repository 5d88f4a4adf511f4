//! Storage error handling
//!
//! Typed errors for history persistence, with hints the CLI can show when a
//! save fails.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which side of a storage access failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Read,
    Write,
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Permission denied: cannot access '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Disk is full or quota exceeded
    #[error("No space left while writing '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Stored history could not be decoded
    #[error("Stored value under '{key}' could not be decoded: {details}")]
    Decode { key: String, details: String },

    /// History could not be encoded for storage
    #[error("Failed to encode history: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The temp file was written but could not replace the target
    #[error("Could not replace '{to}' with '{from}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Classify an I/O error on `path` by its kind
    pub fn from_io(error: io::Error, path: PathBuf, op: IoOp) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            // StorageFull is not stable everywhere, so also sniff the message
            _ if op == IoOp::Write && is_disk_full_error(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => match op {
                IoOp::Read => StorageError::ReadError {
                    path,
                    source: error,
                },
                IoOp::Write => StorageError::WriteError {
                    path,
                    source: error,
                },
            },
        }
    }

    /// What the user can do so that the next save succeeds
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } | StorageError::CreateDirectory { .. } => {
                Some("Check that the data directory exists and is writable.")
            }
            StorageError::Database(_) => {
                Some("Another process may hold the database; close it or switch storage_backend to 'file'.")
            }
            StorageError::Decode { .. } => {
                Some("The stored history is unreadable and was treated as empty. The next change will overwrite it.")
            }
            _ => None,
        }
    }
}

fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
