//! File-backed key-value persistence
//!
//! Each key is stored as one file in the history directory. Writes are
//! atomic (write to temp file, fsync, then rename) so a crash mid-save leaves
//! the previous value intact.
//!
//! Storage location: `~/.local/share/imager/history/` (configurable via `Config`)

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{IoOp, StorageError, StorageResult};
use super::kv::KeyValueStore;

/// File extension for stored values
const VALUE_EXTENSION: &str = "store";

/// Key-value store keeping one file per key
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the value files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), VALUE_EXTENSION))
    }

    /// Check if a value exists on disk for `key`
    pub fn exists(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io(e, path, IoOp::Read)),
        }
    }

    fn set(&mut self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key);
        atomic_write(&path, value)?;
        debug!("wrote {} bytes to {:?}", value.len(), path);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

/// Map a key onto a safe file stem
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write data to a file atomically
///
/// 1. Write to a uniquely named temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state, and no other
/// file next to it is touched.
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
        path: parent.to_path_buf(),
        source,
    })?;

    // Same directory, so the rename stays on one filesystem
    let mut temp = tempfile::Builder::new()
        .prefix(".imager-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| StorageError::from_io(e, parent.to_path_buf(), IoOp::Write))?;
    let temp_path = temp.path().to_path_buf();

    temp.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone(), IoOp::Write))?;

    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone(), IoOp::Write))?;

    temp.persist(path)
        .map_err(|e| StorageError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source: e.error,
        })?;

    Ok(())
}
