// ABOUTME: JSON-file Storage backend that keeps every entry in a single document on disk.
// ABOUTME: Each mutation rewrites the file atomically via temp file, fsync, and rename.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use loso_core::{Storage, StorageError};
use thiserror::Error;

/// Errors that can occur while opening or writing a file store.
#[derive(Debug, Error)]
pub enum FileStorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage lock poisoned")]
    Poisoned,
}

impl From<FileStorageError> for StorageError {
    fn from(err: FileStorageError) -> Self {
        match err {
            FileStorageError::Io(e) => StorageError::Io(e),
            FileStorageError::Json(e) => StorageError::Json(e),
            FileStorageError::Poisoned => StorageError::Poisoned,
        }
    }
}

fn handle_poison<T>(_err: PoisonError<T>) -> FileStorageError {
    FileStorageError::Poisoned
}

/// A Storage backend persisted as one JSON object mapping keys to values.
/// The whole map is held in memory and written through on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) a file store at `path`. A missing file is an empty
    /// store; parent directories are created. A file that does not hold a
    /// JSON object of strings is an error.
    pub fn open(path: &Path) -> Result<Self, FileStorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let contents = fs::read_to_string(path)?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            BTreeMap::new()
        };

        tracing::info!(path = %path.display(), entries = entries.len(), "opened file store");

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// Returns the path to the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the map, write it to disk, and only then
    /// make it the in-memory state.
    fn mutate<F>(&self, change: F) -> Result<(), FileStorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.write().map_err(handle_poison)?;
        let mut next = entries.clone();
        change(&mut next);
        write_atomic(&self.path, &next)?;
        *entries = next;
        Ok(())
    }
}

/// Write the map to `path` using a temp file, fsync, and rename.
fn write_atomic(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), FileStorageError> {
    let json = serde_json::to_string_pretty(entries)?;

    let tmp_path = path.with_extension("json.tmp");
    let mut file = File::create(&tmp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;

    // Best-effort: the rename already happened, so a failed directory fsync
    // leaves consistent data behind.
    if let Some(parent) = path.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(handle_poison)?;
        Ok(entries.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.remove(key);
        })?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.mutate(BTreeMap::clear)?;
        Ok(())
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(handle_poison)?;
        Ok(entries.keys().nth(index).cloned())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let entries = self.entries.read().map_err(handle_poison)?;
        Ok(entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStorage::open(&dir.path().join("store.json")).unwrap();

        assert!(store.is_empty().unwrap());
        assert!(store.get_item("anything").unwrap().is_none());
        // Nothing is written until the first mutation
        assert!(!store.path().exists());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStorage::open(&path).unwrap();
        store.set_item("hello", "world").unwrap();
        store.set_item("n", "42").unwrap();
        store.remove_item("n").unwrap();
        drop(store);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("hello").unwrap().as_deref(), Some("world"));
        assert!(reopened.get_item("n").unwrap().is_none());
        assert_eq!(reopened.len().unwrap(), 1);
    }

    #[test]
    fn file_holds_a_json_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStorage::open(&path).unwrap();
        store.set_item("a", r#"{"x":1}"#).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["a"], serde_json::json!(r#"{"x":1}"#));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deep").join("nested").join("store.json");

        let store = FileStorage::open(&path).unwrap();
        store.set_item("k", "v").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn open_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{not json").unwrap();

        let result = FileStorage::open(&path);
        assert!(matches!(result, Err(FileStorageError::Json(_))));
    }

    #[test]
    fn empty_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "").unwrap();

        let store = FileStorage::open(&path).unwrap();
        assert_eq!(store.len().unwrap(), 0);
    }

    #[test]
    fn key_and_clear() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStorage::open(&path).unwrap();
        store.set_item("b", "2").unwrap();
        store.set_item("a", "1").unwrap();

        assert_eq!(store.key(0).unwrap().as_deref(), Some("a"));
        assert_eq!(store.key(1).unwrap().as_deref(), Some("b"));
        assert!(store.key(2).unwrap().is_none());

        store.clear().unwrap();
        drop(store);

        let reopened = FileStorage::open(&path).unwrap();
        assert!(reopened.is_empty().unwrap());
    }
}
