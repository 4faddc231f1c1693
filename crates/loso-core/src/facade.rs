// ABOUTME: The Loso store facade: get/set/remove over a Storage backend with per-key metadata.
// ABOUTME: Every call reloads the index record, repairs it if needed, applies the change, and writes it back.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::entry::Entry;
use crate::error::LosoError;
use crate::index::{CONFIG_NAME, IndexRecord, Metadata};
use crate::storage::{MemoryStorage, Storage};

/// Construction options for [`Loso`].
#[derive(Debug, Clone)]
pub struct LosoOptions<S> {
    /// Schema version stamped on every write.
    pub version: String,
    pub storage: S,
}

/// Versioned key-value facade. Values are stored under their own key in the
/// backend; bookkeeping for every tracked key lives in a single index record
/// under [`Loso::CONFIG_NAME`].
///
/// No locking is done: two facades sharing one backend can interleave their
/// index rewrites, and the last write wins.
#[derive(Debug, Clone)]
pub struct Loso<S> {
    version: String,
    storage: S,
}

impl Loso<MemoryStorage> {
    /// A facade over a fresh in-memory backend.
    pub fn in_memory(version: impl Into<String>) -> Self {
        Self::new(version, MemoryStorage::new())
    }
}

impl<S: Storage> Loso<S> {
    pub const CONFIG_NAME: &'static str = CONFIG_NAME;

    pub fn new(version: impl Into<String>, storage: S) -> Self {
        Self {
            version: version.into(),
            storage,
        }
    }

    pub fn from_options(options: LosoOptions<S>) -> Self {
        Self::new(options.version, options.storage)
    }

    /// The schema version this facade stamps on writes.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Store `value` under `key` and record its metadata.
    pub fn set(&self, key: &str, value: impl Into<Entry>) -> Result<(), LosoError> {
        let mut index = self.load_index()?;
        let entry = value.into();
        let string_type = entry.is_text();

        self.storage.set_item(key, &entry.encode()?)?;

        index.insert(key, Metadata::now(&self.version, string_type));
        self.save_index(&index)?;

        tracing::debug!(key, version = %self.version, string_type, "stored value");
        Ok(())
    }

    /// Serialize `value` and store it under `key`. Values that serialize to
    /// a JSON string are stored as raw text.
    pub fn set_value<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), LosoError> {
        self.set(key, Entry::from_serialize(value)?)
    }

    /// Read the value tracked under `key`.
    ///
    /// Returns `None` when the key is not in the index, and also when it is
    /// tracked but the backend no longer holds a value (the stale index
    /// entry is dropped). A tracked JSON value that no longer parses is an
    /// error.
    pub fn get(&self, key: &str) -> Result<Option<Entry>, LosoError> {
        let mut index = self.load_index()?;

        let string_type = match index.get(key) {
            Some(meta) => meta.string_type,
            None => return Ok(None),
        };

        let Some(raw) = self.storage.get_item(key)? else {
            tracing::debug!(key, "pruning index entry with no stored value");
            index.remove(key);
            self.save_index(&index)?;
            return Ok(None);
        };

        if string_type {
            return Ok(Some(Entry::Text(raw)));
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(Entry::Json(value))),
            Err(source) => {
                tracing::warn!(key, error = %source, "stored value is not valid json");
                Err(LosoError::Json {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }

    /// Read `key` and deserialize it into `T`.
    pub fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LosoError> {
        match self.get(key)? {
            Some(entry) => entry.deserialize().map(Some).map_err(|source| LosoError::Json {
                key: key.to_string(),
                source,
            }),
            None => Ok(None),
        }
    }

    /// Remove `key` from the backend and the index. The index is rewritten
    /// even when the key was not tracked.
    pub fn remove(&self, key: &str) -> Result<(), LosoError> {
        let mut index = self.load_index()?;

        self.storage.remove_item(key)?;
        index.remove(key);
        self.save_index(&index)?;

        tracing::debug!(key, "removed value");
        Ok(())
    }

    /// Metadata recorded for `key`, if tracked.
    pub fn metadata(&self, key: &str) -> Result<Option<Metadata>, LosoError> {
        Ok(self.load_index()?.remove(key))
    }

    /// All tracked keys in sorted order.
    pub fn keys(&self) -> Result<Vec<String>, LosoError> {
        Ok(self.load_index()?.keys().map(str::to_string).collect())
    }

    /// The current index record, repaired if it was missing or malformed.
    pub fn index(&self) -> Result<IndexRecord, LosoError> {
        self.load_index()
    }

    /// True when `key` is tracked and was last written under a different
    /// schema version than this facade's.
    pub fn is_outdated(&self, key: &str) -> Result<bool, LosoError> {
        Ok(self
            .metadata(key)?
            .is_some_and(|meta| meta.version != self.version))
    }

    /// Tracked keys last written under a different schema version.
    pub fn outdated_keys(&self) -> Result<Vec<String>, LosoError> {
        let index = self.load_index()?;
        Ok(index
            .configs
            .into_iter()
            .filter(|(_, meta)| meta.version != self.version)
            .map(|(key, _)| key)
            .collect())
    }

    /// Load the index record, replacing it with a fresh one when it is
    /// absent or malformed.
    fn load_index(&self) -> Result<IndexRecord, LosoError> {
        let raw = self.storage.get_item(CONFIG_NAME)?;

        let Some(raw) = raw else {
            tracing::debug!("no index record found, creating one");
            return self.reset_index();
        };

        match IndexRecord::parse(&raw) {
            Some(index) => Ok(index),
            None => {
                tracing::warn!("index record is malformed, resetting");
                self.reset_index()
            }
        }
    }

    fn reset_index(&self) -> Result<IndexRecord, LosoError> {
        let index = IndexRecord::new();
        self.save_index(&index)?;
        Ok(index)
    }

    fn save_index(&self, index: &IndexRecord) -> Result<(), LosoError> {
        self.storage.set_item(CONFIG_NAME, &index.to_json()?)?;
        Ok(())
    }
}
