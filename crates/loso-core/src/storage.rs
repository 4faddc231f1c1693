// ABOUTME: The synchronous string-keyed storage capability the facade is built on.
// ABOUTME: Defines the Storage trait, shared-reference impls, and the in-memory MemoryStorage backend.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::StorageError;

/// A minimal synchronous key-value store with string keys and string values,
/// shaped after the browser `Storage` interface.
pub trait Storage {
    /// Read the value stored under `key`, or `None` if absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every entry.
    fn clear(&self) -> Result<(), StorageError>;

    /// Return the key at position `index` in the backend's enumeration order.
    fn key(&self, index: usize) -> Result<Option<String>, StorageError>;

    /// Number of stored entries.
    fn len(&self) -> Result<usize, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}

impl<T: Storage + ?Sized> Storage for &T {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        (**self).key(index)
    }

    fn len(&self) -> Result<usize, StorageError> {
        (**self).len()
    }
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        (**self).key(index)
    }

    fn len(&self) -> Result<usize, StorageError> {
        (**self).len()
    }
}

impl<T: Storage + ?Sized> Storage for Box<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        (**self).key(index)
    }

    fn len(&self) -> Result<usize, StorageError> {
        (**self).len()
    }
}

fn handle_poison<T>(_err: PoisonError<T>) -> StorageError {
    StorageError::Poisoned
}

/// In-memory storage. Clones share the same underlying map, so several
/// facades can be pointed at one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().map_err(handle_poison)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .map_err(handle_poison)?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().map_err(handle_poison)?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.entries.write().map_err(handle_poison)?.clear();
        Ok(())
    }

    fn key(&self, index: usize) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .read()
            .map_err(handle_poison)?
            .keys()
            .nth(index)
            .cloned())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.entries.read().map_err(handle_poison)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        assert!(storage.get_item("a").unwrap().is_none());

        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("1"));

        storage.set_item("a", "2").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("2"));

        storage.remove_item("a").unwrap();
        assert!(storage.get_item("a").unwrap().is_none());

        // Removing again is fine
        storage.remove_item("a").unwrap();
    }

    #[test]
    fn key_enumerates_in_sorted_order() {
        let storage = MemoryStorage::new();
        storage.set_item("b", "2").unwrap();
        storage.set_item("a", "1").unwrap();
        storage.set_item("c", "3").unwrap();

        assert_eq!(storage.len().unwrap(), 3);
        assert_eq!(storage.key(0).unwrap().as_deref(), Some("a"));
        assert_eq!(storage.key(1).unwrap().as_deref(), Some("b"));
        assert_eq!(storage.key(2).unwrap().as_deref(), Some("c"));
        assert!(storage.key(3).unwrap().is_none());
    }

    #[test]
    fn clear_empties_store() {
        let storage = MemoryStorage::new();
        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();

        storage.clear().unwrap();
        assert!(storage.is_empty().unwrap());
        assert!(storage.key(0).unwrap().is_none());
    }

    #[test]
    fn clones_share_contents() {
        let storage = MemoryStorage::new();
        let other = storage.clone();

        storage.set_item("shared", "yes").unwrap();
        assert_eq!(other.get_item("shared").unwrap().as_deref(), Some("yes"));
    }

    #[test]
    fn works_through_references_and_arcs() {
        fn write_through<S: Storage>(storage: S) {
            storage.set_item("k", "v").unwrap();
        }

        let storage = MemoryStorage::new();
        write_through(&storage);
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));

        let shared = Arc::new(MemoryStorage::new());
        write_through(Arc::clone(&shared));
        assert_eq!(shared.len().unwrap(), 1);
    }
}
