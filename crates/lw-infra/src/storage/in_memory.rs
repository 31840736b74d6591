use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lw_core::ports::{KeyValueStoragePort, StorageError};

/// Process-local storage.
///
/// Can be switched into an unavailable mode where every call fails, the way
/// a blocked or private-mode browser context behaves.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStorage {
    items: Mutex<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl InMemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage is blocked".to_string()));
        }
        Ok(self.items.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl KeyValueStoragePort for InMemoryKeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = InMemoryKeyValueStorage::new();

        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), Some("v".to_string()));

        storage.remove_item("k").unwrap();
        assert_eq!(storage.get_item("k").unwrap(), None);
    }

    #[test]
    fn unavailable_storage_fails_every_call() {
        let storage = InMemoryKeyValueStorage::new();
        storage.set_unavailable(true);

        assert!(matches!(
            storage.get_item("k"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.set_item("k", "v").is_err());
        assert!(storage.remove_item("k").is_err());
    }
}
