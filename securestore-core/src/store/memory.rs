use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::KeyValueStore;
use crate::error::SecureStorageResult;

/// Store kept in process memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: String) -> SecureStorageResult<Option<String>> {
        Ok(self.lock().get(&key).cloned())
    }

    fn put(&self, key: String, value: String) -> SecureStorageResult<()> {
        self.lock().insert(key, value);
        Ok(())
    }

    fn remove(&self, key: String) -> SecureStorageResult<()> {
        self.lock().remove(&key);
        Ok(())
    }

    fn clear(&self) -> SecureStorageResult<()> {
        self.lock().clear();
        Ok(())
    }

    fn list_keys(&self) -> SecureStorageResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}
