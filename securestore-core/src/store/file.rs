use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::KeyValueStore;
use crate::atomic_file::write_owner_only;
use crate::error::{SecureStorageError, SecureStorageResult};

/// File name used by [`FileStore::open_in`].
pub const DEFAULT_STORE_FILE_NAME: &str = "cap_sec.json";

/// Store persisted as a single JSON object.
///
/// The whole file is rewritten on every mutation: written to a temporary
/// sibling and renamed over the original, readable only by the owner on
/// Unix.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; it is
    /// created on the first write.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the file cannot be read or is not a JSON object of
    /// strings.
    pub fn open(path: impl Into<PathBuf>) -> SecureStorageResult<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                SecureStorageError::Store(format!("corrupt store {}: {err}", path.display()))
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(SecureStorageError::Store(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        debug!("opened store {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens [`DEFAULT_STORE_FILE_NAME`] inside `dir`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_in(dir: &Path) -> SecureStorageResult<Self> {
        Self::open(dir.join(DEFAULT_STORE_FILE_NAME))
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies `change` to a copy of the entries, persists it and only then
    /// swaps it in.
    fn mutate(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> SecureStorageResult<()> {
        let mut entries = self.lock();
        let mut updated = entries.clone();
        change(&mut updated);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> SecureStorageResult<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|err| SecureStorageError::Store(err.to_string()))?;
        write_owner_only(&self.path, &json)
            .map_err(|err| SecureStorageError::Store(format!("{}: {err}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: String) -> SecureStorageResult<Option<String>> {
        Ok(self.lock().get(&key).cloned())
    }

    fn put(&self, key: String, value: String) -> SecureStorageResult<()> {
        self.mutate(|entries| {
            entries.insert(key, value);
        })
    }

    fn remove(&self, key: String) -> SecureStorageResult<()> {
        if !self.lock().contains_key(&key) {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(&key);
        })
    }

    fn clear(&self) -> SecureStorageResult<()> {
        self.mutate(BTreeMap::clear)
    }

    fn list_keys(&self) -> SecureStorageResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}
