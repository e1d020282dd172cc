//! Persistent string-keyed store for encrypted entries.
//!
//! Values are base64 ciphertext; the store never sees plaintext.

mod file;
mod memory;

pub use file::{FileStore, DEFAULT_STORE_FILE_NAME};
pub use memory::MemoryStore;

use crate::error::SecureStorageResult;

/// Flat key-value store provided by the host (for example Android
/// `SharedPreferences` or the iOS Keychain).
#[uniffi::export(with_foreign)]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the backing storage fails.
    fn get(&self, key: String) -> SecureStorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the backing storage fails.
    fn put(&self, key: String, value: String) -> SecureStorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the backing storage fails.
    fn remove(&self, key: String) -> SecureStorageResult<()>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the backing storage fails.
    fn clear(&self) -> SecureStorageResult<()>;

    /// Lists stored keys.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the backing storage fails.
    fn list_keys(&self) -> SecureStorageResult<Vec<String>>;
}
