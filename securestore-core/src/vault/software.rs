//! In-process RSA key vault.
//!
//! Used when the platform has no hardware-backed keystore, and by tests and
//! developer tooling. Keys live in process memory and, for a persistent
//! vault, as owner-only PKCS#8 PEM files so they survive restarts. The
//! authentication window is simulated by [`AuthenticationWindow`] and opened
//! by the gated decrypt flow after a successful prompt.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::{KeyPairStatus, KeyVault, PrivateKeyHandle, PublicKeyHandle};
use crate::atomic_file::write_owner_only;
use crate::config::{KeyPairPolicy, DEFAULT_AUTH_VALIDITY_SECONDS};
use crate::error::KeyVaultError;

/// Time-bounded "user recently authenticated" state shared by every key of
/// a vault.
#[derive(Debug)]
pub struct AuthenticationWindow {
    state: Mutex<WindowState>,
}

#[derive(Debug)]
struct WindowState {
    validity: Duration,
    authenticated_until: Option<Instant>,
}

impl AuthenticationWindow {
    /// Creates a closed window that stays open for `validity` once opened.
    #[must_use]
    pub const fn new(validity: Duration) -> Self {
        Self {
            state: Mutex::new(WindowState {
                validity,
                authenticated_until: None,
            }),
        }
    }

    /// Records a successful authentication.
    pub fn open(&self) {
        let mut state = self.lock();
        state.authenticated_until = Instant::now().checked_add(state.validity);
    }

    /// Closes the window immediately.
    pub fn revoke(&self) {
        self.lock().authenticated_until = None;
    }

    /// Whether the private key is currently usable without a prompt.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock()
            .authenticated_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// How long the window stays open after [`open`](Self::open).
    #[must_use]
    pub fn validity(&self) -> Duration {
        self.lock().validity
    }

    fn set_validity(&self, validity: Duration) {
        self.lock().validity = validity;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AuthenticationWindow {
    fn default() -> Self {
        Self::new(Duration::from_secs(u64::from(DEFAULT_AUTH_VALIDITY_SECONDS)))
    }
}

/// RSA key vault held in process memory, optionally backed by key files.
#[derive(Debug, Default)]
pub struct SoftwareKeyVault {
    keys: Mutex<HashMap<String, RsaPrivateKey>>,
    window: Arc<AuthenticationWindow>,
    key_dir: Option<PathBuf>,
}

impl SoftwareKeyVault {
    /// Creates an empty in-memory vault with a closed authentication window.
    /// Its keys are lost when it is dropped.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a vault that keeps the key for each alias in
    /// `<dir>/<alias>.pem`. Existing files are loaded on first use; new keys
    /// are written before they are handed out.
    #[must_use]
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            key_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Whether keys outlive this vault.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.key_dir.is_some()
    }

    /// Key file for `alias`, for a persistent vault.
    #[must_use]
    pub fn key_path(&self, alias: &str) -> Option<PathBuf> {
        self.key_dir
            .as_ref()
            .map(|dir| dir.join(format!("{alias}.pem")))
    }

    /// Loads the key file for `alias` unless the key is already in memory.
    /// Returns whether the vault now holds a key for `alias`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if the key file exists but cannot be read
    /// - `InvalidKey` if it does not hold a PKCS#8 RSA key
    pub fn load_persisted(&self, alias: &str) -> Result<bool, KeyVaultError> {
        let mut keys = self.lock_keys();
        if keys.contains_key(alias) {
            return Ok(true);
        }
        let Some(key) = self.read_key_file(alias)? else {
            return Ok(false);
        };
        keys.insert(alias.to_string(), key);
        drop(keys);
        Ok(true)
    }

    /// The window gating every private key of this vault.
    #[must_use]
    pub fn window(&self) -> Arc<AuthenticationWindow> {
        Arc::clone(&self.window)
    }

    /// Installs an existing private key under `alias`, replacing any
    /// previous key. The key is kept in memory only.
    pub fn import_key(&self, alias: &str, key: RsaPrivateKey) {
        self.lock_keys().insert(alias.to_string(), key);
    }

    /// Installs a PKCS#8 PEM encoded private key under `alias`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if the PEM cannot be parsed.
    pub fn import_pkcs8_pem(&self, alias: &str, pem: &str) -> Result<(), KeyVaultError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|err| KeyVaultError::InvalidKey(err.to_string()))?;
        self.import_key(alias, key);
        Ok(())
    }

    /// Exports the private key under `alias` as PKCS#8 PEM, if present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if encoding fails.
    pub fn export_pkcs8_pem(&self, alias: &str) -> Result<Option<Zeroizing<String>>, KeyVaultError> {
        self.lock_keys()
            .get(alias)
            .map(|key| {
                key.to_pkcs8_pem(LineEnding::LF)
                    .map_err(|err| KeyVaultError::InvalidKey(err.to_string()))
            })
            .transpose()
    }

    /// Modulus size in bits of the key under `alias`, if present.
    #[must_use]
    pub fn key_size_bits(&self, alias: &str) -> Option<u32> {
        self.lock_keys()
            .get(alias)
            .and_then(|key| u32::try_from(key.size() * 8).ok())
    }

    fn read_key_file(&self, alias: &str) -> Result<Option<RsaPrivateKey>, KeyVaultError> {
        let Some(path) = self.key_path(alias) else {
            return Ok(None);
        };
        let pem = match fs::read_to_string(&path) {
            Ok(pem) => Zeroizing::new(pem),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(KeyVaultError::Unavailable(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };
        let key = RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|err| {
            KeyVaultError::InvalidKey(format!("{}: {err}", path.display()))
        })?;
        info!("loaded software key for {alias} from {}", path.display());
        Ok(Some(key))
    }

    fn write_key_file(&self, alias: &str, key: &RsaPrivateKey) -> Result<(), KeyVaultError> {
        let Some(path) = self.key_path(alias) else {
            return Ok(());
        };
        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|err| KeyVaultError::InvalidKey(err.to_string()))?;
        write_owner_only(&path, pem.as_bytes()).map_err(|err| {
            KeyVaultError::Unavailable(format!("failed to write {}: {err}", path.display()))
        })?;
        debug!("saved software key for {alias} to {}", path.display());
        Ok(())
    }

    fn lock_keys(&self) -> std::sync::MutexGuard<'_, HashMap<String, RsaPrivateKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyVault for SoftwareKeyVault {
    fn ensure_key_pair(
        &self,
        alias: String,
        policy: KeyPairPolicy,
    ) -> Result<KeyPairStatus, KeyVaultError> {
        self.window
            .set_validity(Duration::from_secs(u64::from(policy.auth_validity_seconds)));

        let existing = KeyPairStatus {
            created: false,
            hardware_backed: Some(false),
        };
        let mut keys = self.lock_keys();
        if keys.contains_key(&alias) {
            info!("init: key already present for {alias}");
            return Ok(existing);
        }
        if let Some(key) = self.read_key_file(&alias)? {
            keys.insert(alias, key);
            drop(keys);
            return Ok(existing);
        }

        let bits = usize::try_from(policy.key_size_bits)
            .map_err(|err| KeyVaultError::Unavailable(err.to_string()))?;
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|err| KeyVaultError::Unavailable(format!("key generation failed: {err}")))?;
        self.write_key_file(&alias, &key)?;
        keys.insert(alias.clone(), key);
        drop(keys);
        info!("generated {bits}-bit software keypair for {alias}");

        Ok(KeyPairStatus {
            created: true,
            hardware_backed: Some(false),
        })
    }

    fn public_key(&self, alias: String) -> Result<Option<Arc<dyn PublicKeyHandle>>, KeyVaultError> {
        Ok(self.lock_keys().get(&alias).map(|key| {
            Arc::new(SoftwarePublicKey {
                key: key.to_public_key(),
            }) as Arc<dyn PublicKeyHandle>
        }))
    }

    fn private_key(
        &self,
        alias: String,
    ) -> Result<Option<Arc<dyn PrivateKeyHandle>>, KeyVaultError> {
        Ok(self.lock_keys().get(&alias).map(|key| {
            Arc::new(SoftwarePrivateKey {
                key: key.clone(),
                window: Arc::clone(&self.window),
            }) as Arc<dyn PrivateKeyHandle>
        }))
    }
}

struct SoftwarePublicKey {
    key: RsaPublicKey,
}

impl PublicKeyHandle for SoftwarePublicKey {
    fn encrypt_block(&self, block: Vec<u8>) -> Result<Vec<u8>, KeyVaultError> {
        self.key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &block)
            .map_err(|err| KeyVaultError::Cipher(err.to_string()))
    }
}

struct SoftwarePrivateKey {
    key: RsaPrivateKey,
    window: Arc<AuthenticationWindow>,
}

impl PrivateKeyHandle for SoftwarePrivateKey {
    fn init_decrypt(&self) -> Result<(), KeyVaultError> {
        if self.window.is_open() {
            Ok(())
        } else {
            debug!("software key used outside the authentication window");
            Err(KeyVaultError::UserNotAuthenticated)
        }
    }

    fn decrypt_block(&self, block: Vec<u8>) -> Result<Vec<u8>, KeyVaultError> {
        self.init_decrypt()?;
        self.key
            .decrypt(Pkcs1v15Encrypt, &block)
            .map_err(|err| KeyVaultError::Cipher(err.to_string()))
    }
}
