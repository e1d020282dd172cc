//! Key-value facade over the codec, the gated decryptor and the store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::{AuthenticationPrompt, GatedDecryptor};
use crate::codec::ChunkedCodec;
use crate::config::{KeyPairPolicy, PlatformCapabilities, PromptConfig, SecureStorageConfig};
use crate::error::{SecureStorageError, SecureStorageResult};
use crate::gate::BiometricGate;
use crate::store::{FileStore, KeyValueStore};
use crate::vault::{KeyPairStatus, KeyVault, VaultBackend};

/// Encrypted key-value storage unlocked by biometric or device-credential
/// authentication.
///
/// Writes only need the public key and never prompt. Reads prompt when the
/// private key's authentication window has lapsed.
///
/// ## Kotlin
///
/// ```kotlin
/// val storage = SecureStorage(
///     SecureStorageConfig(appId = context.packageName, /* ... */),
///     PlatformCapabilities(hardwareKeystore = true, authenticatorSelection = true),
///     AndroidKeyVault(),
///     SharedPreferencesStore(context, "cap_sec"),
/// )
/// storage.setData("token", token.toByteArray())
/// val token = storage.getData("token", BiometricPromptAdapter(activity))
/// ```
#[derive(uniffi::Object)]
pub struct SecureStorage {
    alias: String,
    backend: VaultBackend,
    store: Arc<dyn KeyValueStore>,
    codec: ChunkedCodec,
    decryptor: GatedDecryptor,
    status: KeyPairStatus,
}

impl SecureStorage {
    /// Creates a storage with an explicit vault backend and gate.
    ///
    /// Validates `config`, makes sure the keypair exists and logs whether
    /// it is hardware backed.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `config` is invalid
    /// - `VaultUnavailable` if the keypair cannot be created, or if
    ///   `require_hardware_backing` is set and the vault does not report
    ///   hardware backing
    pub fn with_backend(
        config: &SecureStorageConfig,
        capabilities: PlatformCapabilities,
        backend: VaultBackend,
        store: Arc<dyn KeyValueStore>,
        gate: BiometricGate,
    ) -> SecureStorageResult<Self> {
        config.validate()?;
        let codec = ChunkedCodec::new(config.key_size_bits)?;
        let alias = config.key_alias();

        let policy = KeyPairPolicy::from_config(config, capabilities);
        debug!(
            "ensuring {}-bit key {alias} for [{}]",
            policy.key_size_bits,
            policy
                .allowed_authenticators
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        let status = backend.ensure_key_pair(alias.clone(), policy)?;
        match status.hardware_backed {
            Some(true) => info!("key {alias} is hardware backed"),
            Some(false) => info!("key {alias} is not hardware backed"),
            None => info!("could not determine whether key {alias} is hardware backed"),
        }
        if config.require_hardware_backing && status.hardware_backed != Some(true) {
            return Err(SecureStorageError::VaultUnavailable(format!(
                "key {alias} is not hardware backed"
            )));
        }

        let decryptor = GatedDecryptor::new(
            gate,
            codec,
            PromptConfig::from_config(config, capabilities),
            backend.authentication_window(),
        );

        Ok(Self {
            alias,
            backend,
            store,
            codec,
            decryptor,
            status,
        })
    }

    fn with_platform(
        config: &SecureStorageConfig,
        capabilities: PlatformCapabilities,
        hardware_vault: Option<Arc<dyn KeyVault>>,
        store: Arc<dyn KeyValueStore>,
        key_dir: Option<PathBuf>,
    ) -> SecureStorageResult<Self> {
        config.validate()?;
        let backend = VaultBackend::select(capabilities, hardware_vault, key_dir);
        if !backend.is_persistent() {
            return Err(SecureStorageError::VaultUnavailable(
                "no hardware vault and no key directory for the software fallback".to_string(),
            ));
        }
        Self::with_backend(config, capabilities, backend, store, BiometricGate::global())
    }

    fn missing_key(&self, half: &str) -> SecureStorageError {
        SecureStorageError::VaultUnavailable(format!("{half} key {} not found", self.alias))
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl SecureStorage {
    /// Creates a storage backed by `hardware_vault` when the platform has a
    /// hardware keystore.
    ///
    /// There is nowhere to keep a software keypair across restarts here, so
    /// without a usable hardware vault this fails; use
    /// [`with_key_directory`](Self::with_key_directory) or
    /// [`with_file_store`](Self::with_file_store) to allow the software
    /// fallback. All instances share the process-wide gate.
    ///
    /// # Errors
    ///
    /// - `VaultUnavailable` if the software fallback would be needed
    /// - otherwise see [`SecureStorage::with_backend`]
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(
        config: SecureStorageConfig,
        capabilities: PlatformCapabilities,
        hardware_vault: Option<Arc<dyn KeyVault>>,
        store: Arc<dyn KeyValueStore>,
    ) -> SecureStorageResult<Self> {
        Self::with_platform(&config, capabilities, hardware_vault, store, None)
    }

    /// Like [`SecureStorage::new`], falling back to a software keypair kept
    /// as an owner-only PEM file in `key_directory` when no hardware vault
    /// is usable.
    ///
    /// # Errors
    ///
    /// See [`SecureStorage::with_backend`].
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_key_directory(
        config: SecureStorageConfig,
        capabilities: PlatformCapabilities,
        hardware_vault: Option<Arc<dyn KeyVault>>,
        store: Arc<dyn KeyValueStore>,
        key_directory: String,
    ) -> SecureStorageResult<Self> {
        Self::with_platform(
            &config,
            capabilities,
            hardware_vault,
            store,
            Some(PathBuf::from(key_directory)),
        )
    }

    /// Like [`SecureStorage::with_key_directory`], with entries kept in a
    /// JSON file at `path` and the software keypair, if needed, next to it.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the file exists but cannot be read, otherwise see
    /// [`SecureStorage::with_backend`].
    #[uniffi::constructor]
    #[allow(clippy::needless_pass_by_value)]
    pub fn with_file_store(
        config: SecureStorageConfig,
        capabilities: PlatformCapabilities,
        hardware_vault: Option<Arc<dyn KeyVault>>,
        path: String,
    ) -> SecureStorageResult<Self> {
        let store = FileStore::open(path)?;
        let key_dir = store
            .path()
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::with_platform(
            &config,
            capabilities,
            hardware_vault,
            Arc::new(store),
            Some(key_dir),
        )
    }

    /// Encrypts `value` and stores it under `key`. Never prompts.
    ///
    /// # Errors
    ///
    /// - `VaultUnavailable` if the public key is missing
    /// - `Cipher` if encryption fails
    /// - `Store` if the store fails
    #[allow(clippy::needless_pass_by_value)]
    pub fn set_data(&self, key: String, value: Vec<u8>) -> SecureStorageResult<()> {
        let public_key = self
            .backend
            .public_key(self.alias.clone())?
            .ok_or_else(|| self.missing_key("public"))?;
        let text = self.codec.encrypt(public_key.as_ref(), &value)?;
        debug!("set_data: {key} ({} bytes)", value.len());
        self.store.put(key, text)
    }

    /// Reads and decrypts the value under `key`, prompting through `prompt`
    /// if the user needs to authenticate.
    ///
    /// Returns `None` without prompting when nothing is stored under `key`.
    ///
    /// # Errors
    ///
    /// - `VaultUnavailable` if the private key is missing
    /// - `AuthenticationFailed` if the prompt fails, is cancelled or errors
    /// - `Cipher` if the stored value is corrupt or from another keypair
    /// - `Store` if the store fails
    #[allow(clippy::needless_pass_by_value)]
    pub async fn get_data(
        &self,
        key: String,
        prompt: Arc<dyn AuthenticationPrompt>,
    ) -> SecureStorageResult<Option<Vec<u8>>> {
        let Some(text) = self.store.get(key.clone())? else {
            debug!("get_data: no entry for {key}");
            return Ok(None);
        };
        let private_key = self
            .backend
            .private_key(self.alias.clone())?
            .ok_or_else(|| self.missing_key("private"))?;
        self.decryptor
            .decrypt(private_key.as_ref(), Some(&text), prompt.as_ref())
            .await
    }

    /// Lists stored keys.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store fails.
    pub fn keys(&self) -> SecureStorageResult<Vec<String>> {
        self.store.list_keys()
    }

    /// Removes the value under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store fails.
    pub fn remove(&self, key: String) -> SecureStorageResult<()> {
        self.store.remove(key)
    }

    /// Removes every stored value. The keypair is kept.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the store fails.
    pub fn clear(&self) -> SecureStorageResult<()> {
        self.store.clear()
    }

    /// Alias of the keypair protecting this storage.
    #[must_use]
    pub fn alias(&self) -> String {
        self.alias.clone()
    }

    /// Outcome of the keypair check done at construction.
    #[must_use]
    pub const fn key_pair_status(&self) -> KeyPairStatus {
        self.status
    }
}
