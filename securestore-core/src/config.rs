//! Configuration, key generation policy and prompt settings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{SecureStorageError, SecureStorageResult};

/// Suffix appended to the application id to form the keypair alias.
pub const KEY_ALIAS_SUFFIX: &str = "_cap_sec";

/// Default RSA modulus size.
pub const DEFAULT_KEY_SIZE_BITS: u32 = 2048;

/// Default authentication window, in seconds.
pub const DEFAULT_AUTH_VALIDITY_SECONDS: u32 = 300;

/// Default prompt title.
pub const DEFAULT_PROMPT_TITLE: &str = "Biometric Auth";

const SUBTITLE_BIOMETRIC_OR_CREDENTIAL: &str = "Log in using your biometric or device credential";
const SUBTITLE_BIOMETRIC_ONLY: &str = "Log in using your biometric credential";

/// Kinds of user authentication accepted by the key and the prompt.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    uniffi::Enum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Authenticator {
    /// Class 3 (strong) biometrics.
    BiometricStrong,
    /// Device PIN, pattern or password.
    DeviceCredential,
}

/// Encryption padding requested for the keypair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum EncryptionPadding {
    /// RSA PKCS#1 v1.5 encryption padding.
    RsaPkcs1,
}

impl EncryptionPadding {
    /// Bytes of each cipher block consumed by the padding.
    #[must_use]
    pub const fn overhead(self) -> usize {
        match self {
            Self::RsaPkcs1 => 11,
        }
    }
}

/// Digests the keypair is authorized to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum KeyDigest {
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

/// What the host platform can do, reported once at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct PlatformCapabilities {
    /// A hardware-backed key vault is present.
    pub hardware_keystore: bool,
    /// Keys and prompts can be restricted to an explicit set of
    /// authenticators. Older platforms only support a validity duration
    /// and a device-credential fallback flag.
    pub authenticator_selection: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            hardware_keystore: true,
            authenticator_selection: true,
        }
    }
}

/// Top-level configuration for [`SecureStorage`](crate::SecureStorage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct SecureStorageConfig {
    /// Application identity; the keypair alias is derived from it.
    pub app_id: String,
    /// RSA modulus size in bits.
    #[uniffi(default = 2048)]
    pub key_size_bits: u32,
    /// How long a successful authentication unlocks the private key.
    #[uniffi(default = 300)]
    pub auth_validity_seconds: u32,
    /// Authenticators accepted by the key and offered by the prompt.
    pub allowed_authenticators: Vec<Authenticator>,
    /// Refuse to operate unless the vault reports hardware backing.
    #[uniffi(default = false)]
    pub require_hardware_backing: bool,
    /// Prompt title.
    #[uniffi(default = "Biometric Auth")]
    pub prompt_title: String,
    /// Prompt subtitle; derived from platform capabilities when unset.
    #[uniffi(default = None)]
    pub prompt_subtitle: Option<String>,
}

impl Default for SecureStorageConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            key_size_bits: DEFAULT_KEY_SIZE_BITS,
            auth_validity_seconds: DEFAULT_AUTH_VALIDITY_SECONDS,
            allowed_authenticators: vec![
                Authenticator::BiometricStrong,
                Authenticator::DeviceCredential,
            ],
            require_hardware_backing: false,
            prompt_title: DEFAULT_PROMPT_TITLE.to_string(),
            prompt_subtitle: None,
        }
    }
}

impl SecureStorageConfig {
    /// Creates a default configuration for `app_id`.
    #[must_use]
    pub fn for_app(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Self::default()
        }
    }

    /// Deserializes a configuration from JSON. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the JSON is malformed or the resulting
    /// configuration fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> SecureStorageResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| SecureStorageError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for an empty app id, a key size that is not a
    /// positive multiple of 8, or an empty authenticator list.
    pub fn validate(&self) -> SecureStorageResult<()> {
        if self.app_id.trim().is_empty() {
            return Err(SecureStorageError::InvalidConfig(
                "app_id must not be empty".to_string(),
            ));
        }
        if self.key_size_bits == 0 || self.key_size_bits % 8 != 0 {
            return Err(SecureStorageError::InvalidConfig(format!(
                "key_size_bits must be a positive multiple of 8, got {}",
                self.key_size_bits
            )));
        }
        if self.allowed_authenticators.is_empty() {
            return Err(SecureStorageError::InvalidConfig(
                "allowed_authenticators must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Alias of the keypair owned by this application.
    #[must_use]
    pub fn key_alias(&self) -> String {
        format!("{}{KEY_ALIAS_SUFFIX}", self.app_id)
    }
}

/// Key generation policy handed to the vault. Enforcement is the vault's
/// responsibility.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct KeyPairPolicy {
    /// RSA modulus size in bits.
    pub key_size_bits: u32,
    /// Rolling authentication window in seconds.
    pub auth_validity_seconds: u32,
    /// Accepted authenticators. Empty means the platform only supports a
    /// validity duration without authenticator selection.
    pub allowed_authenticators: Vec<Authenticator>,
    /// Key is usable only while the device is unlocked.
    pub unlocked_device_required: bool,
    /// Key is invalidated when a new biometric is enrolled.
    pub invalidated_by_biometric_enrollment: bool,
    /// Each use requires explicit user confirmation.
    pub user_confirmation_required: bool,
    /// Encryption padding.
    pub padding: EncryptionPadding,
    /// Authorized digests.
    pub digests: Vec<KeyDigest>,
}

impl KeyPairPolicy {
    /// Builds the policy for `config` on a platform with `capabilities`.
    #[must_use]
    pub fn from_config(config: &SecureStorageConfig, capabilities: PlatformCapabilities) -> Self {
        let allowed_authenticators = if capabilities.authenticator_selection {
            config.allowed_authenticators.clone()
        } else {
            Vec::new()
        };
        Self {
            key_size_bits: config.key_size_bits,
            auth_validity_seconds: config.auth_validity_seconds,
            allowed_authenticators,
            unlocked_device_required: true,
            invalidated_by_biometric_enrollment: false,
            user_confirmation_required: false,
            padding: EncryptionPadding::RsaPkcs1,
            digests: vec![KeyDigest::Sha256, KeyDigest::Sha512],
        }
    }
}

/// Settings for the authentication prompt.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct PromptConfig {
    /// Prompt title.
    pub title: String,
    /// Prompt subtitle.
    pub subtitle: String,
    /// Authenticators the prompt offers. Empty on platforms without
    /// authenticator selection.
    pub allowed_authenticators: Vec<Authenticator>,
    /// Legacy flag allowing the device credential as a fallback.
    pub device_credential_allowed: bool,
}

impl PromptConfig {
    /// Builds the prompt settings for `config` on a platform with
    /// `capabilities`.
    #[must_use]
    pub fn from_config(config: &SecureStorageConfig, capabilities: PlatformCapabilities) -> Self {
        if capabilities.authenticator_selection {
            Self {
                title: config.prompt_title.clone(),
                subtitle: config
                    .prompt_subtitle
                    .clone()
                    .unwrap_or_else(|| SUBTITLE_BIOMETRIC_OR_CREDENTIAL.to_string()),
                allowed_authenticators: config.allowed_authenticators.clone(),
                device_credential_allowed: config
                    .allowed_authenticators
                    .contains(&Authenticator::DeviceCredential),
            }
        } else {
            Self {
                title: config.prompt_title.clone(),
                subtitle: config
                    .prompt_subtitle
                    .clone()
                    .unwrap_or_else(|| SUBTITLE_BIOMETRIC_ONLY.to_string()),
                allowed_authenticators: Vec::new(),
                device_credential_allowed: true,
            }
        }
    }
}
