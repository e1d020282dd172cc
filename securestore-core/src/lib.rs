//! `securestore-core` keeps small secrets encrypted at rest under a device
//! keypair whose private half only works after the user recently passed a
//! biometric or device-credential check.
//!
//! Values of any length are split into RSA-sized blocks ([`codec`]). Reads
//! go through a probe, an optional prompt and the decrypt, all serialized by
//! one process-wide [`BiometricGate`]. The platform supplies the key vault,
//! the prompt and the key-value store over `UniFFI`; in-process fallbacks are
//! provided for the vault and the store.
#![allow(clippy::module_name_repetitions)]

mod error;
pub use error::*;

mod atomic_file;

pub mod auth;
pub use auth::{AuthenticationPrompt, PromptCompletion};

pub mod codec;
pub mod config;
pub use config::{
    Authenticator, KeyPairPolicy, PlatformCapabilities, PromptConfig, SecureStorageConfig,
};

pub mod gate;
pub use gate::BiometricGate;

pub mod logger;

pub mod store;
pub use store::{FileStore, KeyValueStore, MemoryStore};

mod storage;
pub use storage::SecureStorage;

pub mod vault;
pub use vault::{KeyPairStatus, KeyVault, PrivateKeyHandle, PublicKeyHandle};

#[cfg(test)]
mod tests_utils;

uniffi::setup_scaffolding!("securestore_core");
