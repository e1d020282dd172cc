//! Key vault binding.
//!
//! The vault owns the asymmetric keypair; this crate only asks it to create
//! the pair once and hands blocks to the key handles. Platform
//! implementations are provided by the host application:
//!
//! - Android: `AndroidKeyStore` RSA keypair with `KeyGenParameterSpec`
//!   mirroring [`KeyPairPolicy`]
//! - iOS: Secure Enclave wrapped key in the Keychain
//!
//! [`SoftwareKeyVault`] is the in-process fallback.

mod backend;
pub mod software;

pub use backend::VaultBackend;
pub use software::{AuthenticationWindow, SoftwareKeyVault};

use std::sync::Arc;

use crate::config::KeyPairPolicy;
use crate::error::KeyVaultError;

/// Outcome of [`KeyVault::ensure_key_pair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct KeyPairStatus {
    /// A new keypair was generated by this call.
    pub created: bool,
    /// Whether the private key lives inside secure hardware. `None` when the
    /// vault could not determine it. Diagnostic only.
    pub hardware_backed: Option<bool>,
}

/// Platform key vault holding the asymmetric keypair.
#[uniffi::export(with_foreign)]
pub trait KeyVault: Send + Sync {
    /// Creates a keypair under `alias` following `policy`, unless a valid
    /// keypair and certificate already exist. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the vault cannot be reached or generation
    /// fails.
    fn ensure_key_pair(
        &self,
        alias: String,
        policy: KeyPairPolicy,
    ) -> Result<KeyPairStatus, KeyVaultError>;

    /// Returns the public key for `alias`, if present.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the vault cannot be reached.
    fn public_key(&self, alias: String) -> Result<Option<Arc<dyn PublicKeyHandle>>, KeyVaultError>;

    /// Returns the private key for `alias`, if present.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the vault cannot be reached.
    fn private_key(
        &self,
        alias: String,
    ) -> Result<Option<Arc<dyn PrivateKeyHandle>>, KeyVaultError>;
}

/// Public half of the keypair. Always usable without authentication.
#[uniffi::export(with_foreign)]
pub trait PublicKeyHandle: Send + Sync {
    /// Encrypts one plaintext block with randomized padding. The output is
    /// exactly one cipher block.
    ///
    /// # Errors
    ///
    /// Returns `Cipher` if the block is too long or the cipher fails.
    fn encrypt_block(&self, block: Vec<u8>) -> Result<Vec<u8>, KeyVaultError>;
}

/// Private half of the keypair, gated by the authentication window.
#[uniffi::export(with_foreign)]
pub trait PrivateKeyHandle: Send + Sync {
    /// Initializes a cipher in decrypt mode without processing any data.
    ///
    /// # Errors
    ///
    /// Returns `UserNotAuthenticated` when the authentication window has
    /// lapsed; any other error means the key is unusable.
    fn init_decrypt(&self) -> Result<(), KeyVaultError>;

    /// Decrypts one cipher block.
    ///
    /// # Errors
    ///
    /// Returns `UserNotAuthenticated` when the authentication window has
    /// lapsed and `Cipher` when the block fails padding verification.
    fn decrypt_block(&self, block: Vec<u8>) -> Result<Vec<u8>, KeyVaultError>;
}
