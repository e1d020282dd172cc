//! Error types for secure storage and the key vault boundary.

use thiserror::Error;

/// Result type for secure storage operations.
pub type SecureStorageResult<T> = Result<T, SecureStorageError>;

/// Errors surfaced by `SecureStorage` and its components.
///
/// Absence of a stored value is never an error: reads return `None`.
#[derive(Debug, Error, uniffi::Error)]
pub enum SecureStorageError {
    /// The key vault cannot be reached, the keypair is missing or could not
    /// be created, or hardware backing was required but is not available.
    #[error("vault unavailable: {0}")]
    VaultUnavailable(String),

    /// The private key needs fresh user authentication.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The user failed or cancelled authentication, or the prompt errored.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Ciphertext is malformed, corrupted or was produced by another keypair.
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Errors coming from the persistent key-value store.
    #[error("store error: {0}")]
    Store(String),

    /// The configuration is invalid.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for SecureStorageError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

/// Errors reported by a [`KeyVault`](crate::vault::KeyVault) implementation
/// and its key handles.
#[derive(Debug, Clone, Error, uniffi::Error)]
pub enum KeyVaultError {
    /// The key's authentication window has lapsed; the user must
    /// authenticate before the private key can be used.
    #[error("user not authenticated")]
    UserNotAuthenticated,

    /// The key handle is invalid or unusable for the requested operation.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The cipher rejected the input (bad padding, wrong length, wrong key).
    #[error("cipher failure: {0}")]
    Cipher(String),

    /// The vault itself failed (not reachable, key generation failed).
    #[error("vault unavailable: {0}")]
    Unavailable(String),

    /// Unexpected `UniFFI` callback error.
    #[error("unexpected uniffi callback error: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for KeyVaultError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(error.reason)
    }
}

impl From<KeyVaultError> for SecureStorageError {
    fn from(error: KeyVaultError) -> Self {
        match error {
            KeyVaultError::UserNotAuthenticated => Self::AuthenticationRequired,
            KeyVaultError::InvalidKey(reason) | KeyVaultError::Cipher(reason) => {
                Self::Cipher(reason)
            }
            KeyVaultError::Unavailable(reason) => Self::VaultUnavailable(reason),
            KeyVaultError::UnexpectedUniFFICallbackError(reason) => {
                Self::UnexpectedUniFFICallbackError(reason)
            }
        }
    }
}
