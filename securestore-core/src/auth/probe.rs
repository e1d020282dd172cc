use tracing::{debug, warn};

use crate::error::{KeyVaultError, SecureStorageResult};
use crate::gate::BiometricGate;
use crate::vault::PrivateKeyHandle;

/// Result of a successful probe. Fatal failures are the `Err` case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The private key is usable now.
    Ready,
    /// The authentication window has lapsed.
    AuthenticationRequired,
}

/// Detects whether the private key needs fresh authentication without
/// touching any ciphertext.
#[derive(Debug, Clone)]
pub struct AuthenticationProbe {
    gate: BiometricGate,
}

impl AuthenticationProbe {
    /// Creates a probe serialized by `gate`.
    #[must_use]
    pub const fn new(gate: BiometricGate) -> Self {
        Self { gate }
    }

    /// Initializes a decrypt cipher under the gate and classifies the
    /// result. The gate is released before this returns.
    ///
    /// # Errors
    ///
    /// Any vault failure other than a lapsed authentication window,
    /// translated to [`SecureStorageError`](crate::SecureStorageError).
    pub async fn run(&self, key: &dyn PrivateKeyHandle) -> SecureStorageResult<ProbeOutcome> {
        let _guard = self.gate.acquire().await;
        match key.init_decrypt() {
            Ok(()) => Ok(ProbeOutcome::Ready),
            Err(KeyVaultError::UserNotAuthenticated) => {
                debug!("probe: authentication window lapsed");
                Ok(ProbeOutcome::AuthenticationRequired)
            }
            Err(err) => {
                warn!("probe: private key unusable: {err}");
                Err(err.into())
            }
        }
    }
}
