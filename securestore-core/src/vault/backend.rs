use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::software::{AuthenticationWindow, SoftwareKeyVault};
use super::{KeyPairStatus, KeyVault, PrivateKeyHandle, PublicKeyHandle};
use crate::config::{KeyPairPolicy, PlatformCapabilities};
use crate::error::KeyVaultError;

/// Key vault chosen once at initialization.
#[derive(Clone)]
pub enum VaultBackend {
    /// Vault supplied by the host platform.
    Hardware(Arc<dyn KeyVault>),
    /// In-process fallback.
    Software(Arc<SoftwareKeyVault>),
}

impl VaultBackend {
    /// Uses the platform vault when one is supplied and the platform reports
    /// a hardware keystore, otherwise falls back to a [`SoftwareKeyVault`].
    ///
    /// The fallback keeps its keys in `key_dir` when given, and in memory
    /// only otherwise.
    #[must_use]
    pub fn select(
        capabilities: PlatformCapabilities,
        hardware: Option<Arc<dyn KeyVault>>,
        key_dir: Option<PathBuf>,
    ) -> Self {
        match hardware {
            Some(vault) if capabilities.hardware_keystore => return Self::Hardware(vault),
            Some(_) => {
                warn!("platform vault supplied without a hardware keystore, using software vault");
            }
            None => info!("no platform vault supplied, using software vault"),
        }
        let vault = key_dir.map_or_else(SoftwareKeyVault::new, SoftwareKeyVault::persistent);
        Self::Software(Arc::new(vault))
    }

    /// Whether keys survive a restart. Platform vaults are assumed to
    /// persist their keys.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        match self {
            Self::Hardware(_) => true,
            Self::Software(vault) => vault.is_persistent(),
        }
    }

    /// The simulated authentication window, for the software variant.
    #[must_use]
    pub fn authentication_window(&self) -> Option<Arc<AuthenticationWindow>> {
        match self {
            Self::Hardware(_) => None,
            Self::Software(vault) => Some(vault.window()),
        }
    }

    /// Whether the platform vault is in use.
    #[must_use]
    pub const fn is_hardware(&self) -> bool {
        matches!(self, Self::Hardware(_))
    }

    fn vault(&self) -> &dyn KeyVault {
        match self {
            Self::Hardware(vault) => vault.as_ref(),
            Self::Software(vault) => vault.as_ref(),
        }
    }
}

impl std::fmt::Debug for VaultBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hardware(_) => f.write_str("VaultBackend::Hardware"),
            Self::Software(_) => f.write_str("VaultBackend::Software"),
        }
    }
}

impl KeyVault for VaultBackend {
    fn ensure_key_pair(
        &self,
        alias: String,
        policy: KeyPairPolicy,
    ) -> Result<KeyPairStatus, KeyVaultError> {
        self.vault().ensure_key_pair(alias, policy)
    }

    fn public_key(&self, alias: String) -> Result<Option<Arc<dyn PublicKeyHandle>>, KeyVaultError> {
        self.vault().public_key(alias)
    }

    fn private_key(
        &self,
        alias: String,
    ) -> Result<Option<Arc<dyn PrivateKeyHandle>>, KeyVaultError> {
        self.vault().private_key(alias)
    }
}
