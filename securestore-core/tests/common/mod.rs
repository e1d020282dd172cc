#![allow(dead_code)]

//! Common test utilities shared across integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use securestore_core::vault::{AuthenticationWindow, SoftwareKeyVault, VaultBackend};
use securestore_core::{
    AuthenticationPrompt, BiometricGate, KeyPairPolicy, KeyPairStatus, KeyValueStore, KeyVault,
    KeyVaultError, PlatformCapabilities, PrivateKeyHandle, PromptCompletion, PromptConfig,
    PublicKeyHandle, SecureStorage, SecureStorageConfig,
};
use tracing_subscriber::EnvFilter;

pub const TEST_KEY_BITS: u32 = 1024;
pub const APP_ID: &str = "com.example.wallet";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_key() -> RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS as usize).expect("generate test key"))
        .clone()
}

pub fn test_config() -> SecureStorageConfig {
    let mut config = SecureStorageConfig::for_app(APP_ID);
    config.key_size_bits = TEST_KEY_BITS;
    config
}

/// Software vault preloaded with the shared key under the test alias.
pub fn software_vault() -> Arc<SoftwareKeyVault> {
    let vault = Arc::new(SoftwareKeyVault::new());
    vault.import_key(&test_config().key_alias(), test_key());
    vault
}

pub fn software_storage(
    vault: &Arc<SoftwareKeyVault>,
    store: Arc<dyn KeyValueStore>,
    gate: &BiometricGate,
) -> SecureStorage {
    SecureStorage::with_backend(
        &test_config(),
        PlatformCapabilities::default(),
        VaultBackend::Software(Arc::clone(vault)),
        store,
        gate.clone(),
    )
    .expect("storage")
}

/// Platform vault double: reports hardware backing and leaves the
/// authentication window to the platform prompt.
pub struct HardwareVault {
    inner: Arc<SoftwareKeyVault>,
}

impl Default for HardwareVault {
    fn default() -> Self {
        Self {
            inner: software_vault(),
        }
    }
}

impl HardwareVault {
    pub fn window(&self) -> Arc<AuthenticationWindow> {
        self.inner.window()
    }
}

impl KeyVault for HardwareVault {
    fn ensure_key_pair(
        &self,
        alias: String,
        policy: KeyPairPolicy,
    ) -> Result<KeyPairStatus, KeyVaultError> {
        let status = self.inner.ensure_key_pair(alias, policy)?;
        Ok(KeyPairStatus {
            hardware_backed: Some(true),
            ..status
        })
    }

    fn public_key(&self, alias: String) -> Result<Option<Arc<dyn PublicKeyHandle>>, KeyVaultError> {
        self.inner.public_key(alias)
    }

    fn private_key(
        &self,
        alias: String,
    ) -> Result<Option<Arc<dyn PrivateKeyHandle>>, KeyVaultError> {
        self.inner.private_key(alias)
    }
}

/// What the simulated user does with the next prompt.
#[derive(Debug, Clone)]
pub enum UserAction {
    Approve,
    Reject,
    Cancel,
    /// Leave the prompt on screen forever.
    Ignore,
}

/// Prompt that answers from a background task after a short delay, the way
/// a UI thread would. Approves once the script runs out.
pub struct AsyncPrompt {
    script: Mutex<VecDeque<UserAction>>,
    delay: Duration,
    platform_window: Option<Arc<AuthenticationWindow>>,
    shown: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    configs: Mutex<Vec<PromptConfig>>,
    ignored: Mutex<Vec<Arc<PromptCompletion>>>,
}

impl AsyncPrompt {
    pub fn new(script: impl IntoIterator<Item = UserAction>) -> Arc<Self> {
        Arc::new(Self::build(script, None))
    }

    /// Prompt that opens `window` on approval, as the platform does for
    /// hardware keys.
    pub fn for_platform(
        script: impl IntoIterator<Item = UserAction>,
        window: Arc<AuthenticationWindow>,
    ) -> Arc<Self> {
        Arc::new(Self::build(script, Some(window)))
    }

    fn build(
        script: impl IntoIterator<Item = UserAction>,
        platform_window: Option<Arc<AuthenticationWindow>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            delay: Duration::from_millis(10),
            platform_window,
            shown: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            configs: Mutex::new(Vec::new()),
            ignored: Mutex::new(Vec::new()),
        }
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<PromptConfig> {
        self.configs.lock().expect("lock").last().cloned()
    }

    pub fn ignored(&self) -> Vec<Arc<PromptCompletion>> {
        self.ignored.lock().expect("lock").clone()
    }
}

impl AuthenticationPrompt for AsyncPrompt {
    fn show(&self, config: PromptConfig, completion: Arc<PromptCompletion>) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().expect("lock").push(config);

        let action = self
            .script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(UserAction::Approve);
        if matches!(action, UserAction::Ignore) {
            self.ignored.lock().expect("lock").push(completion);
            return;
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let active = Arc::clone(&self.active);
        let window = self.platform_window.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            active.fetch_sub(1, Ordering::SeqCst);
            match action {
                UserAction::Approve => {
                    if let Some(window) = window {
                        window.open();
                    }
                    completion.succeeded();
                }
                UserAction::Reject => completion.failed(),
                UserAction::Cancel => {
                    completion.errored(10, "Authentication canceled by user".to_string());
                }
                UserAction::Ignore => {}
            }
        });
    }
}
