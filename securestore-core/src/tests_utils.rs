//! Test doubles for the vault and prompt.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

use crate::auth::{AuthenticationPrompt, PromptCompletion};
use crate::config::PromptConfig;
use crate::error::KeyVaultError;
use crate::vault::{KeyVault, PrivateKeyHandle, PublicKeyHandle, SoftwareKeyVault};

/// Key size used throughout the tests; small enough to generate once quickly.
pub const TEST_KEY_BITS: u32 = 1024;

/// Shared pre-generated RSA key.
pub fn test_private_key() -> RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let bits = usize::try_from(TEST_KEY_BITS).expect("key size");
        RsaPrivateKey::new(&mut OsRng, bits).expect("generate test key")
    })
    .clone()
}

/// Software vault holding the shared test key under `alias`, window closed.
pub fn software_vault(alias: &str) -> Arc<SoftwareKeyVault> {
    let vault = Arc::new(SoftwareKeyVault::new());
    vault.import_key(alias, test_private_key());
    vault
}

fn key_pair(open: bool) -> (Arc<dyn PublicKeyHandle>, Arc<dyn PrivateKeyHandle>) {
    let vault = software_vault("test");
    if open {
        vault.window().open();
    }
    let public = vault.public_key("test".to_string()).expect("lookup").expect("public key");
    let private = vault.private_key("test".to_string()).expect("lookup").expect("private key");
    (public, private)
}

/// Key pair whose private key is usable right away.
pub fn open_key_pair() -> (Arc<dyn PublicKeyHandle>, Arc<dyn PrivateKeyHandle>) {
    key_pair(true)
}

/// Key pair whose private key needs authentication.
pub fn sealed_key_pair() -> (Arc<dyn PublicKeyHandle>, Arc<dyn PrivateKeyHandle>) {
    key_pair(false)
}

/// Private key wrapper counting calls into the vault.
pub struct CountingPrivateKey {
    inner: Arc<dyn PrivateKeyHandle>,
    init_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl CountingPrivateKey {
    pub fn new(inner: Arc<dyn PrivateKeyHandle>) -> Self {
        Self {
            inner,
            init_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }
}

impl PrivateKeyHandle for CountingPrivateKey {
    fn init_decrypt(&self) -> Result<(), KeyVaultError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.init_decrypt()
    }

    fn decrypt_block(&self, block: Vec<u8>) -> Result<Vec<u8>, KeyVaultError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.decrypt_block(block)
    }
}

/// Private key that always fails with the same error.
pub struct FailingPrivateKey {
    error: KeyVaultError,
}

impl FailingPrivateKey {
    pub const fn new(error: KeyVaultError) -> Self {
        Self { error }
    }
}

impl PrivateKeyHandle for FailingPrivateKey {
    fn init_decrypt(&self) -> Result<(), KeyVaultError> {
        Err(self.error.clone())
    }

    fn decrypt_block(&self, _block: Vec<u8>) -> Result<Vec<u8>, KeyVaultError> {
        Err(self.error.clone())
    }
}

/// What [`ScriptedPrompt`] does with the next completion.
pub enum ScriptedOutcome {
    Succeed,
    Fail,
    Error(i32, String),
    Dismiss,
    /// Keep the completion without ever resolving it.
    Hang,
}

/// Prompt that resolves synchronously from a script. An exhausted script
/// dismisses.
pub struct ScriptedPrompt {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    shown: AtomicUsize,
    last_config: Mutex<Option<PromptConfig>>,
    held: Mutex<Option<Arc<PromptCompletion>>>,
}

impl ScriptedPrompt {
    pub fn new(script: impl IntoIterator<Item = ScriptedOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            shown: AtomicUsize::new(0),
            last_config: Mutex::new(None),
            held: Mutex::new(None),
        }
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<PromptConfig> {
        self.last_config.lock().expect("lock").clone()
    }

    pub fn held_completion(&self) -> Option<Arc<PromptCompletion>> {
        self.held.lock().expect("lock").clone()
    }
}

impl AuthenticationPrompt for ScriptedPrompt {
    fn show(&self, config: PromptConfig, completion: Arc<PromptCompletion>) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().expect("lock") = Some(config);
        let next = self
            .script
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(ScriptedOutcome::Dismiss);
        match next {
            ScriptedOutcome::Succeed => completion.succeeded(),
            ScriptedOutcome::Fail => completion.failed(),
            ScriptedOutcome::Error(code, message) => completion.errored(code, message),
            ScriptedOutcome::Dismiss => drop(completion),
            ScriptedOutcome::Hang => *self.held.lock().expect("lock") = Some(completion),
        }
    }
}
