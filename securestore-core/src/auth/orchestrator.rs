use std::sync::{Arc, Weak};

use tokio::sync::oneshot;
use tracing::{debug, info};

use super::probe::{AuthenticationProbe, ProbeOutcome};
use super::prompt::{AuthenticationPrompt, PromptCompletion, PromptOutcome};
use crate::codec::ChunkedCodec;
use crate::config::PromptConfig;
use crate::error::SecureStorageResult;
use crate::gate::BiometricGate;
use crate::vault::{AuthenticationWindow, PrivateKeyHandle};

/// Steps of one gated decrypt request.
///
/// ```text
/// Probe ──ready──────────────────────────────▶ Decrypt
///   └──required──▶ AuthenticationRequired ──▶ Authenticating ──success──┘
/// ```
enum DecryptState {
    Probe,
    AuthenticationRequired,
    Authenticating {
        pending: AbandonOnDrop,
        outcome: oneshot::Receiver<PromptOutcome>,
    },
    Decrypt,
}

/// Releases the gate held by an unresolved prompt if the request is dropped
/// while waiting on it. Only the prompt holds a strong handle, so the prompt
/// dropping it still resolves as a dismissal.
struct AbandonOnDrop(Weak<PromptCompletion>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if let Some(completion) = self.0.upgrade() {
            completion.abandon();
        }
    }
}

/// Runs probe, optional prompt and decrypt for a single stored value.
#[derive(Debug, Clone)]
pub struct GatedDecryptor {
    gate: BiometricGate,
    probe: AuthenticationProbe,
    codec: ChunkedCodec,
    prompt_config: PromptConfig,
    window: Option<Arc<AuthenticationWindow>>,
}

impl GatedDecryptor {
    /// Creates a decryptor serialized by `gate`.
    ///
    /// `window` is opened after every successful prompt; pass the software
    /// vault's window, or `None` when the platform vault tracks
    /// authentication itself.
    #[must_use]
    pub fn new(
        gate: BiometricGate,
        codec: ChunkedCodec,
        prompt_config: PromptConfig,
        window: Option<Arc<AuthenticationWindow>>,
    ) -> Self {
        Self {
            probe: AuthenticationProbe::new(gate.clone()),
            gate,
            codec,
            prompt_config,
            window,
        }
    }

    /// Decrypts `text`, prompting the user first if the private key's
    /// authentication window has lapsed.
    ///
    /// Nothing is probed or prompted for `None`. A failed or cancelled
    /// prompt ends the request; callers retry by calling again.
    ///
    /// # Errors
    ///
    /// - `AuthenticationFailed` if the prompt fails, errors or is dismissed
    /// - `AuthenticationRequired` if the window lapses again between the
    ///   prompt and the decrypt
    /// - any error of [`AuthenticationProbe::run`] or
    ///   [`ChunkedCodec::decrypt`]
    pub async fn decrypt(
        &self,
        key: &dyn PrivateKeyHandle,
        text: Option<&str>,
        prompt: &dyn AuthenticationPrompt,
    ) -> SecureStorageResult<Option<Vec<u8>>> {
        if text.is_none() {
            return Ok(None);
        }

        let mut state = DecryptState::Probe;
        loop {
            state = match state {
                DecryptState::Probe => match self.probe.run(key).await? {
                    ProbeOutcome::Ready => DecryptState::Decrypt,
                    ProbeOutcome::AuthenticationRequired => DecryptState::AuthenticationRequired,
                },
                DecryptState::AuthenticationRequired => {
                    let guard = self.gate.acquire().await;
                    let (completion, outcome) = PromptCompletion::new(guard);
                    let pending = AbandonOnDrop(Arc::downgrade(&completion));
                    info!("authentication required, showing prompt");
                    prompt.show(self.prompt_config.clone(), completion);
                    DecryptState::Authenticating { pending, outcome }
                }
                DecryptState::Authenticating { pending, outcome } => {
                    let outcome = outcome.await.unwrap_or(PromptOutcome::Dismissed);
                    drop(pending);
                    outcome.into_result()?;
                    if let Some(window) = &self.window {
                        window.open();
                    }
                    DecryptState::Decrypt
                }
                DecryptState::Decrypt => {
                    debug!("decrypting stored value");
                    return self.codec.decrypt(key, text);
                }
            };
        }
    }
}
