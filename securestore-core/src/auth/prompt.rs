use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::PromptConfig;
use crate::error::{SecureStorageError, SecureStorageResult};
use crate::gate::GateGuard;

/// Platform error codes that mean the user backed out of the prompt:
/// user cancel, negative button, cancelled by the system.
pub const CANCEL_ERROR_CODES: [i32; 3] = [10, 13, 5];

const FAILED_MESSAGE: &str = "failed to authenticate using biometric auth";
const DISMISSED_MESSAGE: &str = "authentication prompt dismissed without a result";

/// Biometric or device-credential prompt owned by the host UI.
#[uniffi::export(with_foreign)]
pub trait AuthenticationPrompt: Send + Sync {
    /// Shows the prompt described by `config`.
    ///
    /// Implementations must hop to the UI thread and return without waiting
    /// for the user. Exactly one terminal callback of `completion` should
    /// fire once the user is done; dropping `completion` counts as a
    /// dismissal.
    fn show(&self, config: PromptConfig, completion: Arc<PromptCompletion>);
}

/// How a prompt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user authenticated.
    Succeeded,
    /// The user was not recognized.
    Failed,
    /// The prompt reported an error, including user cancellation.
    Errored {
        /// Platform error code.
        code: i32,
        /// Platform error message.
        message: String,
    },
    /// The prompt went away without calling back.
    Dismissed,
}

impl PromptOutcome {
    /// Whether the outcome is a user or system cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Errored { code, .. } if CANCEL_ERROR_CODES.contains(code))
    }

    /// Maps every outcome except success to `AuthenticationFailed`.
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` unless the outcome is
    /// [`Succeeded`](Self::Succeeded).
    pub fn into_result(self) -> SecureStorageResult<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed => Err(SecureStorageError::AuthenticationFailed(
                FAILED_MESSAGE.to_string(),
            )),
            Self::Errored { message, .. } => Err(SecureStorageError::AuthenticationFailed(message)),
            Self::Dismissed => Err(SecureStorageError::AuthenticationFailed(
                DISMISSED_MESSAGE.to_string(),
            )),
        }
    }
}

struct PendingPrompt {
    gate: GateGuard,
    sender: oneshot::Sender<PromptOutcome>,
}

/// Single-use callback handed to [`AuthenticationPrompt::show`].
///
/// Owns the gate for as long as the prompt is on screen. The first terminal
/// callback releases the gate and wakes the waiting request; any later
/// callback is ignored.
#[derive(uniffi::Object)]
pub struct PromptCompletion {
    pending: Mutex<Option<PendingPrompt>>,
}

impl PromptCompletion {
    pub(crate) fn new(gate: GateGuard) -> (Arc<Self>, oneshot::Receiver<PromptOutcome>) {
        let (sender, receiver) = oneshot::channel();
        let completion = Arc::new(Self {
            pending: Mutex::new(Some(PendingPrompt { gate, sender })),
        });
        (completion, receiver)
    }

    /// Releases the gate without resolving. Used when the waiting request
    /// went away.
    pub(crate) fn abandon(&self) {
        if let Some(pending) = self.lock().take() {
            drop(pending);
            debug!("request dropped while authenticating, gate released");
        }
    }

    fn resolve(&self, outcome: PromptOutcome) {
        let Some(PendingPrompt { gate, sender }) = self.lock().take() else {
            warn!("ignoring prompt callback {outcome:?}: already resolved");
            return;
        };
        drop(gate);
        if sender.send(outcome).is_err() {
            debug!("prompt resolved after the request stopped waiting");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingPrompt>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[uniffi::export]
impl PromptCompletion {
    /// The user authenticated.
    pub fn succeeded(&self) {
        info!("authentication succeeded");
        self.resolve(PromptOutcome::Succeeded);
    }

    /// The user was not recognized. Treated as terminal.
    pub fn failed(&self) {
        warn!("authentication failed");
        self.resolve(PromptOutcome::Failed);
    }

    /// The prompt reported an error or was cancelled.
    pub fn errored(&self, code: i32, message: String) {
        let outcome = PromptOutcome::Errored { code, message };
        if outcome.is_cancellation() {
            info!("authentication cancelled (code {code})");
        } else {
            warn!("authentication error (code {code})");
        }
        self.resolve(outcome);
    }

    /// Whether a terminal callback already fired.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.lock().is_none()
    }
}

impl Drop for PromptCompletion {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(PendingPrompt { gate, sender }) = pending {
            drop(gate);
            if sender.send(PromptOutcome::Dismissed).is_ok() {
                warn!("authentication prompt dropped without a result");
            }
        }
    }
}
