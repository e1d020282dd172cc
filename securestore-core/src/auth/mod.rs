//! Authentication-gated decryption.
//!
//! A read first probes the private key under the [`BiometricGate`]. If the
//! authentication window has lapsed, the gate is taken again for the whole
//! lifetime of the prompt, and only a successful prompt leads on to the
//! decrypt.
//!
//! [`BiometricGate`]: crate::gate::BiometricGate

mod orchestrator;
mod probe;
mod prompt;

pub use orchestrator::GatedDecryptor;
pub use probe::{AuthenticationProbe, ProbeOutcome};
pub use prompt::{AuthenticationPrompt, PromptCompletion, PromptOutcome, CANCEL_ERROR_CODES};
