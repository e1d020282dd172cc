//! Process-wide serialization of probe and prompt sequences.
//!
//! Every authentication-sensitive step holds a [`GateGuard`]; dropping the
//! guard releases the gate, so it is released on every exit path including
//! errors and cancelled futures.

use std::sync::{Arc, OnceLock};

use tokio::sync::{Mutex, OwnedMutexGuard};

static GLOBAL_GATE: OnceLock<BiometricGate> = OnceLock::new();

/// Mutual-exclusion lock with no data, handed out as owned guards.
///
/// Waiters are served in arrival order. Clones share the same lock.
#[derive(Debug, Clone, Default)]
pub struct BiometricGate {
    lock: Arc<Mutex<()>>,
}

/// Proof that the holder owns the gate. Releases it on drop.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard {
    _guard: OwnedMutexGuard<()>,
}

impl BiometricGate {
    /// The gate shared by every storage instance in the process.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_GATE.get_or_init(Self::new).clone()
    }

    /// Creates an independent gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the gate is free and takes it.
    pub async fn acquire(&self) -> GateGuard {
        GateGuard {
            _guard: Arc::clone(&self.lock).lock_owned().await,
        }
    }

    /// Takes the gate if it is free right now.
    #[must_use]
    pub fn try_acquire(&self) -> Option<GateGuard> {
        Arc::clone(&self.lock)
            .try_lock_owned()
            .ok()
            .map(|guard| GateGuard { _guard: guard })
    }

    /// Whether some guard currently holds the gate.
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
