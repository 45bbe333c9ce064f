use dashmap::DashMap;
use std::sync::Arc;
use tether_core::UserId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-identity async locks serializing connect, disconnect, join and leave
/// of the same user. Different identities never contend.
#[derive(Default)]
pub struct SessionGates {
    gates: DashMap<UserId, Arc<Mutex<()>>>,
}

impl SessionGates {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enter(&self, identity: &UserId) -> SessionGuard<'_> {
        let gate = self.gates.entry(identity.clone()).or_default().clone();
        let guard = gate.lock_owned().await;

        SessionGuard {
            gates: self,
            identity: identity.clone(),
            guard: Some(guard),
        }
    }

    /// Number of identities with a live gate.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

/// Held for the registry phase of one operation.
pub struct SessionGuard<'a> {
    gates: &'a SessionGates,
    identity: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone, so a count of one means nobody is queued.
        self.gates
            .gates
            .remove_if(&self.identity, |_, gate| Arc::strong_count(gate) == 1);
    }
}
