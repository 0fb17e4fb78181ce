//! Routing of acknowledgments to the senders waiting for them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// Maps outstanding message ids to the task waiting for their ACK.
///
/// ACKs for unknown ids (late duplicates, or ids whose sender already gave
/// up) are dropped.
#[derive(Default)]
pub struct AckRegistry {
    waiters: Mutex<HashMap<u32, oneshot::Sender<()>>>,
}

impl AckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u32, oneshot::Sender<()>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start waiting for the ACK of `id`.
    pub fn register(&self, id: u32) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.lock().insert(id, tx).is_some() {
            tracing::warn!(id, "message id reused while still awaiting ACK");
        }
        rx
    }

    /// Deliver an ACK. Returns `false` if nobody was waiting for it.
    pub fn resolve(&self, id: u32) -> bool {
        match self.lock().remove(&id) {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Stop waiting for `id`.
    pub fn cancel(&self, id: u32) {
        self.lock().remove(&id);
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}
