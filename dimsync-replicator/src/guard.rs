//! Reentrancy guard.
//!
//! Writing to a variant makes the store notify the replicator again, this
//! time with the variant as source. Since all variants share one identity,
//! tracking identities in flight is enough to cut the A → B → A cycle.
//!
//! Entries are keyed by thread as well: the cycle is a same-thread, same-stack
//! problem, and an event for the same identity arriving on another thread is
//! independent work that must not be swallowed.

use dimsync_types::NodeIdentity;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

type InFlightKey = (ThreadId, NodeIdentity);

/// Shared set of identities currently being replicated.
///
/// Cloning yields another handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `identity` as in flight on the current thread.
    ///
    /// Returns `None` if it already is; the caller must then do nothing.
    #[must_use]
    pub fn try_enter(&self, identity: NodeIdentity) -> Option<InFlightToken> {
        let key = (thread::current().id(), identity);
        if !self.lock().insert(key) {
            return None;
        }
        Some(InFlightToken {
            guard: self.clone(),
            key,
        })
    }

    /// Whether `identity` is in flight on the current thread.
    pub fn is_active(&self, identity: &NodeIdentity) -> bool {
        self.lock().contains(&(thread::current().id(), *identity))
    }

    /// Number of identities in flight across all threads.
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn leave(&self, key: &InFlightKey) {
        self.lock().remove(key);
    }

    // A panic while holding the lock cannot leave the set half-updated.
    fn lock(&self) -> MutexGuard<'_, HashSet<InFlightKey>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of entry; releases the identity when dropped.
#[derive(Debug)]
#[must_use = "the identity is released as soon as the token is dropped"]
pub struct InFlightToken {
    guard: InFlightGuard,
    key: InFlightKey,
}

impl InFlightToken {
    pub fn identity(&self) -> NodeIdentity {
        self.key.1
    }

    /// Releases the identity now.
    pub fn leave(self) {}
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        self.guard.leave(&self.key);
    }
}
