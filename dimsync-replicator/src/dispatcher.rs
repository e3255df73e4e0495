//! Bridges store change notifications to the replicator.

use crate::engine::Replicator;
use crate::event::ReplicationEvent;
use dimsync_model::ContentNode;
use dimsync_store::{ListenerResult, MemoryStore, NodeListener, StoreResult};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A [`NodeListener`] forwarding every notification to a [`Replicator`].
///
/// Holds the replicator weakly: the replicator owns the store, and the store
/// owns its listeners.
pub struct ReplicationDispatcher {
    replicator: Weak<Replicator>,
}

impl ReplicationDispatcher {
    pub fn new(replicator: &Arc<Replicator>) -> Self {
        Self {
            replicator: Arc::downgrade(replicator),
        }
    }

    /// Subscribes a dispatcher for `replicator` to `store`.
    pub fn attach(store: &MemoryStore, replicator: &Arc<Replicator>) -> StoreResult<()> {
        store.subscribe(Arc::new(Self::new(replicator)))
    }

    fn dispatch(&self, event: ReplicationEvent) -> ListenerResult {
        let Some(replicator) = self.replicator.upgrade() else {
            debug!("Replicator dropped, ignoring {} event", event.kind());
            return Ok(());
        };
        replicator.handle(&event)?;
        Ok(())
    }
}

impl NodeListener for ReplicationDispatcher {
    fn node_added(&self, node: &ContentNode) -> ListenerResult {
        self.dispatch(ReplicationEvent::added(node.clone()))
    }

    fn node_removed(&self, node: &ContentNode) -> ListenerResult {
        self.dispatch(ReplicationEvent::removed(node.clone()))
    }

    fn node_updated(&self, node: &ContentNode) -> ListenerResult {
        self.dispatch(ReplicationEvent::updated(node.clone()))
    }

    fn property_changed(
        &self,
        node: &ContentNode,
        name: &str,
        old_value: Option<&Value>,
        new_value: &Value,
    ) -> ListenerResult {
        self.dispatch(ReplicationEvent::property_changed(
            node.clone(),
            name,
            old_value.cloned(),
            new_value.clone(),
        ))
    }
}
