use crate::StoreResult;
use dimsync_model::{ContentNode, NodeAddress, Properties};
use dimsync_types::{DimensionContext, NodeIdentity};
use serde_json::Value;

/// Storage the replicator reads and mutates content nodes through.
///
/// Every method takes `&self`: stores are shared between the host and the
/// replicator, and mutations may synchronously re-enter the replicator via
/// [`NodeListener`] callbacks, so implementations must not hold internal locks
/// while notifying.
pub trait ContentStore: Send + Sync {
    /// Looks up the variant of `identity` in `context`, removed ones included.
    fn get_node(
        &self,
        context: &DimensionContext,
        identity: &NodeIdentity,
    ) -> StoreResult<Option<ContentNode>>;

    /// Contexts other than `node.context` in which `node.identity` exists and
    /// is not removed.
    fn other_variant_contexts(&self, node: &ContentNode) -> StoreResult<Vec<DimensionContext>>;

    /// Materializes `node`'s identity in `target`, copying its type, path,
    /// parent and properties.
    ///
    /// Fails with `ParentMissing` if the parent identity does not exist in
    /// `target`, and with `AlreadyExists` if a variant is already there.
    fn adopt(&self, node: &ContentNode, target: &DimensionContext) -> StoreResult<ContentNode>;

    fn set_hidden(&self, address: &NodeAddress, hidden: bool) -> StoreResult<()>;

    fn set_property(&self, address: &NodeAddress, name: &str, value: Value) -> StoreResult<()>;

    /// Replaces the whole property map.
    fn replace_properties(&self, address: &NodeAddress, properties: Properties)
    -> StoreResult<()>;

    /// Marks the variant and its descendants in the same context removed.
    ///
    /// Descendants go first, deepest first, each reported as its own removal.
    /// A failure part-way leaves the nodes not yet reached untouched.
    fn remove(&self, address: &NodeAddress) -> StoreResult<()>;

    /// Number of attached, non-removed children of the variant.
    fn child_count(&self, address: &NodeAddress) -> StoreResult<usize>;
}

/// Result type for listener callbacks.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives change notifications from a store.
///
/// Callbacks run synchronously on the thread performing the mutation, after
/// the mutation is visible. An error fails the mutating call.
pub trait NodeListener: Send + Sync {
    fn node_added(&self, node: &ContentNode) -> ListenerResult {
        let _ = node;
        Ok(())
    }

    fn node_removed(&self, node: &ContentNode) -> ListenerResult {
        let _ = node;
        Ok(())
    }

    /// Several properties changed at once.
    fn node_updated(&self, node: &ContentNode) -> ListenerResult {
        let _ = node;
        Ok(())
    }

    fn property_changed(
        &self,
        node: &ContentNode,
        name: &str,
        old_value: Option<&Value>,
        new_value: &Value,
    ) -> ListenerResult {
        let _ = (node, name, old_value, new_value);
        Ok(())
    }
}
