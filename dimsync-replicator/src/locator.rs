//! Finds the dimension contexts an event propagates to.
//!
//! Targets are derived from the node's *parent*: a variant can only live in a
//! context where its parent already exists, so the contexts holding other
//! variants of the parent are the ones to visit.

use dimsync_model::ContentNode;
use dimsync_store::{ContentStore, StoreResult};
use dimsync_types::DimensionContext;
use tracing::debug;

/// A context to propagate to, with the node's counterpart there if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub context: DimensionContext,
    pub counterpart: Option<ContentNode>,
}

/// Resolves targets against a content store.
pub struct VariantLocator<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> VariantLocator<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Target contexts for `node`, sorted by canonical context form.
    ///
    /// Empty when the node has no parent, or when the parent is not (or no
    /// longer) present in the node's own context: such a node is not attached
    /// yet and its parent's variants cannot be trusted to exist.
    pub fn target_contexts(&self, node: &ContentNode) -> StoreResult<Vec<Target>> {
        let Some(parent_identity) = node.parent else {
            debug!("Node {} has no parent, nothing to replicate to", node.identity);
            return Ok(Vec::new());
        };

        let parent = match self.store.get_node(&node.context, &parent_identity)? {
            Some(parent) if !parent.removed => parent,
            _ => {
                debug!(
                    "Parent {} of node {} not present in [{}]",
                    parent_identity, node.identity, node.context
                );
                return Ok(Vec::new());
            }
        };

        let mut contexts = self.store.other_variant_contexts(&parent)?;
        contexts.sort();
        contexts.dedup();
        contexts.retain(|c| *c != node.context);

        contexts
            .into_iter()
            .map(|context| {
                let counterpart = self.store.get_node(&context, &node.identity)?;
                Ok(Target {
                    context,
                    counterpart,
                })
            })
            .collect()
    }
}
