//! In-memory content store.

use crate::store::{ContentStore, NodeListener};
use crate::{StoreError, StoreResult};
use dimsync_model::{ContentNode, NodeAddress, Properties};
use dimsync_types::{DimensionContext, NodeIdentity};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

type NodeMap = BTreeMap<NodeAddress, ContentNode>;

/// A [`ContentStore`] keeping every variant in a map.
///
/// Fires [`NodeListener`] callbacks after each mutation, with no lock held:
/// - `adopt` and [`add_node`](Self::add_node) → `node_added`
/// - `set_property` → `property_changed` (only when the value changed)
/// - `replace_properties` → `node_updated` (only when the map changed)
/// - `remove` → `node_removed` for every removed descendant, then the node
///
/// `set_hidden` and [`insert`](Self::insert) are silent.
#[derive(Default)]
pub struct MemoryStore {
    nodes: RwLock<NodeMap>,
    listeners: RwLock<Vec<Arc<dyn NodeListener>>>,
    failing_contexts: RwLock<HashSet<DimensionContext>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a change listener.
    pub fn subscribe(&self, listener: Arc<dyn NodeListener>) -> StoreResult<()> {
        self.listeners
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .push(listener);
        Ok(())
    }

    /// Stores a node without notifying listeners (seeding).
    pub fn insert(&self, node: ContentNode) -> StoreResult<()> {
        let mut nodes = self.write_nodes()?;
        let address = node.address();
        if nodes.contains_key(&address) {
            return Err(StoreError::AlreadyExists(address.to_string()));
        }
        nodes.insert(address, node);
        Ok(())
    }

    /// Stores a node and notifies listeners, the way a host creating content
    /// would.
    pub fn add_node(&self, node: ContentNode) -> StoreResult<()> {
        self.insert(node.clone())?;
        self.notify(|l| l.node_added(&node))
    }

    /// Makes every subsequent mutation of a variant in `context` fail.
    pub fn fail_mutations_in(&self, context: DimensionContext) -> StoreResult<()> {
        self.failing_contexts
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .insert(context);
        Ok(())
    }

    pub fn clear_failures(&self) -> StoreResult<()> {
        self.failing_contexts
            .write()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }

    /// All variants of an identity, ordered by context.
    pub fn variants_of(&self, identity: &NodeIdentity) -> StoreResult<Vec<ContentNode>> {
        let nodes = self.read_nodes()?;
        Ok(nodes
            .values()
            .filter(|n| n.identity == *identity)
            .cloned()
            .collect())
    }

    /// Number of stored variants, removed ones included.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read_nodes()?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read_nodes()?.is_empty())
    }

    fn read_nodes(&self) -> StoreResult<RwLockReadGuard<'_, NodeMap>> {
        self.nodes.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_nodes(&self) -> StoreResult<RwLockWriteGuard<'_, NodeMap>> {
        self.nodes.write().map_err(|_| StoreError::Poisoned)
    }

    fn check_writable(&self, context: &DimensionContext) -> StoreResult<()> {
        let failing = self
            .failing_contexts
            .read()
            .map_err(|_| StoreError::Poisoned)?;
        if failing.contains(context) {
            return Err(StoreError::Storage(format!(
                "mutations in context [{context}] are failing"
            )));
        }
        Ok(())
    }

    /// Applies `f` to the stored node and returns its new snapshot.
    fn mutate<T>(
        &self,
        address: &NodeAddress,
        f: impl FnOnce(&mut ContentNode) -> T,
    ) -> StoreResult<(ContentNode, T)> {
        self.check_writable(&address.context)?;
        let mut nodes = self.write_nodes()?;
        let node = nodes
            .get_mut(address)
            .ok_or_else(|| StoreError::NotFound(address.to_string()))?;
        let out = f(node);
        Ok((node.clone(), out))
    }

    fn notify(
        &self,
        f: impl Fn(&dyn NodeListener) -> crate::ListenerResult,
    ) -> StoreResult<()> {
        let listeners: Vec<Arc<dyn NodeListener>> = self
            .listeners
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .clone();
        for listener in listeners {
            f(listener.as_ref()).map_err(|e| StoreError::Listener(e.to_string()))?;
        }
        Ok(())
    }
}

impl ContentStore for MemoryStore {
    fn get_node(
        &self,
        context: &DimensionContext,
        identity: &NodeIdentity,
    ) -> StoreResult<Option<ContentNode>> {
        let address = NodeAddress::new(*identity, context.clone());
        Ok(self.read_nodes()?.get(&address).cloned())
    }

    fn other_variant_contexts(&self, node: &ContentNode) -> StoreResult<Vec<DimensionContext>> {
        let nodes = self.read_nodes()?;
        Ok(nodes
            .values()
            .filter(|n| n.identity == node.identity && n.context != node.context && !n.removed)
            .map(|n| n.context.clone())
            .collect())
    }

    fn adopt(&self, node: &ContentNode, target: &DimensionContext) -> StoreResult<ContentNode> {
        self.check_writable(target)?;
        let variant = {
            let mut nodes = self.write_nodes()?;
            let address = NodeAddress::new(node.identity, target.clone());
            if nodes.contains_key(&address) {
                return Err(StoreError::AlreadyExists(address.to_string()));
            }
            if let Some(parent) = node.parent {
                let parent_address = NodeAddress::new(parent, target.clone());
                let parent_present = nodes.get(&parent_address).is_some_and(|p| !p.removed);
                if !parent_present {
                    return Err(StoreError::ParentMissing {
                        parent,
                        context: target.clone(),
                    });
                }
            }

            let variant = ContentNode {
                context: target.clone(),
                removed: false,
                ..node.clone()
            };
            nodes.insert(address, variant.clone());
            variant
        };

        debug!("Adopted {} into [{}]", node.identity, target);
        self.notify(|l| l.node_added(&variant))?;
        Ok(variant)
    }

    fn set_hidden(&self, address: &NodeAddress, hidden: bool) -> StoreResult<()> {
        self.mutate(address, |node| node.hidden = hidden)?;
        Ok(())
    }

    fn set_property(&self, address: &NodeAddress, name: &str, value: Value) -> StoreResult<()> {
        let (snapshot, old) =
            self.mutate(address, |node| node.properties.insert(name.to_string(), value.clone()))?;
        if old.as_ref() == Some(&value) {
            return Ok(());
        }
        self.notify(|l| l.property_changed(&snapshot, name, old.as_ref(), &value))
    }

    fn replace_properties(
        &self,
        address: &NodeAddress,
        properties: Properties,
    ) -> StoreResult<()> {
        let (snapshot, changed) = self.mutate(address, |node| {
            let changed = node.properties != properties;
            node.properties = properties;
            changed
        })?;
        if !changed {
            return Ok(());
        }
        self.notify(|l| l.node_updated(&snapshot))
    }

    fn remove(&self, address: &NodeAddress) -> StoreResult<()> {
        self.check_writable(&address.context)?;
        let order = {
            let nodes = self.read_nodes()?;
            if !nodes.contains_key(address) {
                return Err(StoreError::NotFound(address.to_string()));
            }
            removal_order(&nodes, address)
        };

        // One node at a time, so each notification sees its parent still live.
        for target in order {
            let snapshot = {
                let mut nodes = self.write_nodes()?;
                match nodes.get_mut(&target) {
                    Some(node) if !node.removed || target == *address => {
                        node.removed = true;
                        node.clone()
                    }
                    _ => continue,
                }
            };
            self.notify(|l| l.node_removed(&snapshot))?;
        }
        Ok(())
    }

    fn child_count(&self, address: &NodeAddress) -> StoreResult<usize> {
        let nodes = self.read_nodes()?;
        Ok(nodes
            .values()
            .filter(|n| {
                n.context == address.context && n.parent == Some(address.identity) && !n.removed
            })
            .count())
    }
}

/// Addresses of `root` and its live descendants in the same context,
/// children before their parents and `root` last.
fn removal_order(nodes: &NodeMap, root: &NodeAddress) -> Vec<NodeAddress> {
    let mut order = Vec::new();
    push_subtree(nodes, root, &mut order);
    order
}

fn push_subtree(nodes: &NodeMap, address: &NodeAddress, order: &mut Vec<NodeAddress>) {
    let children: Vec<NodeAddress> = nodes
        .values()
        .filter(|n| {
            n.context == address.context && n.parent == Some(address.identity) && !n.removed
        })
        .map(ContentNode::address)
        .collect();
    for child in &children {
        push_subtree(nodes, child, order);
    }
    order.push(address.clone());
}
