//! Resolved replication policies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a single property change is pushed to the other variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Overwrite the counterpart's value.
    Always,
    /// Only fill the counterpart's value when it is empty.
    EmptyOnly,
}

/// Per-property replication switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyPolicy {
    pub update: bool,
    pub update_empty_only: bool,
}

impl PropertyPolicy {
    /// `update_empty_only` wins over `update` when both are set.
    pub fn update_mode(&self) -> Option<UpdateMode> {
        if self.update_empty_only {
            Some(UpdateMode::EmptyOnly)
        } else if self.update {
            Some(UpdateMode::Always)
        } else {
            None
        }
    }
}

/// Replication decisions for one node type.
///
/// Derived once from configuration and never mutated afterwards. The
/// [`disabled`](Self::disabled) policy is what every unconfigured node type
/// resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPolicy {
    /// Whether a replication block exists at all.
    pub configured: bool,
    pub create: bool,
    /// Only meaningful together with `create`.
    pub create_hidden: bool,
    pub remove: bool,
    pub content_update: bool,
    pub content_update_empty_only: bool,
    /// Preserved at the target during full synchronization.
    pub excluded_properties: BTreeSet<String>,
    /// Empty means every path is allowed.
    pub allowed_path_prefixes: Vec<String>,
    pub properties: BTreeMap<String, PropertyPolicy>,
    /// Number of child nodes the node type creates automatically.
    pub auto_created_child_count: usize,
}

impl ReplicationPolicy {
    /// The policy of a node type without replication configuration.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.configured
    }

    pub fn property(&self, name: &str) -> Option<&PropertyPolicy> {
        self.properties.get(name)
    }

    /// Update mode for a property, `None` if changes to it are not replicated.
    pub fn property_update_mode(&self, name: &str) -> Option<UpdateMode> {
        self.property(name).and_then(PropertyPolicy::update_mode)
    }

    pub fn allows_path(&self, path: &str) -> bool {
        is_path_allowed(self, path)
    }
}

/// True if the policy has no path prefixes or `path` starts with one of them.
///
/// Plain, case-sensitive string prefix match: `/sites/main` also admits
/// `/sites/main-archive`.
pub fn is_path_allowed(policy: &ReplicationPolicy, path: &str) -> bool {
    policy.allowed_path_prefixes.is_empty()
        || policy
            .allowed_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
}
