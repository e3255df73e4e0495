//! Node-type replication configuration.
//!
//! Configuration is declared per node type in TOML:
//!
//! ```toml
//! [node_types."Acme:Product"]
//! auto_created_children = ["main"]
//!
//! [node_types."Acme:Product".replication]
//! structure = true
//! content = true
//! excluded_properties = ["price"]
//!
//! [node_types."Acme:Product".replication.properties]
//! update = true
//!
//! [node_types."Acme:Product".properties.title.replication]
//! update_empty_only = true
//! ```
//!
//! [`NodeTypeRegistry`] resolves each entry into a [`ReplicationPolicy`] when
//! it is registered, so lookups on the event path only clone.

use crate::policy::{PropertyPolicy, ReplicationPolicy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while loading node-type configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Turns a node type name into its replication policy.
///
/// Called on every event, so implementations must be cheap and free of side
/// effects. Unknown node types resolve to [`ReplicationPolicy::disabled`].
pub trait PolicyResolver: Send + Sync {
    fn resolve(&self, node_type: &str) -> ReplicationPolicy;
}

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default)]
    pub node_types: BTreeMap<String, NodeTypeConfig>,
}

/// Configuration of a single node type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeTypeConfig {
    /// Names of the child nodes created together with a node of this type.
    #[serde(default)]
    pub auto_created_children: Vec<String>,
    /// Absent means replication is disabled for this node type.
    #[serde(default)]
    pub replication: Option<ReplicationOptions>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyConfig>,
}

/// The `replication` block of a node type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicationOptions {
    /// Default for both `create` and `remove`.
    pub structure: Option<bool>,
    pub create: Option<bool>,
    pub create_hidden: Option<bool>,
    pub remove: Option<bool>,
    #[serde(alias = "content")]
    pub content_update: Option<bool>,
    #[serde(alias = "update_empty_properties_only")]
    pub content_update_empty_only: Option<bool>,
    #[serde(default)]
    pub excluded_properties: BTreeSet<String>,
    #[serde(default)]
    pub allowed_path_prefixes: Vec<String>,
    /// Defaults merged into every declared property.
    pub properties: Option<PropertyReplicationOptions>,
}

/// A declared property of a node type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyConfig {
    #[serde(default)]
    pub replication: Option<PropertyReplicationOptions>,
}

/// Property-level replication switches; unset keys fall back to the node
/// type's property defaults, then to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyReplicationOptions {
    pub update: Option<bool>,
    pub update_empty_only: Option<bool>,
}

impl PropertyReplicationOptions {
    fn merged_over(self, defaults: Option<Self>) -> PropertyPolicy {
        let defaults = defaults.unwrap_or_default();
        PropertyPolicy {
            update: self.update.or(defaults.update).unwrap_or(false),
            update_empty_only: self
                .update_empty_only
                .or(defaults.update_empty_only)
                .unwrap_or(false),
        }
    }
}

impl NodeTypeConfig {
    /// Resolves this configuration into a policy.
    pub fn resolve(&self) -> ReplicationPolicy {
        let Some(options) = &self.replication else {
            return ReplicationPolicy::disabled();
        };

        let structure = options.structure.unwrap_or(false);
        let create = options.create.unwrap_or(structure);
        let defaults = options.properties;

        let mut properties = BTreeMap::new();
        for (name, config) in &self.properties {
            if config.replication.is_none() && defaults.is_none() {
                continue;
            }
            let explicit = config.replication.unwrap_or_default();
            properties.insert(name.clone(), explicit.merged_over(defaults));
        }

        ReplicationPolicy {
            configured: true,
            create,
            create_hidden: create && options.create_hidden.unwrap_or(false),
            remove: options.remove.unwrap_or(structure),
            content_update: options.content_update.unwrap_or(false),
            content_update_empty_only: options.content_update_empty_only.unwrap_or(false),
            excluded_properties: options.excluded_properties.clone(),
            allowed_path_prefixes: options.allowed_path_prefixes.clone(),
            properties,
            auto_created_child_count: self.auto_created_children.len(),
        }
    }
}

/// In-memory registry of node-type configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeTypeRegistry {
    configs: BTreeMap<String, NodeTypeConfig>,
    policies: BTreeMap<String, ReplicationPolicy>,
}

impl NodeTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a parsed configuration document.
    pub fn from_config(config: ReplicationConfig) -> Self {
        let mut registry = Self::new();
        for (node_type, node_config) in config.node_types {
            registry.register(node_type, node_config);
        }
        registry
    }

    /// Parses a TOML configuration document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ReplicationConfig = toml::from_str(contents)?;
        Ok(Self::from_config(config))
    }

    /// Loads a TOML configuration file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_toml_str(&contents)?;
        info!(
            "Loaded replication configuration for {} node types from {:?}",
            registry.len(),
            path
        );
        Ok(registry)
    }

    /// Registers (or replaces) the configuration of a node type.
    pub fn register(&mut self, node_type: impl Into<String>, config: NodeTypeConfig) {
        let node_type = node_type.into();
        let policy = config.resolve();
        debug!(
            "Registered node type {} (replication enabled: {})",
            node_type,
            policy.is_enabled()
        );
        self.policies.insert(node_type.clone(), policy);
        self.configs.insert(node_type, config);
    }

    pub fn config(&self, node_type: &str) -> Option<&NodeTypeConfig> {
        self.configs.get(node_type)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl PolicyResolver for NodeTypeRegistry {
    fn resolve(&self, node_type: &str) -> ReplicationPolicy {
        self.policies
            .get(node_type)
            .cloned()
            .unwrap_or_else(ReplicationPolicy::disabled)
    }
}
