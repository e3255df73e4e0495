//! Content model for dimsync.
//!
//! Defines the types the replicator reasons about:
//! - [`ContentNode`]: one materialization of a node identity in one dimension context
//! - [`ReplicationPolicy`]: the resolved replication decisions for a node type
//! - [`NodeTypeConfig`]: the declarative per-node-type configuration (TOML)
//! - [`NodeTypeRegistry`]: resolves node type names to policies ([`PolicyResolver`])
//!
//! Storage of nodes is not part of this crate; see `dimsync-store`.

mod config;
mod node;
mod policy;

pub use config::{
    ConfigError, NodeTypeConfig, NodeTypeRegistry, PolicyResolver, PropertyConfig,
    PropertyReplicationOptions, ReplicationConfig, ReplicationOptions,
};
pub use node::{is_empty_value, ContentNode, NodeAddress, Properties};
pub use policy::{is_path_allowed, PropertyPolicy, ReplicationPolicy, UpdateMode};
