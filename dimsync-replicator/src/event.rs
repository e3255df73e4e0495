//! Node lifecycle events the replicator reacts to.

use dimsync_model::ContentNode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a content node, as reported by the host.
///
/// The set is closed: each variant maps to exactly one replication operation
/// in `Replicator::handle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ReplicationEvent {
    /// A node was created (or adopted into a new context).
    Added { node: ContentNode },

    /// A node was removed.
    Removed { node: ContentNode },

    /// Several properties of a node changed at once.
    Updated { node: ContentNode },

    /// A single property changed.
    PropertyChanged {
        node: ContentNode,
        property: String,
        old_value: Option<Value>,
        new_value: Value,
    },
}

impl ReplicationEvent {
    #[must_use]
    pub fn added(node: ContentNode) -> Self {
        Self::Added { node }
    }

    #[must_use]
    pub fn removed(node: ContentNode) -> Self {
        Self::Removed { node }
    }

    #[must_use]
    pub fn updated(node: ContentNode) -> Self {
        Self::Updated { node }
    }

    #[must_use]
    pub fn property_changed(
        node: ContentNode,
        property: impl Into<String>,
        old_value: Option<Value>,
        new_value: Value,
    ) -> Self {
        Self::PropertyChanged {
            node,
            property: property.into(),
            old_value,
            new_value,
        }
    }

    /// The node the event is about.
    pub fn node(&self) -> &ContentNode {
        match self {
            Self::Added { node }
            | Self::Removed { node }
            | Self::Updated { node }
            | Self::PropertyChanged { node, .. } => node,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Removed { .. } => "removed",
            Self::Updated { .. } => "updated",
            Self::PropertyChanged { .. } => "property_changed",
        }
    }
}
