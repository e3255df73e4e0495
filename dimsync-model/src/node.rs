use dimsync_types::{DimensionContext, NodeIdentity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Property map of a content node, ordered by property name.
pub type Properties = BTreeMap<String, Value>;

/// Where a variant lives: its identity plus the context it is materialized in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddress {
    pub identity: NodeIdentity,
    pub context: DimensionContext,
}

impl NodeAddress {
    pub fn new(identity: NodeIdentity, context: DimensionContext) -> Self {
        Self { identity, context }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@[{}]", self.identity, self.context)
    }
}

/// A materialization of a node identity inside exactly one dimension context.
///
/// Values of this type are snapshots handed out by the content store. Mutating
/// a snapshot does not touch the store; go through `ContentStore` for that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub identity: NodeIdentity,
    pub context: DimensionContext,
    pub node_type: String,
    pub path: String,
    /// Identity of the parent node, `None` for roots and detached nodes.
    pub parent: Option<NodeIdentity>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub removed: bool,
}

impl ContentNode {
    /// Creates a visible, detached node without properties.
    pub fn new(
        identity: NodeIdentity,
        context: DimensionContext,
        node_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            context,
            node_type: node_type.into(),
            path: path.into(),
            parent: None,
            properties: Properties::new(),
            hidden: false,
            removed: false,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: NodeIdentity) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn address(&self) -> NodeAddress {
        NodeAddress::new(self.identity, self.context.clone())
    }

    pub fn get_property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// True when the property is absent or holds an empty value.
    pub fn is_property_empty(&self, name: &str) -> bool {
        self.get_property(name).is_none_or(is_empty_value)
    }

    /// Extract a string property.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get_property(name).and_then(Value::as_str)
    }
}

/// Whether a property value counts as empty for "empty only" replication:
/// `null`, `""`, `[]` and `{}` are empty, everything else (including `false`
/// and `0`) is a value.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
