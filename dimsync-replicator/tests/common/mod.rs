//! Shared fixtures for replicator tests.

#![allow(dead_code)]

use dimsync_model::{ContentNode, NodeTypeRegistry};
use dimsync_replicator::{InFlightGuard, MemoryAuditSink, ReplicationDispatcher, Replicator};
use dimsync_store::{ContentStore, MemoryStore};
use dimsync_types::{DimensionContext, NodeIdentity};
use std::sync::Arc;

pub const CONFIG: &str = r#"
[node_types."Acme:Page"]

[node_types."Acme:Product".replication]
structure = true
content = true
excluded_properties = ["price"]

[node_types."Acme:Product".replication.properties]
update = true

[node_types."Acme:Product".properties.title]
[node_types."Acme:Product".properties.price]
[node_types."Acme:Product".properties.teaser.replication]
update_empty_only = true
[node_types."Acme:Product".properties.sku.replication]
update = false

[node_types."Acme:Hidden".replication]
create = true
create_hidden = true

[node_types."Acme:Filtered".replication]
structure = true
content = true
allowed_path_prefixes = ["/sites/main/content"]

[node_types."Acme:Filtered".replication.properties]
update = true

[node_types."Acme:Filtered".properties.title]

[node_types."Acme:EmptyOnly".replication]
content = true
update_empty_properties_only = true

[node_types."Acme:Teaser"]
auto_created_children = ["main", "footer"]

[node_types."Acme:Teaser".replication]
create = true
"#;

pub const PAGE_PATH: &str = "/sites/main/content";

pub fn ctx(language: &str) -> DimensionContext {
    DimensionContext::single("language", language).unwrap()
}

/// A store with one page materialized in several languages, and a
/// replicator over it auditing into memory.
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub audit: Arc<MemoryAuditSink>,
    pub guard: InFlightGuard,
    pub replicator: Arc<Replicator>,
    pub page: NodeIdentity,
}

impl Fixture {
    pub fn new(languages: &[&str]) -> Self {
        let registry = NodeTypeRegistry::from_toml_str(CONFIG).unwrap();
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let guard = InFlightGuard::new();
        let replicator = Arc::new(Replicator::with_parts(
            store.clone(),
            Arc::new(registry),
            audit.clone(),
            guard.clone(),
        ));

        let page = NodeIdentity::new();
        for language in languages {
            store
                .insert(ContentNode::new(page, ctx(language), "Acme:Page", PAGE_PATH))
                .unwrap();
        }

        Self {
            store,
            audit,
            guard,
            replicator,
            page,
        }
    }

    /// Like [`new`](Self::new), with store notifications routed to the
    /// replicator.
    pub fn wired(languages: &[&str]) -> Self {
        let fixture = Self::new(languages);
        ReplicationDispatcher::attach(&fixture.store, &fixture.replicator).unwrap();
        fixture
    }

    /// A new child of the page, not yet stored.
    pub fn child(&self, language: &str, node_type: &str, name: &str) -> ContentNode {
        ContentNode::new(
            NodeIdentity::new(),
            ctx(language),
            node_type,
            format!("{PAGE_PATH}/{name}"),
        )
        .with_parent(self.page)
    }

    /// Another variant of an existing node.
    pub fn variant(&self, node: &ContentNode, language: &str) -> ContentNode {
        ContentNode {
            context: ctx(language),
            ..node.clone()
        }
    }

    pub fn insert(&self, node: &ContentNode) {
        self.store.insert(node.clone()).unwrap();
    }

    pub fn get(&self, language: &str, identity: NodeIdentity) -> Option<ContentNode> {
        self.store.get_node(&ctx(language), &identity).unwrap()
    }

    pub fn live_variant_count(&self, identity: NodeIdentity) -> usize {
        self.store
            .variants_of(&identity)
            .unwrap()
            .iter()
            .filter(|n| !n.removed)
            .count()
    }
}
