use dimsync_model::{ContentNode, Properties};
use dimsync_store::{ContentStore, ListenerResult, MemoryStore, NodeListener, StoreError};
use dimsync_types::{DimensionContext, NodeIdentity};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn ctx(language: &str) -> DimensionContext {
    DimensionContext::single("language", language).unwrap()
}

fn node(identity: NodeIdentity, language: &str, path: &str) -> ContentNode {
    ContentNode::new(identity, ctx(language), "Acme:Product", path)
}

/// Store with a root in `en` and `de`, and a child of it in `en`.
fn seeded() -> (MemoryStore, NodeIdentity, NodeIdentity) {
    let store = MemoryStore::new();
    let root = NodeIdentity::new();
    let child = NodeIdentity::new();
    store.insert(node(root, "en", "/sites/main")).unwrap();
    store.insert(node(root, "de", "/sites/main")).unwrap();
    store
        .insert(
            node(child, "en", "/sites/main/a")
                .with_parent(root)
                .with_property("title", "Hello"),
        )
        .unwrap();
    (store, root, child)
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<String>>,
}

impl NodeListener for Recorder {
    fn node_added(&self, node: &ContentNode) -> ListenerResult {
        self.calls.lock().unwrap().push(format!("added {}", node.context));
        Ok(())
    }

    fn node_removed(&self, node: &ContentNode) -> ListenerResult {
        self.calls.lock().unwrap().push(format!("removed {}", node.context));
        Ok(())
    }

    fn node_updated(&self, node: &ContentNode) -> ListenerResult {
        self.calls.lock().unwrap().push(format!("updated {}", node.context));
        Ok(())
    }

    fn property_changed(
        &self,
        node: &ContentNode,
        name: &str,
        old_value: Option<&Value>,
        new_value: &Value,
    ) -> ListenerResult {
        self.calls.lock().unwrap().push(format!(
            "changed {} {name} {:?} -> {new_value}",
            node.context, old_value
        ));
        Ok(())
    }
}

struct Failing;

impl NodeListener for Failing {
    fn node_removed(&self, _node: &ContentNode) -> ListenerResult {
        Err("listener refused".into())
    }
}

// ── Lookup ───────────────────────────────────────────────────────

#[test]
fn get_node_finds_variant() {
    let (store, root, _) = seeded();
    assert!(store.get_node(&ctx("en"), &root).unwrap().is_some());
    assert!(store.get_node(&ctx("fr"), &root).unwrap().is_none());
}

#[test]
fn other_variant_contexts_excludes_own_and_removed() {
    let (store, root, _) = seeded();
    store.insert(node(root, "fr", "/sites/main")).unwrap();
    let en_root = store.get_node(&ctx("en"), &root).unwrap().unwrap();

    assert_eq!(
        store.other_variant_contexts(&en_root).unwrap(),
        vec![ctx("de"), ctx("fr")]
    );

    store
        .remove(&store.get_node(&ctx("fr"), &root).unwrap().unwrap().address())
        .unwrap();
    assert_eq!(store.other_variant_contexts(&en_root).unwrap(), vec![ctx("de")]);
}

#[test]
fn insert_twice_is_rejected() {
    let (store, root, _) = seeded();
    let result = store.insert(node(root, "en", "/sites/main"));
    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
}

// ── Adopt ────────────────────────────────────────────────────────

#[test]
fn adopt_copies_node_into_target_context() {
    let (store, _, child) = seeded();
    let source = store.get_node(&ctx("en"), &child).unwrap().unwrap();

    let variant = store.adopt(&source, &ctx("de")).unwrap();
    assert_eq!(variant.identity, child);
    assert_eq!(variant.context, ctx("de"));
    assert_eq!(variant.path, source.path);
    assert_eq!(variant.parent, source.parent);
    assert_eq!(variant.get_str("title"), Some("Hello"));
    assert_eq!(store.get_node(&ctx("de"), &child).unwrap(), Some(variant));
}

#[test]
fn adopt_requires_parent_in_target() {
    let (store, _, child) = seeded();
    let source = store.get_node(&ctx("en"), &child).unwrap().unwrap();
    let result = store.adopt(&source, &ctx("fr"));
    assert!(matches!(result, Err(StoreError::ParentMissing { .. })));
    assert!(store.get_node(&ctx("fr"), &child).unwrap().is_none());
}

#[test]
fn adopt_rejects_existing_variant() {
    let (store, _, child) = seeded();
    let source = store.get_node(&ctx("en"), &child).unwrap().unwrap();
    store.adopt(&source, &ctx("de")).unwrap();
    let result = store.adopt(&source, &ctx("de"));
    assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
}

// ── Mutation ─────────────────────────────────────────────────────

#[test]
fn set_property_and_hidden() {
    let (store, _, child) = seeded();
    let address = store.get_node(&ctx("en"), &child).unwrap().unwrap().address();
    store.set_property(&address, "title", json!("Changed")).unwrap();
    store.set_hidden(&address, true).unwrap();

    let n = store.get_node(&ctx("en"), &child).unwrap().unwrap();
    assert_eq!(n.get_str("title"), Some("Changed"));
    assert!(n.hidden);
}

#[test]
fn replace_properties_overwrites_map() {
    let (store, _, child) = seeded();
    let address = store.get_node(&ctx("en"), &child).unwrap().unwrap().address();
    let mut props = Properties::new();
    props.insert("body".into(), json!("Text"));
    store.replace_properties(&address, props.clone()).unwrap();

    let n = store.get_node(&ctx("en"), &child).unwrap().unwrap();
    assert_eq!(n.properties, props);
}

#[test]
fn remove_marks_node_and_descendants() {
    let (store, root, child) = seeded();
    let grandchild = NodeIdentity::new();
    store
        .insert(node(grandchild, "en", "/sites/main/a/b").with_parent(child))
        .unwrap();
    let root_en = store.get_node(&ctx("en"), &root).unwrap().unwrap().address();

    assert_eq!(store.child_count(&root_en).unwrap(), 1);
    store.remove(&root_en).unwrap();

    assert!(store.get_node(&ctx("en"), &root).unwrap().unwrap().removed);
    assert!(store.get_node(&ctx("en"), &child).unwrap().unwrap().removed);
    assert!(store.get_node(&ctx("en"), &grandchild).unwrap().unwrap().removed);
    assert!(!store.get_node(&ctx("de"), &root).unwrap().unwrap().removed);
    assert_eq!(store.child_count(&root_en).unwrap(), 0);
}

#[test]
fn mutating_missing_node_is_not_found() {
    let (store, _, child) = seeded();
    let address = dimsync_model::NodeAddress::new(child, ctx("fr"));
    assert!(matches!(
        store.set_property(&address, "title", json!("x")),
        Err(StoreError::NotFound(_))
    ));
}

#[test]
fn injected_failure_blocks_mutations_in_context() {
    let (store, _, child) = seeded();
    let address = store.get_node(&ctx("en"), &child).unwrap().unwrap().address();
    store.fail_mutations_in(ctx("en")).unwrap();

    assert!(matches!(
        store.set_property(&address, "title", json!("x")),
        Err(StoreError::Storage(_))
    ));
    assert_eq!(
        store.get_node(&ctx("en"), &child).unwrap().unwrap().get_str("title"),
        Some("Hello")
    );

    store.clear_failures().unwrap();
    store.set_property(&address, "title", json!("x")).unwrap();
}

// ── Notifications ────────────────────────────────────────────────

#[test]
fn listeners_see_each_mutation() {
    let (store, _, child) = seeded();
    let recorder = Arc::new(Recorder::default());
    store.subscribe(recorder.clone()).unwrap();

    let source = store.get_node(&ctx("en"), &child).unwrap().unwrap();
    let variant = store.adopt(&source, &ctx("de")).unwrap();
    store.set_property(&variant.address(), "title", json!("Hallo")).unwrap();
    store.set_property(&variant.address(), "title", json!("Hallo")).unwrap();
    store.replace_properties(&variant.address(), Properties::new()).unwrap();
    store.replace_properties(&variant.address(), Properties::new()).unwrap();
    store.set_hidden(&variant.address(), true).unwrap();
    store.remove(&variant.address()).unwrap();

    let calls = recorder.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            "added language:de".to_string(),
            "changed language:de title Some(String(\"Hello\")) -> \"Hallo\"".to_string(),
            "updated language:de".to_string(),
            "removed language:de".to_string(),
        ]
    );
}

#[derive(Default)]
struct RemovalLog {
    paths: Mutex<Vec<(String, bool)>>,
    store: Mutex<Option<Arc<MemoryStore>>>,
}

impl NodeListener for RemovalLog {
    fn node_removed(&self, node: &ContentNode) -> ListenerResult {
        let store = self.store.lock().unwrap().clone().unwrap();
        let parent_live = match node.parent {
            Some(parent) => store
                .get_node(&node.context, &parent)?
                .is_some_and(|p| !p.removed),
            None => false,
        };
        self.paths.lock().unwrap().push((node.path.clone(), parent_live));
        Ok(())
    }
}

#[test]
fn remove_reports_each_descendant_before_its_parent() {
    let (store, root, child) = seeded();
    let store = Arc::new(store);
    let grandchild = NodeIdentity::new();
    store
        .insert(node(grandchild, "en", "/sites/main/a/b").with_parent(child))
        .unwrap();
    let log = Arc::new(RemovalLog::default());
    *log.store.lock().unwrap() = Some(store.clone());
    store.subscribe(log.clone()).unwrap();

    let root_en = store.get_node(&ctx("en"), &root).unwrap().unwrap().address();
    store.remove(&root_en).unwrap();

    // Every descendant is reported while its parent is still live.
    assert_eq!(
        *log.paths.lock().unwrap(),
        vec![
            ("/sites/main/a/b".to_string(), true),
            ("/sites/main/a".to_string(), true),
            ("/sites/main".to_string(), false),
        ]
    );
}

#[test]
fn remove_skips_already_removed_descendants() {
    let (store, root, child) = seeded();
    let recorder = Arc::new(Recorder::default());
    let child_en = store.get_node(&ctx("en"), &child).unwrap().unwrap().address();
    store.remove(&child_en).unwrap();
    store.subscribe(recorder.clone()).unwrap();

    let root_en = store.get_node(&ctx("en"), &root).unwrap().unwrap().address();
    store.remove(&root_en).unwrap();

    assert_eq!(*recorder.calls.lock().unwrap(), vec!["removed language:en".to_string()]);
}

#[test]
fn add_node_notifies_but_insert_does_not() {
    let store = MemoryStore::new();
    let recorder = Arc::new(Recorder::default());
    store.subscribe(recorder.clone()).unwrap();

    store.insert(node(NodeIdentity::new(), "en", "/a")).unwrap();
    store.add_node(node(NodeIdentity::new(), "de", "/b")).unwrap();

    assert_eq!(*recorder.calls.lock().unwrap(), vec!["added language:de".to_string()]);
    assert_eq!(store.len().unwrap(), 2);
}

#[test]
fn listener_error_fails_the_mutation_call() {
    let (store, _, child) = seeded();
    store.subscribe(Arc::new(Failing)).unwrap();
    let address = store.get_node(&ctx("en"), &child).unwrap().unwrap().address();

    let result = store.remove(&address);
    assert!(matches!(result, Err(StoreError::Listener(msg)) if msg == "listener refused"));
    // The mutation itself already happened.
    assert!(store.get_node(&ctx("en"), &child).unwrap().unwrap().removed);
}

#[test]
fn variants_of_lists_all_contexts() {
    let (store, root, _) = seeded();
    let contexts: Vec<DimensionContext> = store
        .variants_of(&root)
        .unwrap()
        .into_iter()
        .map(|n| n.context)
        .collect();
    assert_eq!(contexts, vec![ctx("de"), ctx("en")]);
}
