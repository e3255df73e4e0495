use dimsync_types::{Error, NodeIdentity};
use std::collections::HashSet;
use std::str::FromStr;

#[test]
fn identity_new_is_unique() {
    let a = NodeIdentity::new();
    let b = NodeIdentity::new();
    assert_ne!(a, b);
}

#[test]
fn identity_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = NodeIdentity::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn identity_display_and_parse() {
    let id = NodeIdentity::new();
    let parsed = NodeIdentity::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
    assert_eq!(NodeIdentity::from_str(&id.to_string()).unwrap(), id);
}

#[test]
fn identity_parse_invalid() {
    assert!(matches!(NodeIdentity::parse("not-a-uuid"), Err(Error::InvalidUuid(_))));
    assert!(matches!(NodeIdentity::from_str("garbage"), Err(Error::InvalidUuid(_))));
    assert!(matches!("garbage".parse::<NodeIdentity>(), Err(Error::InvalidUuid(_))));
}

#[test]
fn identity_hash_and_eq() {
    let id = NodeIdentity::new();
    let mut set = HashSet::new();
    set.insert(id);
    set.insert(id);
    assert_eq!(set.len(), 1);
}

#[test]
fn identity_serializes_transparently() {
    let id = NodeIdentity::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let back: NodeIdentity = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn v7_identities_sort_by_creation() {
    let a = NodeIdentity::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let b = NodeIdentity::new();
    assert!(a < b);
}
