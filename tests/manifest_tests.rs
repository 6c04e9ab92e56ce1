//! Manifest parsing and the local object store

use kubestatus::kube::manifest::{parse_manifest, read_manifest};
use kubestatus::kube::{ListQuery, ManifestStore, ObjectStore};
use kubestatus::resolver::{Resolver, TypeCatalog};
use kubestatus::StoreError;

const MANIFEST: &str = r#"
apiVersion: v1
kind: Pod
metadata:
  name: later
  namespace: default
  creationTimestamp: "2024-01-02T00:00:00Z"
  labels:
    app: web
---
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Pod
    metadata:
      name: earlier
      namespace: default
      creationTimestamp: "2024-01-01T00:00:00Z"
      labels:
        app: web
        tier: canary
  - apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
      namespace: default
---
"#;

#[test]
fn test_multi_document_and_lists_are_flattened() {
    let objects = parse_manifest(MANIFEST, "inline").unwrap();
    let names: Vec<_> = objects.iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["later", "earlier", "web"]);
}

#[test]
fn test_invalid_yaml_names_source() {
    let err = parse_manifest("kind: [unclosed", "broken.yaml").unwrap_err();
    assert!(matches!(err, StoreError::ManifestParse { .. }));
    assert!(err.to_string().starts_with("parsing manifest broken.yaml"));
}

#[test]
fn test_read_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pods.yaml");
    std::fs::write(&path, MANIFEST).unwrap();

    assert_eq!(read_manifest(&path).unwrap().len(), 3);
    assert!(matches!(
        read_manifest(&dir.path().join("missing.yaml")),
        Err(StoreError::ManifestRead { .. })
    ));
}

#[test]
fn test_load_merges_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("app.yaml");
    let second = dir.path().join("extra.yaml");
    std::fs::write(&first, MANIFEST).unwrap();
    std::fs::write(
        &second,
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  namespace: default\n  creationTimestamp: \"2023-12-31T00:00:00Z\"\n",
    )
    .unwrap();

    let store = ManifestStore::load(&[first.clone(), second]).unwrap();
    assert_eq!(store.objects().len(), 4);
    let timestamped: Vec<_> = store
        .objects()
        .iter()
        .filter(|o| o.creation_timestamp().is_some())
        .map(|o| o.name())
        .collect();
    assert_eq!(timestamped, vec!["web", "earlier", "later"]);

    let err = ManifestStore::load(&[first, dir.path().join("missing.yaml")]).unwrap_err();
    assert!(matches!(err, StoreError::ManifestRead { .. }));
}

#[tokio::test]
async fn test_local_store_orders_by_creation_time() {
    let store = ManifestStore::from_objects(parse_manifest(MANIFEST, "inline").unwrap());
    let pods = Resolver::new(TypeCatalog::builtin()).resolve("pods").unwrap();

    let listed = store
        .list(&pods, &ListQuery::in_namespace("default"))
        .await
        .unwrap();
    let names: Vec<_> = listed.iter().map(|o| o.name()).collect();
    assert_eq!(names, vec!["earlier", "later"]);
}

#[tokio::test]
async fn test_local_store_applies_label_selectors() {
    let store = ManifestStore::from_objects(parse_manifest(MANIFEST, "inline").unwrap());
    let pods = Resolver::new(TypeCatalog::builtin()).resolve("pods").unwrap();

    let canary = store
        .list(&pods, &ListQuery::all_namespaces().labels("tier=canary"))
        .await
        .unwrap();
    assert_eq!(canary.len(), 1);
    assert_eq!(canary.first().unwrap().name(), "earlier");

    let stable = store
        .list(&pods, &ListQuery::all_namespaces().labels("app=web,!tier"))
        .await
        .unwrap();
    assert_eq!(stable.len(), 1);
    assert_eq!(stable.first().unwrap().name(), "later");
}

#[tokio::test]
async fn test_local_store_has_no_cluster_extras() {
    let store = ManifestStore::from_objects(parse_manifest(MANIFEST, "inline").unwrap());
    let deployment = store.objects().iter().find(|o| o.kind() == "Deployment").unwrap();

    assert!(store.events(deployment).await.unwrap().is_empty());
    assert!(store.node_stats_summary("node-1").await.is_err());
    assert!(store.is_local());
}
