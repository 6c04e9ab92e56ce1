//! Shared fixtures for integration tests
//!
//! `FakeStore` serves a fixed set of objects through the same filtering as the
//! manifest store, adds events, and replays scripted change notifications to
//! watches.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use kubestatus::error::StoreError;
use kubestatus::kube::{ListQuery, ManifestStore, ObjectStore};
use kubestatus::models::{ApiResourceMapping, ObjectCollection, ResourceObject};
use kubestatus::resolver::TypeCatalog;
use kubestatus::watcher::{ChangeFeed, ChangeKind, ChangeNotification};

pub const NOW: &str = "2024-01-10T00:00:00Z";

enum Scripted {
    Change(ChangeNotification),
    Fail(String),
}

pub struct FakeStore {
    objects: ManifestStore,
    events: Vec<ResourceObject>,
    script: Mutex<Vec<Scripted>>,
    hold_open: bool,
    calls: AtomicUsize,
}

impl FakeStore {
    pub fn new(objects: Vec<Value>) -> Self {
        Self {
            objects: ManifestStore::from_objects(objects.into_iter().map(object).collect()),
            events: Vec::new(),
            script: Mutex::new(Vec::new()),
            hold_open: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_events(mut self, events: Vec<Value>) -> Self {
        self.events = events.into_iter().map(object).collect();
        self
    }

    /// Replay `object` as a modification to the watch of its kind
    pub fn with_change(self, value: Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .push(Scripted::Change(ChangeNotification {
                kind: ChangeKind::Modified,
                object: object(value),
            }));
        self
    }

    /// Fail the first watch after its scripted changes
    pub fn with_watch_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push(Scripted::Fail(message.to_string()));
        self
    }

    /// Keep watches open after replaying, so only cancellation ends them
    pub fn holding_watches_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Number of store calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn catalog(&self) -> Result<TypeCatalog, StoreError> {
        Ok(TypeCatalog::builtin())
    }

    async fn list(
        &self,
        mapping: &ApiResourceMapping,
        query: &ListQuery,
    ) -> Result<ObjectCollection, StoreError> {
        self.record();
        let collection = self.objects.list(mapping, query).await?;
        Ok(collection.with_resource_version(Some("100".to_string())))
    }

    async fn get(
        &self,
        mapping: &ApiResourceMapping,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, StoreError> {
        self.record();
        self.objects.get(mapping, namespace, name).await
    }

    async fn events(&self, target: &ResourceObject) -> Result<Vec<ResourceObject>, StoreError> {
        self.record();
        Ok(self
            .events
            .iter()
            .filter(|event| event.str_field(&["involvedObject", "uid"]) == target.uid())
            .cloned()
            .collect())
    }

    async fn node_stats_summary(&self, _node: &str) -> Result<Value, StoreError> {
        self.record();
        Err(StoreError::Unavailable("no kubelet here".to_string()))
    }

    fn watch(
        &self,
        mapping: &ApiResourceMapping,
        _query: &ListQuery,
        _resource_version: &str,
        feed: &mut ChangeFeed,
    ) -> Result<(), StoreError> {
        self.record();
        let tx = feed
            .sender()
            .ok_or_else(|| StoreError::Watch("feed is sealed".to_string()))?;

        let replay: Vec<Scripted> = {
            let mut script = self.script.lock().unwrap();
            let (mine, rest) = script.drain(..).partition(|item| match item {
                Scripted::Change(change) => change.object.kind() == mapping.kind,
                Scripted::Fail(_) => true,
            });
            *script = rest;
            mine
        };

        let hold_open = self.hold_open;
        feed.attach(tokio::spawn(async move {
            for item in replay {
                let result = match item {
                    Scripted::Change(change) => Ok(change),
                    Scripted::Fail(message) => Err(StoreError::Watch(message)),
                };
                if tx.send(result).is_err() {
                    return;
                }
            }
            if hold_open {
                std::future::pending::<()>().await;
            }
        }));
        Ok(())
    }

    fn is_local(&self) -> bool {
        false
    }
}

pub fn object(value: Value) -> ResourceObject {
    ResourceObject::from_value(value).unwrap()
}

pub fn pod(name: &str, created: &str, labels: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("uid-{}", name),
            "creationTimestamp": created,
            "labels": labels
        },
        "spec": {"nodeName": "node-1"},
        "status": {
            "phase": "Running",
            "conditions": [{"type": "Ready", "status": "True"}],
            "containerStatuses": [{
                "name": "app",
                "ready": true,
                "restartCount": 0,
                "state": {"running": {"startedAt": created}}
            }]
        }
    })
}

pub fn service(name: &str, selector: Value) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("uid-{}", name),
            "creationTimestamp": "2024-01-01T00:00:00Z"
        },
        "spec": {
            "type": "ClusterIP",
            "clusterIP": "10.0.0.10",
            "selector": selector,
            "ports": [{"name": "http", "port": 80, "protocol": "TCP", "targetPort": 8080}]
        }
    })
}

/// Endpoints with one ready address per `(ip, pod)`
pub fn endpoints(name: &str, ready: &[(&str, &str)]) -> Value {
    let addresses: Vec<Value> = ready
        .iter()
        .map(|(ip, pod)| json!({"ip": ip, "targetRef": {"kind": "Pod", "name": pod}}))
        .collect();
    let subsets = if addresses.is_empty() {
        json!([])
    } else {
        json!([{"addresses": addresses, "ports": [{"name": "http", "port": 8080}]}])
    };
    json!({
        "apiVersion": "v1",
        "kind": "Endpoints",
        "metadata": {"name": name, "namespace": "default"},
        "subsets": subsets
    })
}

pub fn replica_set(name: &str, owner: &str, revision: &str, created: &str, image: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "ReplicaSet",
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("uid-{}", name),
            "creationTimestamp": created,
            "generation": 3,
            "resourceVersion": "42",
            "labels": {"app": "web", "pod-template-hash": format!("hash-{}", revision)},
            "annotations": {"deployment.kubernetes.io/revision": revision},
            "ownerReferences": [{
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "name": owner,
                "uid": format!("uid-{}", owner),
                "controller": true
            }]
        },
        "spec": {
            "replicas": 2,
            "selector": {"matchLabels": {"app": "web", "pod-template-hash": format!("hash-{}", revision)}},
            "template": {
                "metadata": {"labels": {"app": "web", "pod-template-hash": format!("hash-{}", revision)}},
                "spec": {"containers": [{"name": "app", "image": image}]}
            }
        },
        "status": {"replicas": 2, "readyReplicas": 2}
    })
}

pub fn deployment(name: &str) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": "default",
            "uid": format!("uid-{}", name),
            "creationTimestamp": "2024-01-01T00:00:00Z",
            "generation": 2
        },
        "spec": {
            "replicas": 2,
            "strategy": {"type": "RollingUpdate"},
            "selector": {"matchLabels": {"app": "web"}},
            "template": {
                "metadata": {"labels": {"app": "web"}},
                "spec": {"containers": [{"name": "app", "image": "web:2"}]}
            }
        },
        "status": {"observedGeneration": 2, "replicas": 2, "readyReplicas": 2, "updatedReplicas": 2, "availableReplicas": 2}
    })
}

pub fn warning_event(name: &str, involved_uid: &str, reason: &str, last: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Event",
        "metadata": {"name": name, "namespace": "default"},
        "involvedObject": {"uid": involved_uid},
        "type": "Warning",
        "reason": reason,
        "message": format!("{} happened", reason),
        "lastTimestamp": last,
        "count": 3
    })
}
