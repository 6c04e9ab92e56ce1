//! Traversal planner
//!
//! Decides, per object and enabled include flag, which correlation lookups to
//! run and builds the [`RenderNode`] tree templates read from. Identities are
//! recorded in the session's [`RenderedSet`] as nodes are planned, so an object
//! reachable twice (an ownership cycle, a service shared by two pods) is
//! expanded once and becomes a placeholder afterwards.

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use tracing::Level;

use super::dedup::RenderedSet;
use super::node::{Includes, RenderNode};
use crate::config::IncludeFlags;
use crate::diff::DiffEngine;
use crate::models::{ObjectCollection, ResourceObject};
use crate::relations::RelationshipResolver;
use crate::repository::ObjectRepository;

/// Kinds whose pod template labels select services
const WORKLOAD_KINDS: &[&str] = &["Deployment", "ReplicaSet", "StatefulSet", "DaemonSet"];

pub struct Planner<'a> {
    repo: &'a ObjectRepository,
    includes: IncludeFlags,
    max_depth: usize,
    rendered: &'a mut RenderedSet,
}

impl<'a> Planner<'a> {
    pub fn new(
        repo: &'a ObjectRepository,
        includes: IncludeFlags,
        max_depth: usize,
        rendered: &'a mut RenderedSet,
    ) -> Self {
        Self {
            repo,
            includes,
            max_depth,
            rendered,
        }
    }

    /// Plan one top-level object
    pub async fn plan(&mut self, object: ResourceObject) -> RenderNode {
        self.plan_at(object, 0).await
    }

    fn plan_at(&mut self, object: ResourceObject, depth: usize) -> BoxFuture<'_, RenderNode> {
        Box::pin(async move {
            if !self.rendered.check_add(object.identity()) {
                tracing::debug!("{} already planned, using placeholder", object);
                return RenderNode::placeholder(object);
            }
            let includes = if depth < self.max_depth {
                self.gather(&object, depth).await
            } else {
                Includes::default()
            };
            RenderNode::new(object, includes)
        })
    }

    async fn plan_all(&mut self, objects: ObjectCollection, depth: usize) -> Vec<RenderNode> {
        let mut nodes = Vec::with_capacity(objects.len());
        for object in objects {
            nodes.push(self.plan_at(object, depth + 1).await);
        }
        nodes
    }

    async fn gather(&mut self, object: &ResourceObject, depth: usize) -> Includes {
        let repo = self.repo;
        let relations = RelationshipResolver::new(repo);
        let namespace = object.namespace().unwrap_or_default();
        let mut includes = Includes::default();

        if self.includes.owners {
            let owners = relations.owners(object).await;
            includes.owners = self.plan_all(owners, depth).await;
        }

        if self.includes.events {
            match repo.events(object).await {
                Ok(events) => {
                    includes.events = events.into_iter().map(ResourceObject::into_value).collect()
                }
                Err(e) => {
                    lookup_failed("Events", object, &e, e.is_not_found());
                }
            }
        }

        if self.includes.matching_services {
            let services = match object.kind() {
                "Pod" => Some(relations.services_matching_pod(namespace, object.name()).await),
                kind if WORKLOAD_KINDS.contains(&kind) => {
                    let labels = template_labels(object);
                    Some(relations.services_matching_labels(namespace, &labels).await)
                }
                _ => None,
            };
            match services {
                Some(Ok(services)) => includes.services = self.plan_all(services, depth).await,
                Some(Err(e)) => {
                    lookup_failed("Matching services", object, &e, e.is_not_found());
                }
                None => {}
            }
        }

        if object.kind() == "Service" {
            if self.includes.matching_ingresses {
                match relations
                    .ingresses_matching_service(namespace, object.name())
                    .await
                {
                    Ok(ingresses) => includes.ingresses = self.plan_all(ingresses, depth).await,
                    Err(e) => {
                        lookup_failed("Ingresses", object, &e, e.is_not_found());
                    }
                }
            }
            if self.includes.any() {
                match relations.endpoint_for_service(object).await {
                    Ok(endpoint) => includes.endpoint = Some(endpoint.into_value()),
                    Err(e) => {
                        lookup_failed("Endpoints", object, &e, e.is_not_found());
                    }
                }
            }
        }

        if self.includes.any() {
            match object.kind() {
                "Ingress" => {
                    includes.backend_issues = relations.ingress_backend_issues(object).await
                }
                "Node" => includes.node_aggregate = repo.node_aggregate(object.name()).await,
                "Pod" => includes.pod_metrics = repo.pod_metrics(object).await,
                _ => {}
            }
        }

        if self.includes.rollout_diffs {
            match DiffEngine::new(repo).rollout_diff(object).await {
                Ok(diff) => includes.rollout_diff = diff.filter(|d| !d.is_empty()),
                Err(e) => {
                    lookup_failed("Rollout diff", object, &e, e.is_not_found());
                }
            }
        }

        includes
    }
}

/// A missing correlation target is routine; any other failure is worth a warning
fn lookup_failed(
    lookup: &str,
    object: &ResourceObject,
    error: &dyn std::fmt::Display,
    not_found: bool,
) -> Level {
    if not_found {
        tracing::debug!("{} of {} not found: {}", lookup, object, error);
        Level::DEBUG
    } else {
        tracing::warn!("{} of {} unavailable: {}", lookup, object, error);
        Level::WARN
    }
}

fn template_labels(object: &ResourceObject) -> BTreeMap<String, String> {
    object.string_map(&["spec", "template", "metadata", "labels"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::kube::store::MockObjectStore;
    use crate::resolver::{Resolver, TypeCatalog};
    use crate::status::Health;
    use serde_json::json;
    use std::sync::Arc;

    fn config_map(name: &str, owner: &str) -> ResourceObject {
        ResourceObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": name,
                "namespace": "default",
                "uid": format!("uid-{}", name),
                "ownerReferences": [{
                    "apiVersion": "v1",
                    "kind": "ConfigMap",
                    "name": owner,
                    "uid": format!("uid-{}", owner)
                }]
            }
        }))
        .unwrap()
    }

    fn repo(store: MockObjectStore) -> ObjectRepository {
        ObjectRepository::new(Arc::new(store), Resolver::new(TypeCatalog::builtin()))
    }

    fn owners_only() -> IncludeFlags {
        IncludeFlags {
            owners: true,
            ..IncludeFlags::none()
        }
    }

    #[tokio::test]
    async fn test_ownership_cycle_expands_each_object_once() {
        let mut store = MockObjectStore::new();
        store.expect_get().returning(|_, _, name| match name {
            "a" => Ok(config_map("a", "b")),
            "b" => Ok(config_map("b", "a")),
            other => Err(StoreError::NotFound {
                resource: "configmaps".to_string(),
                name: other.to_string(),
            }),
        });
        let repo = repo(store);
        let mut rendered = RenderedSet::new(true);

        let mut planner = Planner::new(&repo, owners_only(), 4, &mut rendered);
        let a = planner.plan(config_map("a", "b")).await;
        let b = planner.plan(config_map("b", "a")).await;

        assert!(!a.already_printed);
        assert_eq!(a.includes.owners.len(), 1);
        let nested_b = &a.includes.owners[0];
        assert!(!nested_b.already_printed);
        assert_eq!(nested_b.includes.owners.len(), 1);
        assert!(nested_b.includes.owners[0].already_printed);
        assert!(b.already_printed);
    }

    #[tokio::test]
    async fn test_depth_limit_without_dedup() {
        let mut store = MockObjectStore::new();
        store.expect_get().returning(|_, _, name| match name {
            "a" => Ok(config_map("a", "b")),
            _ => Ok(config_map("b", "a")),
        });
        let repo = repo(store);
        let mut rendered = RenderedSet::new(false);

        let node = Planner::new(&repo, owners_only(), 2, &mut rendered)
            .plan(config_map("a", "b"))
            .await;

        let level1 = &node.includes.owners[0];
        let level2 = &level1.includes.owners[0];
        assert!(!level2.already_printed);
        assert!(level2.includes.owners.is_empty());
    }

    #[tokio::test]
    async fn test_no_includes_means_no_lookups() {
        // any store call would panic on a mock without expectations
        let repo = repo(MockObjectStore::new());
        let mut rendered = RenderedSet::new(true);
        let node = Planner::new(&repo, IncludeFlags::none(), 4, &mut rendered)
            .plan(config_map("a", "b"))
            .await;
        assert!(node.includes.owners.is_empty());
        assert!(node.includes.events.is_empty());
    }

    #[tokio::test]
    async fn test_workloads_carry_computed_and_rollout_status() {
        let repo = repo(MockObjectStore::new());
        let mut rendered = RenderedSet::new(true);
        let mut planner = Planner::new(&repo, IncludeFlags::none(), 4, &mut rendered);

        let deployment = ResourceObject::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "namespace": "default", "uid": "uid-web", "generation": 3},
            "spec": {"replicas": 3},
            "status": {
                "observedGeneration": 3,
                "replicas": 3,
                "updatedReplicas": 1,
                "readyReplicas": 3,
                "availableReplicas": 3
            }
        }))
        .unwrap();
        let node = planner.plan(deployment).await;
        assert_eq!(node.computed_status.status, Health::InProgress);
        assert_eq!(node.computed_status.message, "Updated: 1/3");
        let rollout = node.rollout_status.unwrap();
        assert!(!rollout.done);
        assert_eq!(
            rollout.message,
            "Waiting for deployment \"web\" rollout to finish: 1 out of 3 new replicas have been updated..."
        );

        let stateful_set = ResourceObject::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": {"name": "db", "namespace": "default", "uid": "uid-db", "generation": 1},
            "spec": {"replicas": 2},
            "status": {
                "observedGeneration": 1,
                "replicas": 2,
                "readyReplicas": 2,
                "currentReplicas": 2,
                "updatedReplicas": 2,
                "currentRevision": "db-5",
                "updateRevision": "db-5"
            }
        }))
        .unwrap();
        let node = planner.plan(stateful_set).await;
        assert_eq!(node.computed_status.status, Health::Current);
        let rollout = node.rollout_status.unwrap();
        assert!(rollout.done);
        assert_eq!(
            rollout.message,
            "statefulset rolling update complete 2 pods at revision db-5..."
        );

        let config = planner.plan(config_map("cm", "nobody")).await;
        assert_eq!(config.computed_status.status, Health::Current);
        assert!(config.rollout_status.is_none());
    }

    #[tokio::test]
    async fn test_pod_metrics_gathered_with_includes() {
        let mut store = MockObjectStore::new();
        store.expect_events().returning(|_| Ok(Vec::new()));
        store.expect_get().returning(|mapping, namespace, name| {
            assert_eq!(mapping.kind, "PodMetrics");
            assert_eq!(namespace, "default");
            ResourceObject::from_value(json!({
                "apiVersion": "metrics.k8s.io/v1beta1",
                "kind": "PodMetrics",
                "metadata": {"name": name, "namespace": namespace},
                "containers": [{"name": "app", "usage": {"cpu": "5m", "memory": "20Mi"}}]
            }))
        });
        let repo = repo(store);
        let mut rendered = RenderedSet::new(true);
        let includes = IncludeFlags {
            events: true,
            ..IncludeFlags::none()
        };

        let pod = ResourceObject::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": {"name": "web-1", "namespace": "default", "uid": "uid-web-1"},
            "status": {"phase": "Pending"}
        }))
        .unwrap();
        let node = Planner::new(&repo, includes, 4, &mut rendered)
            .plan(pod)
            .await;
        let metrics = node.includes.pod_metrics.unwrap();
        assert_eq!(metrics["containers"][0]["usage"]["cpu"], "5m");
    }

    #[test]
    fn test_only_unexpected_lookup_failures_warn() {
        let object = config_map("a", "b");
        let missing = StoreError::NotFound {
            resource: "endpoints".to_string(),
            name: "a".to_string(),
        };
        let level = lookup_failed("Endpoints", &object, &missing, missing.is_not_found());
        assert_eq!(level, Level::DEBUG);

        let forbidden = StoreError::Unavailable("forbidden".to_string());
        let level = lookup_failed("Endpoints", &object, &forbidden, forbidden.is_not_found());
        assert_eq!(level, Level::WARN);
    }
}
