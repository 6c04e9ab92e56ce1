//! Object repository
//!
//! Pairs an `ObjectStore` with the session's `Resolver` so callers can work
//! with references (`deploy`, `pods.v1`) instead of mappings, and adds the
//! narrow aggregate queries templates need.

mod node;

pub use node::NodeAggregate;

use serde_json::Value;
use std::sync::Arc;

use crate::error::{StatusError, StoreError};
use crate::kube::{ListQuery, ObjectStore};
use crate::models::{ApiResourceMapping, ObjectCollection, ResourceObject};
use crate::resolver::Resolver;
use crate::resolver::catalog::{METRICS_GROUP, METRICS_VERSION};

#[derive(Clone)]
pub struct ObjectRepository {
    store: Arc<dyn ObjectStore>,
    resolver: Resolver,
}

impl ObjectRepository {
    pub fn new(store: Arc<dyn ObjectStore>, resolver: Resolver) -> Self {
        Self { store, resolver }
    }

    /// Build the resolver from the store's catalog
    pub async fn connect(store: Arc<dyn ObjectStore>) -> Result<Self, StoreError> {
        let catalog = store.catalog().await?;
        Ok(Self::new(store, Resolver::new(catalog)))
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    pub fn is_local(&self) -> bool {
        self.store.is_local()
    }

    pub fn resolve(&self, reference: &str) -> Result<ApiResourceMapping, StatusError> {
        self.resolver.resolve(reference)
    }

    /// List a referenced type, ordered by creation time
    pub async fn list(
        &self,
        reference: &str,
        query: &ListQuery,
    ) -> Result<ObjectCollection, StatusError> {
        let mapping = self.resolve(reference)?;
        self.store
            .list(&mapping, query)
            .await
            .map_err(|e| StatusError::fetch(mapping.resource.clone(), e))
    }

    pub async fn get(
        &self,
        reference: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, StatusError> {
        let mapping = self.resolve(reference)?;
        self.store
            .get(&mapping, namespace, name)
            .await
            .map_err(|e| StatusError::fetch(format!("{}/{}", mapping.resource, name), e))
    }

    /// Events about `object`, oldest first
    pub async fn events(&self, object: &ResourceObject) -> Result<Vec<ResourceObject>, StoreError> {
        let mut events = self.store.events(object).await?;
        events.sort_by_key(|event| event_time(event).map(str::to_string));
        Ok(events)
    }

    /// Stats summary, metrics, running pods and lease of a node
    ///
    /// Each part is fetched independently; `None` when none is available.
    pub async fn node_aggregate(&self, node: &str) -> Option<NodeAggregate> {
        NodeAggregate::fetch(self, node).await
    }

    /// metrics-server usage of a pod
    pub async fn pod_metrics(&self, pod: &ResourceObject) -> Option<Value> {
        let namespace = pod.namespace().unwrap_or_default();
        self.metrics("pods", namespace, pod.name()).await
    }

    /// A `metrics.k8s.io` object; absent when metrics-server is not installed
    pub(crate) async fn metrics(
        &self,
        resource: &str,
        namespace: &str,
        name: &str,
    ) -> Option<Value> {
        let mapping = self
            .resolver
            .catalog()
            .kind_for(resource, METRICS_GROUP, Some(METRICS_VERSION))?;
        match self.store.get(mapping, namespace, name).await {
            Ok(metrics) => Some(metrics.into_value()),
            Err(e) => {
                tracing::debug!("{} {} unavailable: {}", mapping.kind, name, e);
                None
            }
        }
    }
}

/// Last time an event fired, falling back to older fields
fn event_time(event: &ResourceObject) -> Option<&str> {
    ["lastTimestamp", "eventTime", "firstTimestamp"]
        .into_iter()
        .find_map(|field| event.str_field(&[field]).filter(|ts| !ts.is_empty()))
        .or_else(|| event.str_field(&["metadata", "creationTimestamp"]))
}
