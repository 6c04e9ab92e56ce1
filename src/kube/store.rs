//! Object store abstraction
//!
//! Everything the engine reads goes through `ObjectStore`. The live
//! implementation talks to the API server; the manifest implementation serves
//! parsed local files and answers correlation queries with nothing.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;
use crate::models::{ApiResourceMapping, ObjectCollection, ResourceObject};
use crate::resolver::TypeCatalog;
use crate::watcher::ChangeFeed;

/// Scope and selectors of a list or watch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// `None` lists across all namespaces; ignored for cluster-scoped types
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
}

impl ListQuery {
    pub fn all_namespaces() -> Self {
        Self::default()
    }

    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn labels(mut self, selector: impl Into<String>) -> Self {
        self.label_selector = Some(selector.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn fields(mut self, selector: impl Into<String>) -> Self {
        self.field_selector = Some(selector.into()).filter(|s: &String| !s.is_empty());
        self
    }
}

/// Read-only access to cluster objects
///
/// Every call may fail independently; callers decide whether a failure is
/// fatal for what they are doing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Types this store can serve
    async fn catalog(&self) -> Result<TypeCatalog, StoreError>;

    async fn list(
        &self,
        mapping: &ApiResourceMapping,
        query: &ListQuery,
    ) -> Result<ObjectCollection, StoreError>;

    /// Fetch one object; `namespace` is ignored for cluster-scoped types
    async fn get(
        &self,
        mapping: &ApiResourceMapping,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, StoreError>;

    /// Events whose involved object is `object`
    async fn events(&self, object: &ResourceObject) -> Result<Vec<ResourceObject>, StoreError>;

    /// Kubelet stats summary of a node
    async fn node_stats_summary(&self, node: &str) -> Result<Value, StoreError>;

    /// Start watching `mapping` from `resource_version`, feeding `feed`
    fn watch(
        &self,
        mapping: &ApiResourceMapping,
        query: &ListQuery,
        resource_version: &str,
        feed: &mut ChangeFeed,
    ) -> Result<(), StoreError>;

    /// Whether objects come from local manifests rather than a cluster
    fn is_local(&self) -> bool;
}
