//! Object store over local manifest files
//!
//! Serves only what the files contain. Queries that would need a cluster
//! (events, node stats) return nothing or `Unavailable` so rendering degrades
//! instead of failing.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;

use super::manifest::read_manifest;
use super::store::{ListQuery, ObjectStore};
use crate::error::StoreError;
use crate::models::{ApiResourceMapping, LabelSelector, ObjectCollection, ResourceObject};
use crate::resolver::TypeCatalog;
use crate::watcher::ChangeFeed;

#[derive(Debug, Clone, Default)]
pub struct ManifestStore {
    objects: ObjectCollection,
}

impl ManifestStore {
    /// Read every file, in the order given
    pub fn load(paths: &[PathBuf]) -> Result<Self, StoreError> {
        let mut objects = Vec::new();
        for path in paths {
            objects.extend(read_manifest(path)?);
        }
        Ok(Self::from_objects(objects))
    }

    pub fn from_objects(objects: Vec<ResourceObject>) -> Self {
        Self {
            objects: ObjectCollection::new(objects),
        }
    }

    /// Every document, in creation-time order
    pub fn objects(&self) -> &ObjectCollection {
        &self.objects
    }

    fn matches_type(object: &ResourceObject, mapping: &ApiResourceMapping) -> bool {
        object.kind() == mapping.kind
            && (object.api_version().is_empty()
                || object.api_version() == mapping.api_version()
                || object
                    .api_version()
                    .split_once('/')
                    .is_some_and(|(group, _)| group == mapping.group))
    }
}

#[async_trait]
impl ObjectStore for ManifestStore {
    async fn catalog(&self) -> Result<TypeCatalog, StoreError> {
        Ok(TypeCatalog::builtin())
    }

    async fn list(
        &self,
        mapping: &ApiResourceMapping,
        query: &ListQuery,
    ) -> Result<ObjectCollection, StoreError> {
        let selector: LabelSelector = query
            .label_selector
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(StoreError::Unavailable)?;

        Ok(self
            .objects
            .iter()
            .filter(|obj| Self::matches_type(obj, mapping))
            .filter(|obj| match (&query.namespace, obj.namespace()) {
                (Some(wanted), Some(ns)) if mapping.namespaced => wanted == ns,
                _ => true,
            })
            .filter(|obj| selector.matches(&obj.labels()))
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        mapping: &ApiResourceMapping,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, StoreError> {
        self.objects
            .iter()
            .find(|obj| {
                Self::matches_type(obj, mapping)
                    && obj.name() == name
                    && (namespace.is_empty()
                        || !mapping.namespaced
                        || obj.namespace().is_none_or(|ns| ns == namespace))
            })
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                resource: mapping.resource.clone(),
                name: name.to_string(),
            })
    }

    async fn events(&self, _object: &ResourceObject) -> Result<Vec<ResourceObject>, StoreError> {
        Ok(Vec::new())
    }

    async fn node_stats_summary(&self, _node: &str) -> Result<Value, StoreError> {
        Err(StoreError::Unavailable(
            "node stats are not available for local manifests".to_string(),
        ))
    }

    fn watch(
        &self,
        _mapping: &ApiResourceMapping,
        _query: &ListQuery,
        _resource_version: &str,
        _feed: &mut ChangeFeed,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(
            "local manifests cannot be watched".to_string(),
        ))
    }

    fn is_local(&self) -> bool {
        true
    }
}
