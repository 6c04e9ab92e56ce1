//! Relationship resolution
//!
//! Correlation lookups built on the repository: owner chains, owned objects,
//! and the service / endpoints / pod / ingress network links. Failures here
//! are never fatal to the object being rendered; owner lookups log and skip,
//! the rest return a `StoreError` the caller logs and omits.

mod network;
mod owners;

pub use network::BackendIssue;

use crate::error::StoreError;
use crate::kube::ListQuery;
use crate::models::{ObjectCollection, ResourceObject};
use crate::repository::ObjectRepository;

pub struct RelationshipResolver<'a> {
    repo: &'a ObjectRepository,
}

impl<'a> RelationshipResolver<'a> {
    pub fn new(repo: &'a ObjectRepository) -> Self {
        Self { repo }
    }

    /// Objects listed in `object`'s owner references that could be fetched
    pub async fn owners(&self, object: &ResourceObject) -> ObjectCollection {
        owners::resolve_owners(self.repo, object).await
    }

    /// Objects of `candidate_type` in `object`'s namespace that it owns
    pub async fn owned_by(
        &self,
        object: &ResourceObject,
        candidate_type: &str,
    ) -> Result<ObjectCollection, StoreError> {
        let Some(uid) = object.uid() else {
            return Ok(ObjectCollection::default());
        };
        let query = namespace_query(object.namespace());
        let candidates = self
            .repo
            .list(candidate_type, &query)
            .await
            .map_err(into_store_error)?;
        Ok(candidates
            .into_iter()
            .filter(|candidate| candidate.is_owned_by(uid))
            .collect())
    }

    pub async fn services_matching_labels(
        &self,
        namespace: &str,
        labels: &std::collections::BTreeMap<String, String>,
    ) -> Result<ObjectCollection, StoreError> {
        network::services_matching_labels(self.repo, namespace, labels).await
    }

    pub async fn services_matching_pod(
        &self,
        namespace: &str,
        pod_name: &str,
    ) -> Result<ObjectCollection, StoreError> {
        network::services_matching_pod(self.repo, namespace, pod_name).await
    }

    pub async fn ingresses_matching_service(
        &self,
        namespace: &str,
        service_name: &str,
    ) -> Result<ObjectCollection, StoreError> {
        network::ingresses_matching_service(self.repo, namespace, service_name).await
    }

    /// Endpoints object named after a service
    pub async fn endpoint_for_service(
        &self,
        service: &ResourceObject,
    ) -> Result<ResourceObject, StoreError> {
        self.repo
            .get(
                "endpoints",
                service.namespace().unwrap_or_default(),
                service.name(),
            )
            .await
            .map_err(into_store_error)
    }

    /// Backends of an ingress that cannot serve traffic
    pub async fn ingress_backend_issues(&self, ingress: &ResourceObject) -> Vec<BackendIssue> {
        network::ingress_backend_issues(self.repo, ingress).await
    }
}

fn namespace_query(namespace: Option<&str>) -> ListQuery {
    match namespace {
        Some(ns) => ListQuery::in_namespace(ns),
        None => ListQuery::all_namespaces(),
    }
}

/// Unwrap the store error from a repository error
///
/// Resolution failures become `Unavailable`: the type is not served here.
fn into_store_error(error: crate::error::StatusError) -> StoreError {
    match error {
        crate::error::StatusError::Fetch { source, .. } => source,
        other => StoreError::Unavailable(other.to_string()),
    }
}
