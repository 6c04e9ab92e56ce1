//! Service, endpoints, pod and ingress correlation

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::{into_store_error, namespace_query};
use crate::error::StoreError;
use crate::models::{ObjectCollection, ResourceObject};
use crate::repository::ObjectRepository;

/// Whether a service's selector picks an object with `labels`
///
/// The selector must be a non-empty subset of `labels`. ExternalName services
/// and services without a selector never match.
pub fn service_matches_labels(
    service: &ResourceObject,
    labels: &BTreeMap<String, String>,
) -> bool {
    if service.str_field(&["spec", "type"]) == Some("ExternalName") {
        return false;
    }
    let selector = service.string_map(&["spec", "selector"]);
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

pub(super) async fn services_matching_labels(
    repo: &ObjectRepository,
    namespace: &str,
    labels: &BTreeMap<String, String>,
) -> Result<ObjectCollection, StoreError> {
    let services = repo
        .list("services", &namespace_query(Some(namespace)))
        .await
        .map_err(into_store_error)?;
    Ok(services
        .into_iter()
        .filter(|svc| service_matches_labels(svc, labels))
        .collect())
}

/// Whether an endpoints object has an address targeting `pod_name`
fn endpoint_targets_pod(endpoint: &ResourceObject, pod_name: &str) -> bool {
    let Some(subsets) = endpoint.field(&["subsets"]).and_then(|s| s.as_array()) else {
        return false;
    };
    subsets
        .iter()
        .flat_map(|subset| {
            ["addresses", "notReadyAddresses"]
                .into_iter()
                .filter_map(move |key| subset.get(key).and_then(|a| a.as_array()))
                .flatten()
        })
        .any(|address| {
            let target = address.get("targetRef");
            let field = |key: &str| target.and_then(|t| t.get(key)).and_then(|v| v.as_str());
            field("kind") == Some("Pod") && field("name") == Some(pod_name)
        })
}

pub(super) async fn services_matching_pod(
    repo: &ObjectRepository,
    namespace: &str,
    pod_name: &str,
) -> Result<ObjectCollection, StoreError> {
    let endpoints = repo
        .list("endpoints", &namespace_query(Some(namespace)))
        .await
        .map_err(into_store_error)?;

    let mut services = Vec::new();
    for endpoint in endpoints.iter().filter(|ep| endpoint_targets_pod(ep, pod_name)) {
        match repo.get("services", namespace, endpoint.name()).await {
            Ok(service) => services.push(service),
            Err(e) => tracing::debug!("Service for endpoints {} unavailable: {}", endpoint, e),
        }
    }
    Ok(ObjectCollection::new(services))
}

/// `spec.rules[].http.paths[].backend.service` entries of an ingress
fn service_backends(ingress: &ResourceObject) -> Vec<&Value> {
    ingress
        .field(&["spec", "rules"])
        .and_then(|r| r.as_array())
        .into_iter()
        .flatten()
        .filter_map(|rule| rule.get("http"))
        .filter_map(|http| http.get("paths").and_then(|p| p.as_array()))
        .flatten()
        .filter_map(|path| path.get("backend").and_then(|b| b.get("service")))
        .collect()
}

pub(super) async fn ingresses_matching_service(
    repo: &ObjectRepository,
    namespace: &str,
    service_name: &str,
) -> Result<ObjectCollection, StoreError> {
    let ingresses = repo
        .list("ingresses", &namespace_query(Some(namespace)))
        .await
        .map_err(into_store_error)?;
    Ok(ingresses
        .into_iter()
        .filter(|ing| {
            service_backends(ing)
                .iter()
                .any(|backend| backend.get("name").and_then(|n| n.as_str()) == Some(service_name))
        })
        .collect())
}

/// Why an ingress backend cannot serve traffic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendIssue {
    pub service_name: String,
    /// Port number or name as written in the ingress
    pub port: Option<String>,
    /// `serviceMissing`, `serviceWithPortMismatch` or `serviceWithNoReadyAddresses`
    pub issue: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum BackendPort {
    Number(i64),
    Name(String),
    Unset,
}

impl BackendPort {
    fn from_backend(backend: &Value) -> Self {
        let port = backend.get("port");
        if let Some(number) = port.and_then(|p| p.get("number")).and_then(|n| n.as_i64()) {
            BackendPort::Number(number)
        } else if let Some(name) = port.and_then(|p| p.get("name")).and_then(|n| n.as_str()) {
            BackendPort::Name(name.to_string())
        } else {
            BackendPort::Unset
        }
    }

    fn label(&self) -> Option<String> {
        match self {
            BackendPort::Number(n) => Some(n.to_string()),
            BackendPort::Name(name) => Some(name.clone()),
            BackendPort::Unset => None,
        }
    }

    fn exposed_by(&self, service: &ResourceObject) -> bool {
        let ports = service
            .field(&["spec", "ports"])
            .and_then(|p| p.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        match self {
            BackendPort::Number(n) => ports
                .iter()
                .any(|p| p.get("port").and_then(|v| v.as_i64()) == Some(*n)),
            BackendPort::Name(name) => ports
                .iter()
                .any(|p| p.get("name").and_then(|v| v.as_str()) == Some(name)),
            BackendPort::Unset => true,
        }
    }
}

/// Whether an endpoints object has at least one ready address in every subset
pub fn has_ready_addresses(endpoint: &ResourceObject) -> bool {
    match endpoint.field(&["subsets"]).and_then(|s| s.as_array()) {
        Some(subsets) if !subsets.is_empty() => subsets.iter().all(|subset| {
            subset
                .get("addresses")
                .and_then(|a| a.as_array())
                .is_some_and(|a| !a.is_empty())
        }),
        _ => false,
    }
}

pub(super) async fn ingress_backend_issues(
    repo: &ObjectRepository,
    ingress: &ResourceObject,
) -> Vec<BackendIssue> {
    let namespace = ingress.namespace().unwrap_or_default();

    let mut backends: Vec<(String, BackendPort)> = service_backends(ingress)
        .into_iter()
        .filter_map(|backend| {
            let name = backend.get("name").and_then(|n| n.as_str())?;
            Some((name.to_string(), BackendPort::from_backend(backend)))
        })
        .collect();
    backends.sort();
    backends.dedup();

    let mut issues = Vec::new();
    for (service_name, port) in backends {
        let issue = |issue: &'static str| BackendIssue {
            service_name: service_name.clone(),
            port: port.label(),
            issue,
        };

        let service = match repo.get("services", namespace, &service_name).await {
            Ok(service) => service,
            Err(e) if e.is_not_found() => {
                issues.push(issue("serviceMissing"));
                continue;
            }
            Err(e) => {
                tracing::debug!(
                    "Backend service {} of {} unavailable: {}",
                    service_name,
                    ingress,
                    e
                );
                continue;
            }
        };

        if !port.exposed_by(&service) {
            issues.push(issue("serviceWithPortMismatch"));
            continue;
        }

        let ready = match repo.get("endpoints", namespace, &service_name).await {
            Ok(endpoint) => has_ready_addresses(&endpoint),
            Err(e) => {
                tracing::debug!("Endpoints of {} unavailable: {}", service_name, e);
                false
            }
        };
        if !ready {
            issues.push(issue("serviceWithNoReadyAddresses"));
        }
    }
    issues
}
