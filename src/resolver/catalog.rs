//! Catalog of known API resource types
//!
//! The built-in catalog is generated from `k8s-openapi` types so that core
//! resources resolve without a round trip. Live sessions extend it with the
//! cluster's discovery document, which brings in custom resources.

use kube::discovery::{ApiCapabilities, ApiResource, Discovery, Scope};

use crate::models::ApiResourceMapping;

/// Group and version served by metrics-server
pub const METRICS_GROUP: &str = "metrics.k8s.io";
pub const METRICS_VERSION: &str = "v1beta1";

/// One resource type and the names it answers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub mapping: ApiResourceMapping,
    /// Lowercase singular name (`deployment`)
    pub singular: String,
    /// Short names (`deploy`)
    pub short_names: Vec<String>,
}

impl CatalogEntry {
    pub fn new(mapping: ApiResourceMapping, short_names: &[&str]) -> Self {
        Self {
            singular: mapping.kind.to_lowercase(),
            short_names: short_names.iter().map(|s| s.to_string()).collect(),
            mapping,
        }
    }

    pub fn from_discovery(api_resource: &ApiResource, capabilities: &ApiCapabilities) -> Self {
        Self::new(
            ApiResourceMapping {
                group: api_resource.group.clone(),
                version: api_resource.version.clone(),
                resource: api_resource.plural.clone(),
                kind: api_resource.kind.clone(),
                namespaced: capabilities.scope == Scope::Namespaced,
            },
            &[],
        )
    }

    /// Whether `name` is this entry's plural, singular or a short name
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.mapping.resource == name
            || self.singular == name
            || self.short_names.iter().any(|short| *short == name)
    }
}

/// Ordered set of resource types
///
/// Order is significant: when a name matches entries in several groups, the
/// first entry wins. Core types come first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeCatalog {
    entries: Vec<CatalogEntry>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry unless the same group/version/resource is already known
    pub fn insert(&mut self, entry: CatalogEntry) {
        let known = self.entries.iter().any(|e| {
            e.mapping.group == entry.mapping.group
                && e.mapping.version == entry.mapping.version
                && e.mapping.resource == entry.mapping.resource
        });
        if !known {
            self.entries.push(entry);
        }
    }

    /// Find the type served under a resource name
    ///
    /// An empty `group` matches any group; `version` of `None` matches any version.
    pub fn kind_for(
        &self,
        resource: &str,
        group: &str,
        version: Option<&str>,
    ) -> Option<&ApiResourceMapping> {
        self.entries
            .iter()
            .filter(|e| e.answers_to(resource))
            .filter(|e| group.is_empty() || e.mapping.group == group)
            .find(|e| version.is_none_or(|v| e.mapping.version == v))
            .map(|e| &e.mapping)
    }

    /// Find the type for a kind, compared case-insensitively
    pub fn mapping_for_kind(
        &self,
        kind: &str,
        group: &str,
        version: Option<&str>,
    ) -> Option<&ApiResourceMapping> {
        self.entries
            .iter()
            .filter(|e| e.mapping.kind.eq_ignore_ascii_case(kind))
            .filter(|e| group.is_empty() || e.mapping.group == group)
            .find(|e| version.is_none_or(|v| e.mapping.version == v))
            .map(|e| &e.mapping)
    }

    /// Catalog of built-in Kubernetes types
    pub fn builtin() -> Self {
        use k8s_openapi::api::{
            apps::v1::{ControllerRevision, DaemonSet, Deployment, ReplicaSet, StatefulSet},
            autoscaling::v2::HorizontalPodAutoscaler,
            batch::v1::{CronJob, Job},
            coordination::v1::Lease,
            core::v1::{
                ConfigMap, Endpoints, Event, LimitRange, Namespace, Node, PersistentVolume,
                PersistentVolumeClaim, Pod, ReplicationController, ResourceQuota, Secret, Service,
                ServiceAccount,
            },
            discovery::v1::EndpointSlice,
            networking::v1::{Ingress, IngressClass, NetworkPolicy},
            policy::v1::PodDisruptionBudget,
            rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
            storage::v1::StorageClass,
        };
        use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
        use kube::Resource;

        let mut catalog = TypeCatalog::new();

        // Type info comes from kube::Resource; scope is spelled out since it is
        // an associated type there.
        macro_rules! add_type {
            ($type:ty, $namespaced:expr, [$($short:expr),* $(,)?]) => {{
                let mapping = ApiResourceMapping {
                    group: <$type>::group(&()).to_string(),
                    version: <$type>::version(&()).to_string(),
                    resource: <$type>::plural(&()).to_string(),
                    kind: <$type>::kind(&()).to_string(),
                    namespaced: $namespaced,
                };
                catalog.insert(CatalogEntry::new(mapping, &[$($short),*]));
            }};
        }

        // Core (v1)
        add_type!(Pod, true, ["po"]);
        add_type!(Service, true, ["svc"]);
        add_type!(Endpoints, true, ["ep"]);
        add_type!(Node, false, ["no"]);
        add_type!(Namespace, false, ["ns"]);
        add_type!(ConfigMap, true, ["cm"]);
        add_type!(Secret, true, []);
        add_type!(ServiceAccount, true, ["sa"]);
        add_type!(PersistentVolumeClaim, true, ["pvc"]);
        add_type!(PersistentVolume, false, ["pv"]);
        add_type!(Event, true, ["ev"]);
        add_type!(ReplicationController, true, ["rc"]);
        add_type!(LimitRange, true, ["limits"]);
        add_type!(ResourceQuota, true, ["quota"]);

        // apps/v1
        add_type!(Deployment, true, ["deploy"]);
        add_type!(ReplicaSet, true, ["rs"]);
        add_type!(StatefulSet, true, ["sts"]);
        add_type!(DaemonSet, true, ["ds"]);
        add_type!(ControllerRevision, true, []);

        // batch/v1
        add_type!(Job, true, []);
        add_type!(CronJob, true, ["cj"]);

        add_type!(Ingress, true, ["ing"]);
        add_type!(IngressClass, false, []);
        add_type!(NetworkPolicy, true, ["netpol"]);
        add_type!(PodDisruptionBudget, true, ["pdb"]);
        add_type!(HorizontalPodAutoscaler, true, ["hpa"]);
        add_type!(EndpointSlice, true, []);
        add_type!(Lease, true, []);
        add_type!(StorageClass, false, ["sc"]);
        add_type!(Role, true, []);
        add_type!(RoleBinding, true, []);
        add_type!(ClusterRole, false, []);
        add_type!(ClusterRoleBinding, false, []);
        add_type!(CustomResourceDefinition, false, ["crd", "crds"]);

        // metrics.k8s.io has no typed models; listed after core so bare
        // `nodes`/`pods` keep meaning the core types
        for (resource, kind, namespaced) in [
            ("nodes", "NodeMetrics", false),
            ("pods", "PodMetrics", true),
        ] {
            let mapping = ApiResourceMapping {
                group: METRICS_GROUP.to_string(),
                version: METRICS_VERSION.to_string(),
                resource: resource.to_string(),
                kind: kind.to_string(),
                namespaced,
            };
            catalog.insert(CatalogEntry::new(mapping, &[]));
        }

        catalog
    }

    /// Built-in catalog extended with every served version of every discovered group
    pub async fn discover(client: &kube::Client) -> Result<Self, kube::Error> {
        let discovery = Discovery::new(client.clone()).run().await?;
        let mut catalog = Self::builtin();

        for group in discovery.groups() {
            // versions() lists the preferred stable version first
            for version in group.versions() {
                for (api_resource, capabilities) in group.versioned_resources(version) {
                    // Skip subresources (e.g., pods/log, pods/exec)
                    if api_resource.plural.contains('/') {
                        continue;
                    }
                    catalog.insert(CatalogEntry::from_discovery(&api_resource, &capabilities));
                }
            }
        }

        tracing::debug!("Discovered {} resource types", catalog.len());
        Ok(catalog)
    }
}
