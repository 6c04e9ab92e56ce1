//! Resolved API resource types

use kube::discovery::ApiResource;
use std::fmt;

/// Concrete API resource a reference resolved to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiResourceMapping {
    /// API group, empty for the core group
    pub group: String,
    pub version: String,
    /// Plural resource name used in API paths (e.g. `deployments`)
    pub resource: String,
    pub kind: String,
    pub namespaced: bool,
}

impl ApiResourceMapping {
    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn to_api_resource(&self) -> ApiResource {
        ApiResource {
            group: self.group.clone(),
            version: self.version.clone(),
            api_version: self.api_version(),
            kind: self.kind.clone(),
            plural: self.resource.clone(),
        }
    }
}

impl fmt::Display for ApiResourceMapping {
    /// `resource.version.group`, or `resource.version` for the core group
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}.{}", self.resource, self.version)
        } else {
            write!(f, "{}.{}.{}", self.resource, self.version, self.group)
        }
    }
}
