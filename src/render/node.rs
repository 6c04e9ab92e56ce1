//! Pre-fetched render tree
//!
//! A `RenderNode` carries one object plus everything its template may show
//! about related objects. Templates only read from it.

use serde::Serialize;
use serde_json::Value;

use crate::models::ResourceObject;
use crate::relations::BackendIssue;
use crate::repository::NodeAggregate;
use crate::status::{self, ComputedStatus, RolloutStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    /// `Kind/name[namespace]`
    pub display_name: String,
    /// Rendered earlier in the session; shown as a one-line placeholder
    pub already_printed: bool,
    pub object: Value,
    /// Health derived from the object alone
    pub computed_status: ComputedStatus,
    /// Progress of a Deployment, DaemonSet or StatefulSet rollout
    pub rollout_status: Option<RolloutStatus>,
    #[serde(flatten)]
    pub includes: Includes,
}

/// Correlated data gathered by the planner
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Includes {
    pub owners: Vec<RenderNode>,
    pub events: Vec<Value>,
    pub services: Vec<RenderNode>,
    pub ingresses: Vec<RenderNode>,
    pub endpoint: Option<Value>,
    pub rollout_diff: Option<String>,
    pub node_aggregate: Option<NodeAggregate>,
    /// metrics.k8s.io usage of a pod
    pub pod_metrics: Option<Value>,
    pub backend_issues: Vec<BackendIssue>,
}

impl RenderNode {
    pub fn new(object: ResourceObject, includes: Includes) -> Self {
        Self {
            kind: object.kind().to_string(),
            name: object.name().to_string(),
            namespace: object.namespace().map(str::to_string),
            display_name: object.display_name(),
            already_printed: false,
            computed_status: status::compute(&object),
            rollout_status: status::rollout_status(&object),
            object: object.into_value(),
            includes,
        }
    }

    pub fn placeholder(object: ResourceObject) -> Self {
        Self {
            already_printed: true,
            ..Self::new(object, Includes::default())
        }
    }

    /// Text shown instead of a repeated object
    pub fn placeholder_line(&self) -> String {
        format!("{} is already printed", self.display_name)
    }
}
