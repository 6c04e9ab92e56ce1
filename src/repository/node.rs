//! Node-level aggregate data

use serde::Serialize;
use serde_json::Value;

use super::ObjectRepository;
use crate::kube::ListQuery;
use crate::models::ResourceObject;

const NODE_LEASE_NAMESPACE: &str = "kube-node-lease";

/// Runtime view of one node; every part is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregate {
    /// Kubelet `/stats/summary` document
    pub stats_summary: Option<Value>,
    /// `NodeMetrics` from metrics-server
    pub node_metrics: Option<Value>,
    /// Pods on the node that are neither Succeeded nor Failed
    pub pods: Vec<Value>,
    pub lease: Option<Value>,
}

impl NodeAggregate {
    pub(super) async fn fetch(repo: &ObjectRepository, node: &str) -> Option<Self> {
        let store = repo.store();

        let stats_summary = match store.node_stats_summary(node).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::debug!("Stats summary of node {} unavailable: {}", node, e);
                None
            }
        };

        let node_metrics = repo.metrics("nodes", "", node).await;

        let pod_query = ListQuery::all_namespaces().fields(format!(
            "spec.nodeName={},status.phase!=Succeeded,status.phase!=Failed",
            node
        ));
        let pods = match repo.list("pods", &pod_query).await {
            Ok(pods) => pods.into_iter().map(ResourceObject::into_value).collect(),
            Err(e) => {
                tracing::debug!("Pods of node {} unavailable: {}", node, e);
                Vec::new()
            }
        };

        let lease = match repo.get("leases", NODE_LEASE_NAMESPACE, node).await {
            Ok(lease) => Some(lease.into_value()),
            Err(e) => {
                tracing::debug!("Lease of node {} unavailable: {}", node, e);
                None
            }
        };

        let aggregate = Self {
            stats_summary,
            node_metrics,
            pods,
            lease,
        };
        if aggregate == Self::default() {
            None
        } else {
            Some(aggregate)
        }
    }
}
