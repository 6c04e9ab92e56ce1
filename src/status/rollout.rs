//! Rollout progress of workloads
//!
//! Mirrors what `kubectl rollout status` prints for Deployments, DaemonSets
//! and StatefulSets, without waiting.

use serde::Serialize;
use serde_json::Value;

use crate::models::ResourceObject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolloutStatus {
    pub done: bool,
    pub message: String,
    /// Empty unless the rollout cannot make progress or has no status
    pub error: String,
}

impl RolloutStatus {
    fn waiting(message: impl Into<String>) -> Self {
        Self {
            done: false,
            message: message.into(),
            error: String::new(),
        }
    }

    fn done(message: impl Into<String>) -> Self {
        Self {
            done: true,
            message: message.into(),
            error: String::new(),
        }
    }

    fn error(done: bool, error: impl Into<String>) -> Self {
        Self {
            done,
            message: String::new(),
            error: error.into(),
        }
    }
}

/// `None` for kinds without a rollout
pub fn rollout_status(object: &ResourceObject) -> Option<RolloutStatus> {
    match object.kind() {
        "Deployment" => Some(deployment(object)),
        "DaemonSet" => Some(daemon_set(object)),
        "StatefulSet" => Some(stateful_set(object)),
        _ => None,
    }
}

fn deployment(object: &ResourceObject) -> RolloutStatus {
    let name = object.name();
    if generation(object) > observed_generation(object) {
        return RolloutStatus::waiting("Waiting for deployment spec update to be observed...");
    }

    let deadline_exceeded = conditions(object).iter().any(|c| {
        c.get("type").and_then(Value::as_str) == Some("Progressing")
            && c.get("reason").and_then(Value::as_str) == Some("ProgressDeadlineExceeded")
    });
    if deadline_exceeded {
        return RolloutStatus::error(
            false,
            format!("deployment {:?} exceeded its progress deadline", name),
        );
    }

    let replicas = int(object, &["status", "replicas"]);
    let updated = int(object, &["status", "updatedReplicas"]);
    let available = int(object, &["status", "availableReplicas"]);
    if let Some(desired) = spec_int(object, &["spec", "replicas"]).filter(|&d| updated < d) {
        return RolloutStatus::waiting(format!(
            "Waiting for deployment {:?} rollout to finish: {} out of {} new replicas have been updated...",
            name, updated, desired
        ));
    }
    if replicas > updated {
        return RolloutStatus::waiting(format!(
            "Waiting for deployment {:?} rollout to finish: {} old replicas are pending termination...",
            name,
            replicas - updated
        ));
    }
    if available < updated {
        return RolloutStatus::waiting(format!(
            "Waiting for deployment {:?} rollout to finish: {} of {} updated replicas are available...",
            name, available, updated
        ));
    }
    RolloutStatus::done(format!("deployment {:?} successfully rolled out", name))
}

fn daemon_set(object: &ResourceObject) -> RolloutStatus {
    if !uses_rolling_update(object) {
        return RolloutStatus::error(
            true,
            "rollout status is only available for RollingUpdate strategy type",
        );
    }
    let name = object.name();
    if generation(object) > observed_generation(object) {
        return RolloutStatus::waiting("Waiting for daemon set spec update to be observed...");
    }

    let desired = int(object, &["status", "desiredNumberScheduled"]);
    let updated = int(object, &["status", "updatedNumberScheduled"]);
    let available = int(object, &["status", "numberAvailable"]);
    if updated < desired {
        return RolloutStatus::waiting(format!(
            "Waiting for daemon set {:?} rollout to finish: {} out of {} new pods have been updated...",
            name, updated, desired
        ));
    }
    if available < desired {
        return RolloutStatus::waiting(format!(
            "Waiting for daemon set {:?} rollout to finish: {} of {} updated pods are available...",
            name, available, desired
        ));
    }
    RolloutStatus::done(format!("daemon set {:?} successfully rolled out", name))
}

fn stateful_set(object: &ResourceObject) -> RolloutStatus {
    if !uses_rolling_update(object) {
        return RolloutStatus::error(
            true,
            "rollout status is only available for RollingUpdate strategy type",
        );
    }
    let observed = observed_generation(object);
    if observed == 0 || generation(object) > observed {
        return RolloutStatus::waiting("Waiting for statefulset spec update to be observed...");
    }

    let desired = spec_int(object, &["spec", "replicas"]);
    let ready = int(object, &["status", "readyReplicas"]);
    let updated = int(object, &["status", "updatedReplicas"]);
    if let Some(desired) = desired.filter(|&d| ready < d) {
        return RolloutStatus::waiting(format!(
            "Waiting for {} pods to be ready...",
            desired - ready
        ));
    }

    if object
        .field(&["spec", "updateStrategy", "rollingUpdate"])
        .is_some_and(|r| !r.is_null())
    {
        let partition = spec_int(object, &["spec", "updateStrategy", "rollingUpdate", "partition"]);
        if let (Some(desired), Some(partition)) = (desired, partition) {
            if updated < desired - partition {
                return RolloutStatus::waiting(format!(
                    "Waiting for partitioned roll out to finish: {} out of {} new pods have been updated...",
                    updated,
                    desired - partition
                ));
            }
        }
        return RolloutStatus::done(format!(
            "partitioned roll out complete: {} new pods have been updated...",
            updated
        ));
    }

    let update_revision = object
        .str_field(&["status", "updateRevision"])
        .unwrap_or_default();
    let current_revision = object
        .str_field(&["status", "currentRevision"])
        .unwrap_or_default();
    if update_revision != current_revision {
        return RolloutStatus::waiting(format!(
            "waiting for statefulset rolling update to complete {} pods at revision {}...",
            updated, update_revision
        ));
    }
    RolloutStatus::done(format!(
        "statefulset rolling update complete {} pods at revision {}...",
        int(object, &["status", "currentReplicas"]),
        current_revision
    ))
}

/// Missing strategies are defaulted to `RollingUpdate` by the API server
fn uses_rolling_update(object: &ResourceObject) -> bool {
    object
        .str_field(&["spec", "updateStrategy", "type"])
        .is_none_or(|t| t == "RollingUpdate")
}

fn generation(object: &ResourceObject) -> i64 {
    int(object, &["metadata", "generation"])
}

fn observed_generation(object: &ResourceObject) -> i64 {
    int(object, &["status", "observedGeneration"])
}

fn spec_int(object: &ResourceObject, path: &[&str]) -> Option<i64> {
    object.field(path).and_then(Value::as_i64)
}

fn int(object: &ResourceObject, path: &[&str]) -> i64 {
    spec_int(object, path).unwrap_or(0)
}

fn conditions(object: &ResourceObject) -> &[Value] {
    object
        .field(&["status", "conditions"])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}
