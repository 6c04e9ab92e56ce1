//! Computed object health
//!
//! Reduces an object to one of a few states plus a short message, from its
//! generation bookkeeping, its standard conditions and a per-kind reading of
//! replica counts and phases. [`rollout`] answers the narrower question of
//! whether a workload rollout has finished.

pub mod rollout;

pub use rollout::{RolloutStatus, rollout_status};

use serde::Serialize;
use serde_json::Value;

use crate::models::ResourceObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Health {
    InProgress,
    Current,
    Failed,
    Terminating,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputedStatus {
    pub status: Health,
    pub message: String,
}

impl ComputedStatus {
    fn new(status: Health, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn in_progress(message: impl Into<String>) -> Self {
        Self::new(Health::InProgress, message)
    }

    fn current(message: impl Into<String>) -> Self {
        Self::new(Health::Current, message)
    }

    fn failed(message: impl Into<String>) -> Self {
        Self::new(Health::Failed, message)
    }
}

/// Health of any object
pub fn compute(object: &ResourceObject) -> ComputedStatus {
    if object
        .field(&["metadata", "deletionTimestamp"])
        .is_some_and(|ts| !ts.is_null())
    {
        return ComputedStatus::new(Health::Terminating, "Resource scheduled for deletion");
    }
    if let Some(status) = generic_status(object) {
        return status;
    }
    match object.kind() {
        "Deployment" => deployment_status(object),
        "StatefulSet" => stateful_set_status(object),
        "DaemonSet" => daemon_set_status(object),
        "ReplicaSet" => replica_set_status(object),
        "Pod" => pod_status(object),
        "Job" => job_status(object),
        "PersistentVolumeClaim" => pvc_status(object),
        "Service" => service_status(object),
        _ => ComputedStatus::current("Resource is current"),
    }
}

/// Unobserved generations and the `Reconciling`/`Stalled` conventions
fn generic_status(object: &ResourceObject) -> Option<ComputedStatus> {
    if let Some(observed) = object
        .field(&["status", "observedGeneration"])
        .and_then(Value::as_i64)
    {
        let generation = int(object, &["metadata", "generation"]);
        if observed != generation {
            return Some(ComputedStatus::in_progress(format!(
                "{} generation is {}, but latest observed generation is {}",
                object.kind(),
                generation,
                observed
            )));
        }
    }
    if let Some(c) = condition(object, "Reconciling").filter(|c| is_true(c)) {
        return Some(ComputedStatus::in_progress(condition_message(c, "Resource is reconciling")));
    }
    if let Some(c) = condition(object, "Stalled").filter(|c| is_true(c)) {
        return Some(ComputedStatus::failed(condition_message(c, "Resource is stalled")));
    }
    None
}

fn deployment_status(object: &ResourceObject) -> ComputedStatus {
    let spec_replicas = spec_replicas(object);
    let replicas = int(object, &["status", "replicas"]);
    let updated = int(object, &["status", "updatedReplicas"]);
    let ready = int(object, &["status", "readyReplicas"]);
    let available = int(object, &["status", "availableReplicas"]);

    let mut progressing = false;
    let mut available_condition = false;
    for c in conditions(object) {
        match c.get("type").and_then(Value::as_str) {
            Some("Progressing") => {
                let reason = c.get("reason").and_then(Value::as_str);
                if reason == Some("ProgressDeadlineExceeded") {
                    return ComputedStatus::failed("Progress deadline exceeded");
                }
                if is_true(c) && reason == Some("NewReplicaSetAvailable") {
                    progressing = true;
                }
            }
            Some("Available") if is_true(c) => available_condition = true,
            _ => {}
        }
    }

    if spec_replicas > replicas {
        return ComputedStatus::in_progress(format!("Replicas: {}/{}", replicas, spec_replicas));
    }
    if updated < spec_replicas {
        return ComputedStatus::in_progress(format!("Updated: {}/{}", updated, spec_replicas));
    }
    if replicas > spec_replicas {
        return ComputedStatus::in_progress(format!(
            "Pending termination: {}",
            replicas - spec_replicas
        ));
    }
    if available < spec_replicas {
        return ComputedStatus::in_progress(format!("Available: {}/{}", available, spec_replicas));
    }
    if ready < spec_replicas {
        return ComputedStatus::in_progress(format!("Ready: {}/{}", ready, spec_replicas));
    }
    if !progressing {
        return ComputedStatus::in_progress("ReplicaSet not Available");
    }
    if !available_condition {
        return ComputedStatus::in_progress("Deployment not Available");
    }
    ComputedStatus::current(format!("Deployment is available. Replicas: {}", replicas))
}

fn stateful_set_status(object: &ResourceObject) -> ComputedStatus {
    if object.str_field(&["spec", "updateStrategy", "type"]) == Some("OnDelete") {
        return ComputedStatus::current("StatefulSet is using the ondelete update strategy");
    }
    let spec_replicas = spec_replicas(object);
    let replicas = int(object, &["status", "replicas"]);
    let ready = int(object, &["status", "readyReplicas"]);
    let current = int(object, &["status", "currentReplicas"]);
    let updated = int(object, &["status", "updatedReplicas"]);

    if spec_replicas > replicas {
        return ComputedStatus::in_progress(format!("Replicas: {}/{}", replicas, spec_replicas));
    }
    if spec_replicas > ready {
        return ComputedStatus::in_progress(format!("Ready: {}/{}", ready, spec_replicas));
    }
    if replicas > spec_replicas {
        return ComputedStatus::in_progress(format!(
            "Pending termination: {}",
            replicas - spec_replicas
        ));
    }
    if let Some(partition) = object
        .field(&["spec", "updateStrategy", "rollingUpdate", "partition"])
        .and_then(Value::as_i64)
    {
        let expected = (spec_replicas - partition).max(0);
        if updated < expected {
            return ComputedStatus::in_progress(format!("updated: {}/{}", updated, expected));
        }
        return ComputedStatus::current(format!(
            "Partition rollout complete. updated: {}",
            updated
        ));
    }
    if spec_replicas > current {
        return ComputedStatus::in_progress(format!("current: {}/{}", current, spec_replicas));
    }
    if object.str_field(&["status", "currentRevision"])
        != object.str_field(&["status", "updateRevision"])
    {
        return ComputedStatus::in_progress("Waiting for updated revision to match current");
    }
    ComputedStatus::current(format!(
        "All replicas scheduled as expected. Replicas: {}",
        replicas
    ))
}

fn daemon_set_status(object: &ResourceObject) -> ComputedStatus {
    let desired = int(object, &["status", "desiredNumberScheduled"]);
    let checks = [
        ("Current", "currentNumberScheduled"),
        ("Updated", "updatedNumberScheduled"),
        ("Available", "numberAvailable"),
        ("Ready", "numberReady"),
    ];
    for (label, field) in checks {
        let count = int(object, &["status", field]);
        if desired > count {
            return ComputedStatus::in_progress(format!("{}: {}/{}", label, count, desired));
        }
    }
    ComputedStatus::current(format!(
        "All replicas scheduled as expected. Replicas: {}",
        desired
    ))
}

fn replica_set_status(object: &ResourceObject) -> ComputedStatus {
    if let Some(c) = condition(object, "ReplicaFailure").filter(|c| is_true(c)) {
        return ComputedStatus::in_progress(format!(
            "Replica Failure condition. Message: {}",
            condition_message(c, "")
        ));
    }
    let spec_replicas = spec_replicas(object);
    let checks = [
        ("Labelled", "fullyLabeledReplicas"),
        ("Available", "availableReplicas"),
        ("Ready", "readyReplicas"),
    ];
    for (label, field) in checks {
        let count = int(object, &["status", field]);
        if spec_replicas > count {
            return ComputedStatus::in_progress(format!("{}: {}/{}", label, count, spec_replicas));
        }
    }
    let replicas = int(object, &["status", "replicas"]);
    if replicas > spec_replicas {
        return ComputedStatus::in_progress(format!(
            "Pending termination: {}",
            replicas - spec_replicas
        ));
    }
    ComputedStatus::current(format!("ReplicaSet is available. Replicas: {}", replicas))
}

fn pod_status(object: &ResourceObject) -> ComputedStatus {
    match object.str_field(&["status", "phase"]) {
        Some("Succeeded") => ComputedStatus::current("Pod has completed successfully"),
        Some("Failed") => ComputedStatus::failed("Pod has completed, but not successfully"),
        Some("Running") => {
            if condition(object, "Ready").is_some_and(is_true) {
                ComputedStatus::current("Pod is Ready")
            } else if has_crash_looping_container(object) {
                ComputedStatus::failed("Pod has containers in CrashLoopBackOff")
            } else {
                ComputedStatus::in_progress("Pod is running but is not Ready")
            }
        }
        Some("Pending") => {
            let unschedulable = condition(object, "PodScheduled").is_some_and(|c| {
                c.get("status").and_then(Value::as_str) == Some("False")
                    && c.get("reason").and_then(Value::as_str) == Some("Unschedulable")
            });
            if unschedulable {
                ComputedStatus::failed("Pod could not be scheduled")
            } else {
                ComputedStatus::in_progress("Pod is in the Pending phase")
            }
        }
        Some(phase) if !phase.is_empty() => {
            ComputedStatus::new(Health::Unknown, format!("Pod phase is {}", phase))
        }
        _ => ComputedStatus::in_progress("Pod phase not available"),
    }
}

fn has_crash_looping_container(object: &ResourceObject) -> bool {
    ["initContainerStatuses", "containerStatuses"]
        .iter()
        .filter_map(|field| object.field(&["status", *field]).and_then(Value::as_array))
        .flatten()
        .any(|cs| {
            cs.pointer("/state/waiting/reason").and_then(Value::as_str) == Some("CrashLoopBackOff")
        })
}

fn job_status(object: &ResourceObject) -> ComputedStatus {
    let completions = object
        .field(&["spec", "completions"])
        .and_then(Value::as_i64)
        .unwrap_or(1);
    let succeeded = int(object, &["status", "succeeded"]);
    let failed = int(object, &["status", "failed"]);
    let active = int(object, &["status", "active"]);

    if condition(object, "Complete").is_some_and(is_true) {
        return ComputedStatus::current(format!(
            "Job Completed. succeeded: {}/{}",
            succeeded, completions
        ));
    }
    if condition(object, "Failed").is_some_and(is_true) {
        return ComputedStatus::failed(format!("Job Failed. failed: {}/{}", failed, completions));
    }
    ComputedStatus::in_progress(format!(
        "Job in progress. success:{}, active: {}, failed: {}",
        succeeded, active, failed
    ))
}

fn pvc_status(object: &ResourceObject) -> ComputedStatus {
    match object.str_field(&["status", "phase"]) {
        Some("Bound") => ComputedStatus::current("PVC is Bound"),
        phase => ComputedStatus::in_progress(format!(
            "PVC is not Bound. phase: {}",
            phase.unwrap_or_default()
        )),
    }
}

fn service_status(object: &ResourceObject) -> ComputedStatus {
    let pending_ip = object.str_field(&["spec", "type"]) == Some("LoadBalancer")
        && object
            .field(&["status", "loadBalancer", "ingress"])
            .and_then(Value::as_array)
            .is_none_or(|ingress| ingress.is_empty());
    if pending_ip {
        ComputedStatus::in_progress("Pending external IP")
    } else {
        ComputedStatus::current("Service is ready")
    }
}

/// `spec.replicas`, which the API server defaults to 1
fn spec_replicas(object: &ResourceObject) -> i64 {
    object
        .field(&["spec", "replicas"])
        .and_then(Value::as_i64)
        .unwrap_or(1)
}

fn int(object: &ResourceObject, path: &[&str]) -> i64 {
    object.field(path).and_then(Value::as_i64).unwrap_or(0)
}

fn conditions(object: &ResourceObject) -> &[Value] {
    object
        .field(&["status", "conditions"])
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn condition<'a>(object: &'a ResourceObject, condition_type: &str) -> Option<&'a Value> {
    conditions(object)
        .iter()
        .find(|c| c.get("type").and_then(Value::as_str) == Some(condition_type))
}

fn is_true(condition: &Value) -> bool {
    condition.get("status").and_then(Value::as_str) == Some("True")
}

fn condition_message(condition: &Value, fallback: &str) -> String {
    condition
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> ResourceObject {
        ResourceObject::from_value(value).unwrap()
    }

    fn deployment(status: Value) -> ResourceObject {
        object(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "generation": 4},
            "spec": {"replicas": 3},
            "status": status
        }))
    }

    fn available_conditions() -> Value {
        json!([
            {"type": "Progressing", "status": "True", "reason": "NewReplicaSetAvailable"},
            {"type": "Available", "status": "True"}
        ])
    }

    #[test]
    fn test_deployment_current() {
        let status = compute(&deployment(json!({
            "observedGeneration": 4,
            "replicas": 3, "updatedReplicas": 3, "readyReplicas": 3, "availableReplicas": 3,
            "conditions": available_conditions()
        })));
        assert_eq!(status.status, Health::Current);
        assert_eq!(status.message, "Deployment is available. Replicas: 3");
    }

    #[test]
    fn test_unobserved_generation() {
        let status = compute(&deployment(json!({"observedGeneration": 3})));
        assert_eq!(status.status, Health::InProgress);
        assert_eq!(
            status.message,
            "Deployment generation is 4, but latest observed generation is 3"
        );
    }

    #[test]
    fn test_deployment_updating_and_deadline() {
        let status = compute(&deployment(json!({
            "observedGeneration": 4,
            "replicas": 3, "updatedReplicas": 1,
            "conditions": available_conditions()
        })));
        assert_eq!(status, ComputedStatus::in_progress("Updated: 1/3"));

        let status = compute(&deployment(json!({
            "observedGeneration": 4,
            "conditions": [{"type": "Progressing", "status": "False", "reason": "ProgressDeadlineExceeded"}]
        })));
        assert_eq!(status.status, Health::Failed);
    }

    #[test]
    fn test_terminating_wins() {
        let status = compute(&object(json!({
            "kind": "ConfigMap",
            "metadata": {"name": "c", "deletionTimestamp": "2024-01-01T00:00:00Z"}
        })));
        assert_eq!(status.status, Health::Terminating);
    }

    #[test]
    fn test_stalled_condition_fails_any_kind() {
        let status = compute(&object(json!({
            "kind": "Widget",
            "metadata": {"name": "w"},
            "status": {"conditions": [{"type": "Stalled", "status": "True", "message": "no quota"}]}
        })));
        assert_eq!(status, ComputedStatus::failed("no quota"));
    }

    #[test]
    fn test_pod_phases() {
        let pod = |status: Value| object(json!({"kind": "Pod", "metadata": {"name": "p"}, "status": status}));

        assert_eq!(
            compute(&pod(json!({"phase": "Running", "conditions": [{"type": "Ready", "status": "True"}]}))).status,
            Health::Current
        );
        assert_eq!(
            compute(&pod(json!({
                "phase": "Running",
                "containerStatuses": [{"name": "app", "state": {"waiting": {"reason": "CrashLoopBackOff"}}}]
            }))),
            ComputedStatus::failed("Pod has containers in CrashLoopBackOff")
        );
        assert_eq!(
            compute(&pod(json!({
                "phase": "Pending",
                "conditions": [{"type": "PodScheduled", "status": "False", "reason": "Unschedulable"}]
            }))),
            ComputedStatus::failed("Pod could not be scheduled")
        );
        assert_eq!(compute(&pod(json!({"phase": "Succeeded"}))).status, Health::Current);
    }

    #[test]
    fn test_stateful_set_revisions() {
        let sts = |status: Value| {
            object(json!({
                "kind": "StatefulSet",
                "metadata": {"name": "db", "generation": 1},
                "spec": {"replicas": 2},
                "status": status
            }))
        };
        let rolling = compute(&sts(json!({
            "observedGeneration": 1, "replicas": 2, "readyReplicas": 2, "currentReplicas": 2,
            "currentRevision": "db-1", "updateRevision": "db-2"
        })));
        assert_eq!(
            rolling,
            ComputedStatus::in_progress("Waiting for updated revision to match current")
        );

        let settled = compute(&sts(json!({
            "observedGeneration": 1, "replicas": 2, "readyReplicas": 2, "currentReplicas": 2,
            "currentRevision": "db-2", "updateRevision": "db-2"
        })));
        assert_eq!(settled.status, Health::Current);
    }

    #[test]
    fn test_daemon_set_and_job() {
        let ds = object(json!({
            "kind": "DaemonSet",
            "metadata": {"name": "agent"},
            "status": {"desiredNumberScheduled": 3, "currentNumberScheduled": 3, "updatedNumberScheduled": 2}
        }));
        assert_eq!(compute(&ds), ComputedStatus::in_progress("Updated: 2/3"));

        let job = object(json!({
            "kind": "Job",
            "metadata": {"name": "migrate"},
            "status": {"succeeded": 1, "conditions": [{"type": "Complete", "status": "True"}]}
        }));
        assert_eq!(
            compute(&job),
            ComputedStatus::current("Job Completed. succeeded: 1/1")
        );
    }

    #[test]
    fn test_load_balancer_waits_for_address() {
        let service = object(json!({
            "kind": "Service",
            "metadata": {"name": "web"},
            "spec": {"type": "LoadBalancer"}
        }));
        assert_eq!(compute(&service), ComputedStatus::in_progress("Pending external IP"));
    }
}
