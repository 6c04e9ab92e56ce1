//! Fields that change on every revision without changing meaning

use serde_json::{Map, Value};

const METADATA_FIELDS: &[&str] = &[
    "name",
    "managedFields",
    "resourceVersion",
    "uid",
    "creationTimestamp",
    "generation",
    "selfLink",
];

const ANNOTATIONS: &[&str] = &[
    "deployment.kubernetes.io/revision",
    "deployment.kubernetes.io/revision-history",
    "deprecated.daemonset.template.generation",
    "kubectl.kubernetes.io/last-applied-configuration",
    "kapp.k14s.io/original",
];

const LABELS: &[&str] = &[
    "pod-template-hash",
    "controller.kubernetes.io/hash",
    "controller-revision-hash",
];

/// Remove noise fields from an object in place
///
/// Stripping twice gives the same result as stripping once.
pub fn strip_noise_fields(object: &mut Value) {
    let Some(root) = object.as_object_mut() else {
        return;
    };

    root.remove("status");
    root.remove("revision");

    if let Some(metadata) = root.get_mut("metadata").and_then(Value::as_object_mut) {
        for field in METADATA_FIELDS {
            metadata.remove(*field);
        }
        remove_keys(metadata, "annotations", ANNOTATIONS);
        remove_keys(metadata, "labels", LABELS);
    }

    if let Some(spec) = root.get_mut("spec").and_then(Value::as_object_mut) {
        spec.remove("replicas");
        if let Some(selector) = spec.get_mut("selector").and_then(Value::as_object_mut) {
            remove_keys(selector, "matchLabels", &["pod-template-hash"]);
        }
        if let Some(template_meta) = spec
            .get_mut("template")
            .and_then(|t| t.get_mut("metadata"))
            .and_then(Value::as_object_mut)
        {
            remove_keys(template_meta, "labels", &["pod-template-hash"]);
        }
    }
}

/// Remove `keys` from the map stored under `field`, dropping the map if it empties
fn remove_keys(parent: &mut Map<String, Value>, field: &str, keys: &[&str]) {
    let Some(map) = parent.get_mut(field).and_then(Value::as_object_mut) else {
        return;
    };
    for key in keys {
        map.remove(*key);
    }
    if map.is_empty() {
        parent.remove(field);
    }
}
