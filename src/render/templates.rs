//! Built-in templates and the override directory

use anyhow::{Context, Result};
use std::path::Path;

/// Template used when no template is named after an object's kind
pub const DEFAULT_TEMPLATE: &str = "DefaultResource";

pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("_helpers", include_str!("../../templates/_helpers.tmpl")),
    (DEFAULT_TEMPLATE, include_str!("../../templates/DefaultResource.tmpl")),
    ("Pod", include_str!("../../templates/Pod.tmpl")),
    ("Deployment", include_str!("../../templates/Deployment.tmpl")),
    ("ReplicaSet", include_str!("../../templates/ReplicaSet.tmpl")),
    ("StatefulSet", include_str!("../../templates/StatefulSet.tmpl")),
    ("DaemonSet", include_str!("../../templates/DaemonSet.tmpl")),
    ("Job", include_str!("../../templates/Job.tmpl")),
    ("Service", include_str!("../../templates/Service.tmpl")),
    ("Ingress", include_str!("../../templates/Ingress.tmpl")),
    ("Node", include_str!("../../templates/Node.tmpl")),
];

/// `(name, source)` for every `*.tmpl` file in `dir`, named by file stem
pub fn read_template_dir(dir: &Path) -> Result<Vec<(String, String)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read templates directory: {}", dir.display()))?;

    let mut templates = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tmpl") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template: {}", path.display()))?;
        templates.push((name.to_string(), source));
    }
    templates.sort();
    Ok(templates)
}
