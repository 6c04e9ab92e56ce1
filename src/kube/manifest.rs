//! Manifest parsing
//!
//! A manifest file holds one or more YAML documents. Documents of a `*List`
//! kind (`List`, `PodList`, ...) are expanded into their `items`, recursively.
//! Empty documents are skipped.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::error::StoreError;
use crate::models::ResourceObject;

/// Parse manifest text; `source` names the input in error messages
pub fn parse_manifest(text: &str, source: &str) -> Result<Vec<ResourceObject>, StoreError> {
    let mut objects = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).map_err(|e| StoreError::ManifestParse {
            path: source.to_string(),
            source: e,
        })?;
        flatten_into(value, &mut objects)?;
    }
    Ok(objects)
}

/// Read and parse one manifest file
pub fn read_manifest(path: &Path) -> Result<Vec<ResourceObject>, StoreError> {
    let path_str = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| StoreError::ManifestRead {
        path: path_str.clone(),
        source: e,
    })?;
    let objects = parse_manifest(&text, &path_str)?;
    tracing::debug!("Read {} objects from {}", objects.len(), &path_str);
    Ok(objects)
}

fn flatten_into(value: Value, out: &mut Vec<ResourceObject>) -> Result<(), StoreError> {
    if value.is_null() {
        return Ok(());
    }

    let is_list = value
        .get("kind")
        .and_then(|k| k.as_str())
        .is_some_and(|kind| kind.ends_with("List"));

    match value {
        Value::Object(mut map) if is_list && map.get("items").is_some_and(Value::is_array) => {
            if let Some(Value::Array(items)) = map.remove("items") {
                for item in items {
                    flatten_into(item, out)?;
                }
            }
            Ok(())
        }
        other => {
            out.push(ResourceObject::from_value(other)?);
            Ok(())
        }
    }
}
