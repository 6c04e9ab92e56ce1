//! Read-only view over one cluster object
//!
//! Objects are kept as plain JSON so that any kind, including custom
//! resources, flows through the same code. Accessors follow the usual
//! `metadata.*` layout and return empty values when a field is absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::StoreError;

/// One cluster object (`kind`, `apiVersion`, `metadata`, `spec`, `status`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceObject(Value);

impl ResourceObject {
    /// Wrap a JSON value, rejecting anything that is not a JSON object
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        if value.is_object() {
            Ok(Self(value))
        } else {
            Err(StoreError::Malformed(format!(
                "expected a mapping, found {}",
                json_type_name(&value)
            )))
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn kind(&self) -> &str {
        self.str_field(&["kind"]).unwrap_or_default()
    }

    pub fn api_version(&self) -> &str {
        self.str_field(&["apiVersion"]).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.str_field(&["metadata", "name"]).unwrap_or_default()
    }

    /// Namespace, `None` for cluster-scoped objects
    pub fn namespace(&self) -> Option<&str> {
        self.str_field(&["metadata", "namespace"])
            .filter(|ns| !ns.is_empty())
    }

    pub fn uid(&self) -> Option<&str> {
        self.str_field(&["metadata", "uid"]).filter(|uid| !uid.is_empty())
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.str_field(&["metadata", "resourceVersion"])
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        self.str_field(&["metadata", "creationTimestamp"])
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.string_map(&["metadata", "labels"])
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.0
            .get("metadata")
            .and_then(|m| m.get("annotations"))
            .and_then(|a| a.get(key))
            .and_then(|v| v.as_str())
    }

    pub fn owner_references(&self) -> Vec<OwnerReference> {
        self.0
            .get("metadata")
            .and_then(|m| m.get("ownerReferences"))
            .and_then(|refs| refs.as_array())
            .map(|refs| refs.iter().filter_map(OwnerReference::from_value).collect())
            .unwrap_or_default()
    }

    /// Whether any owner reference carries `uid`
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_references()
            .iter()
            .any(|owner| owner.uid.as_deref() == Some(uid))
    }

    /// Look up a nested field by path segments
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(&self.0, |value, segment| value.get(segment))
    }

    pub fn str_field(&self, path: &[&str]) -> Option<&str> {
        self.field(path).and_then(|v| v.as_str())
    }

    /// A nested `map[string]string`, skipping non-string values
    pub fn string_map(&self, path: &[&str]) -> BTreeMap<String, String> {
        self.field(path)
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set `kind`/`apiVersion` when the source omitted them (list items)
    pub fn with_type_meta(mut self, api_version: &str, kind: &str) -> Self {
        if let Some(map) = self.0.as_object_mut() {
            let missing = |v: Option<&Value>| v.and_then(|v| v.as_str()).is_none_or(str::is_empty);
            if missing(map.get("apiVersion")) {
                map.insert("apiVersion".to_string(), Value::from(api_version));
            }
            if missing(map.get("kind")) {
                map.insert("kind".to_string(), Value::from(kind));
            }
        }
        self
    }

    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity {
            namespace: self.namespace().unwrap_or_default().to_string(),
            name: self.name().to_string(),
            key: match self.uid() {
                Some(uid) => IdentityKey::Uid(uid.to_string()),
                None => IdentityKey::Kind(self.kind().to_string()),
            },
        }
    }

    /// `Kind/name[namespace]`, the namespace suffix only for namespaced objects
    pub fn display_name(&self) -> String {
        match self.namespace() {
            Some(ns) => format!("{}/{}[{}]", self.kind(), self.name(), ns),
            None => format!("{}/{}", self.kind(), self.name()),
        }
    }
}

impl fmt::Display for ResourceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Entry of `metadata.ownerReferences`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: Option<String>,
    pub controller: bool,
}

impl OwnerReference {
    fn from_value(value: &Value) -> Option<Self> {
        let get = |key: &str| value.get(key).and_then(|v| v.as_str());
        Some(Self {
            api_version: get("apiVersion").unwrap_or_default().to_string(),
            kind: get("kind")?.to_string(),
            name: get("name")?.to_string(),
            uid: get("uid").filter(|uid| !uid.is_empty()).map(String::from),
            controller: value
                .get("controller")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}

/// Identity used for de-duplication
///
/// (namespace, name, UID) when the object has a UID, else (namespace, name, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentity {
    namespace: String,
    name: String,
    key: IdentityKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Uid(String),
    Kind(String),
}
