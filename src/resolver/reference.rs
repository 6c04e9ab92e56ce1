//! Parsing of user supplied resource references
//!
//! A reference is `resource[.version[.group]]` or the kind-first form
//! `Kind[.version[.group]]`. With two or more dots the second segment is the
//! version and the rest is the group; with one dot the rest is the group.

/// Fully specified `resource.version.group`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

/// `resource[.group]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

/// Split into (first, Some(second), rest) when there are at least two dots
fn split_qualified(arg: &str) -> Option<(&str, &str, &str)> {
    let (first, rest) = arg.split_once('.')?;
    let (second, group) = rest.split_once('.')?;
    Some((first, second, group))
}

fn split_grouped(arg: &str) -> (&str, &str) {
    arg.split_once('.').unwrap_or((arg, ""))
}

/// Parse as a resource reference
///
/// The fully qualified form is only returned for references with at least
/// two dots. The group-resource form is always returned.
pub fn parse_resource_arg(arg: &str) -> (Option<GroupVersionResource>, GroupResource) {
    let qualified = split_qualified(arg).map(|(resource, version, group)| GroupVersionResource {
        group: group.to_string(),
        version: version.to_string(),
        resource: resource.to_string(),
    });
    let (resource, group) = split_grouped(arg);
    (
        qualified,
        GroupResource {
            group: group.to_string(),
            resource: resource.to_string(),
        },
    )
}

/// Parse as a kind reference, same shape as `parse_resource_arg`
pub fn parse_kind_arg(arg: &str) -> (Option<GroupVersionKind>, GroupKind) {
    let qualified = split_qualified(arg).map(|(kind, version, group)| GroupVersionKind {
        group: group.to_string(),
        version: version.to_string(),
        kind: kind.to_string(),
    });
    let (kind, group) = split_grouped(arg);
    (
        qualified,
        GroupKind {
            group: group.to_string(),
            kind: kind.to_string(),
        },
    )
}

/// Split an `apiVersion` into (group, version)
///
/// `v1` is the core group. Returns `None` for empty strings or more than one `/`.
pub fn parse_group_version(api_version: &str) -> Option<(String, String)> {
    if api_version.is_empty() {
        return None;
    }
    match api_version.split_once('/') {
        None => Some((String::new(), api_version.to_string())),
        Some((group, version)) if !version.contains('/') && !version.is_empty() => {
            Some((group.to_string(), version.to_string()))
        }
        Some(_) => None,
    }
}
