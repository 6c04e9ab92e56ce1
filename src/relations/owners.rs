//! Owner reference resolution

use crate::models::{ApiResourceMapping, ObjectCollection, OwnerReference, ResourceObject};
use crate::repository::ObjectRepository;
use crate::resolver::Resolver;
use crate::resolver::reference::parse_group_version;

/// Fetch every resolvable owner of `object`
///
/// An owner whose type cannot be resolved, that cannot be fetched, or whose
/// UID disagrees with the reference is logged and skipped.
pub(super) async fn resolve_owners(
    repo: &ObjectRepository,
    object: &ResourceObject,
) -> ObjectCollection {
    let namespace = object.namespace().unwrap_or_default();
    let mut owners = Vec::new();

    for owner in object.owner_references() {
        let Some(mapping) = owner_mapping(repo.resolver(), &owner) else {
            tracing::debug!(
                "Cannot resolve owner type {} ({}) of {}",
                owner.kind,
                owner.api_version,
                object
            );
            continue;
        };

        match repo.store().get(&mapping, namespace, &owner.name).await {
            Ok(found) => {
                if let (Some(expected), Some(actual)) = (owner.uid.as_deref(), found.uid()) {
                    if expected != actual {
                        tracing::warn!(
                            "Owner {} of {} has UID {}, reference expects {}",
                            found,
                            object,
                            actual,
                            expected
                        );
                        continue;
                    }
                }
                owners.push(found);
            }
            Err(e) => {
                tracing::debug!(
                    "Failed to fetch owner {}/{} of {}: {}",
                    owner.kind,
                    owner.name,
                    object,
                    e
                );
            }
        }
    }

    ObjectCollection::new(owners)
}

/// Resolve the type an owner reference points at
///
/// - unparsable `apiVersion`: the bare kind
/// - empty group with a non-core version (`apiVersion: apps`): `Kind.<version>`,
///   then the bare kind
/// - otherwise `Kind.version.group`
pub(super) fn owner_mapping(
    resolver: &Resolver,
    owner: &OwnerReference,
) -> Option<ApiResourceMapping> {
    match parse_group_version(&owner.api_version) {
        None => resolver.resolve(&owner.kind).ok(),
        Some((group, version)) if group.is_empty() && version != "v1" => resolver
            .resolve(&format!("{}.{}", owner.kind, version))
            .or_else(|_| resolver.resolve(&owner.kind))
            .ok(),
        Some((group, version)) => resolver
            .resolve(&format!("{}.{}.{}", owner.kind, version, group))
            .ok(),
    }
}
