//! Reference resolution
//!
//! Turns loosely specified references (`po`, `deploy.v1.apps`,
//! `Deployment.apps`) into a concrete `ApiResourceMapping`. Resolution only
//! consults the catalog it was built with, so the same reference always
//! resolves to the same mapping within a session.

pub mod catalog;
pub mod reference;

pub use catalog::{CatalogEntry, TypeCatalog};

use crate::error::StatusError;
use crate::models::ApiResourceMapping;
use reference::{parse_kind_arg, parse_resource_arg};

#[derive(Debug, Clone)]
pub struct Resolver {
    catalog: TypeCatalog,
}

impl Resolver {
    pub fn new(catalog: TypeCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Resolve a reference, first match wins:
    ///
    /// 1. `resource.version.group` as an exact triple
    /// 2. the bare resource name (with its group, any version)
    /// 3. `Kind.version.group`, then the kind and group at any version
    ///
    /// On failure the error names the resource token, not a parse error.
    pub fn resolve(&self, reference: &str) -> Result<ApiResourceMapping, StatusError> {
        let (fully_specified, group_resource) = parse_resource_arg(reference);

        if let Some(gvr) = &fully_specified {
            if let Some(mapping) =
                self.catalog
                    .kind_for(&gvr.resource, &gvr.group, Some(&gvr.version))
            {
                return Ok(mapping.clone());
            }
        }

        if let Some(mapping) =
            self.catalog
                .kind_for(&group_resource.resource, &group_resource.group, None)
        {
            return Ok(mapping.clone());
        }

        let (gvk, group_kind) = parse_kind_arg(reference);
        if let Some(gvk) = &gvk {
            let found = self
                .catalog
                .mapping_for_kind(&gvk.kind, &gvk.group, Some(&gvk.version))
                .or_else(|| self.catalog.mapping_for_kind(&gvk.kind, &gvk.group, None));
            if let Some(mapping) = found {
                return Ok(mapping.clone());
            }
        }
        if let Some(mapping) =
            self.catalog
                .mapping_for_kind(&group_kind.kind, &group_kind.group, None)
        {
            return Ok(mapping.clone());
        }

        tracing::debug!("No resource type matches reference {}", reference);
        Err(StatusError::ReferenceResolution {
            resource: group_resource.resource,
        })
    }

    /// Resolve a kind in an exact group, preferring `version`
    ///
    /// `group` of `None` accepts any group.
    pub fn resolve_kind(
        &self,
        kind: &str,
        group: Option<&str>,
        version: Option<&str>,
    ) -> Option<ApiResourceMapping> {
        let candidates = self.catalog.entries().iter().filter(|e| {
            e.mapping.kind.eq_ignore_ascii_case(kind)
                && group.is_none_or(|g| e.mapping.group == g)
        });
        let mut fallback = None;
        for entry in candidates {
            if version.is_none_or(|v| entry.mapping.version == v) {
                return Some(entry.mapping.clone());
            }
            fallback.get_or_insert_with(|| entry.mapping.clone());
        }
        fallback
    }
}
