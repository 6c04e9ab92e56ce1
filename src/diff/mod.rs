//! Revision diffs
//!
//! Two objects of one type are reduced by [`strip_noise_fields`], serialized
//! to YAML and compared line by line. Rollout diffs pick the two revisions to
//! compare from a workload's owned ReplicaSets or ControllerRevisions.

mod noise;

pub use noise::strip_noise_fields;

use chrono::{DateTime, Utc};
use similar::TextDiff;
use thiserror::Error;

use crate::error::{StatusError, StoreError};
use crate::models::ResourceObject;
use crate::relations::RelationshipResolver;
use crate::render::functions::human_duration;
use crate::repository::ObjectRepository;

const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

#[derive(Debug, Error)]
pub enum DiffError {
    #[error(transparent)]
    Resolve(StatusError),

    #[error("fetching {resource} {name}")]
    Fetch {
        resource: String,
        name: String,
        #[source]
        source: StatusError,
    },

    #[error("listing revisions of {object}")]
    Revisions {
        object: String,
        #[source]
        source: StoreError,
    },

    #[error("serializing {object}")]
    Serialize {
        object: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl DiffError {
    pub fn is_not_found(&self) -> bool {
        match self {
            DiffError::Fetch { source, .. } => source.is_not_found(),
            DiffError::Revisions { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Canonical text of an object once noise fields are gone
fn canonical_text(object: &ResourceObject) -> Result<String, DiffError> {
    let mut value = object.as_value().clone();
    strip_noise_fields(&mut value);
    serde_yaml::to_string(&value).map_err(|source| DiffError::Serialize {
        object: object.display_name(),
        source,
    })
}

fn header(prefix: &str, object: &ResourceObject, now: DateTime<Utc>) -> String {
    let name = format!("{} {}/{}", prefix, object.kind(), object.name());
    match object.creation_timestamp() {
        Some(created) => format!(
            "{}\t{} ({} ago)",
            name,
            created.to_rfc3339(),
            human_duration(now - created)
        ),
        None => name,
    }
}

/// Unified diff of `a` against `b` with three lines of context
///
/// Empty when both sides serialize identically after stripping.
pub fn diff_objects(
    a: &ResourceObject,
    b: &ResourceObject,
    now: DateTime<Utc>,
) -> Result<String, DiffError> {
    let old = canonical_text(a)?;
    let new = canonical_text(b)?;
    if old == new {
        return Ok(String::new());
    }

    let old_header = header("a", a, now);
    let new_header = header("b", b, now);
    Ok(TextDiff::from_lines(&old, &new)
        .unified_diff()
        .context_radius(3)
        .header(&old_header, &new_header)
        .to_string())
}

pub struct DiffEngine<'a> {
    repo: &'a ObjectRepository,
}

impl<'a> DiffEngine<'a> {
    pub fn new(repo: &'a ObjectRepository) -> Self {
        Self { repo }
    }

    /// Diff two named objects of the referenced type
    pub async fn unified_diff(
        &self,
        reference: &str,
        namespace: &str,
        name_a: &str,
        name_b: &str,
    ) -> Result<String, DiffError> {
        let mapping = self.repo.resolve(reference).map_err(DiffError::Resolve)?;
        let a = self.fetch(&mapping.resource, namespace, name_a).await?;
        let b = self.fetch(&mapping.resource, namespace, name_b).await?;
        diff_objects(&a, &b, Utc::now())
    }

    async fn fetch(
        &self,
        resource: &str,
        namespace: &str,
        name: &str,
    ) -> Result<ResourceObject, DiffError> {
        self.repo
            .get(resource, namespace, name)
            .await
            .map_err(|source| DiffError::Fetch {
                resource: resource.to_string(),
                name: name.to_string(),
                source,
            })
    }

    /// Diff between the two latest revisions of a workload
    ///
    /// `None` for kinds without revisions or when fewer than two exist.
    pub async fn rollout_diff(
        &self,
        workload: &ResourceObject,
    ) -> Result<Option<String>, DiffError> {
        let namespace = workload.namespace().unwrap_or_default();
        match workload.kind() {
            "Deployment" => {
                let pair = self
                    .latest_owned(workload, "replicasets", |rs| {
                        rs.annotation(REVISION_ANNOTATION)
                            .and_then(|r| r.parse::<i64>().ok())
                    })
                    .await?;
                self.diff_pair(pair)
            }
            "DaemonSet" => {
                let pair = self
                    .latest_owned(workload, "controllerrevisions", |cr| {
                        cr.field(&["revision"]).and_then(|r| r.as_i64())
                    })
                    .await?;
                self.diff_pair(pair)
            }
            "StatefulSet" => {
                let current = workload.str_field(&["status", "currentRevision"]);
                let update = workload.str_field(&["status", "updateRevision"]);
                match (current, update) {
                    (Some(current), Some(update)) if current != update => self
                        .unified_diff("controllerrevisions", namespace, current, update)
                        .await
                        .map(Some),
                    _ => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// The two highest-revision objects of `candidate_type` owned by `workload`
    async fn latest_owned(
        &self,
        workload: &ResourceObject,
        candidate_type: &str,
        revision: impl Fn(&ResourceObject) -> Option<i64>,
    ) -> Result<Option<(ResourceObject, ResourceObject)>, DiffError> {
        let owned = RelationshipResolver::new(self.repo)
            .owned_by(workload, candidate_type)
            .await
            .map_err(|source| DiffError::Revisions {
                object: workload.display_name(),
                source,
            })?;

        let mut revisions: Vec<(i64, ResourceObject)> = owned
            .into_iter()
            .filter_map(|object| revision(&object).map(|r| (r, object)))
            .collect();
        revisions.sort_by_key(|(r, _)| *r);

        let newest = revisions.pop();
        let previous = revisions.pop();
        Ok(previous.zip(newest).map(|((_, old), (_, new))| (old, new)))
    }

    fn diff_pair(
        &self,
        pair: Option<(ResourceObject, ResourceObject)>,
    ) -> Result<Option<String>, DiffError> {
        match pair {
            Some((old, new)) => diff_objects(&old, &new, Utc::now()).map(Some),
            None => Ok(None),
        }
    }
}
