//! Error types
//!
//! `StoreError` covers failures of the object store (live cluster or local
//! manifests). `StatusError` is what a session reports to the user; per-object
//! errors are collected into an `ErrorAggregate` and printed at exit.

use std::fmt;

/// Failure reported by an `ObjectStore` implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    #[error(transparent)]
    Kube(#[from] kube::Error),

    #[error("{0}")]
    Unavailable(String),

    #[error("reading manifest {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing manifest {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("malformed object: {0}")]
    Malformed(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("watch stream error: {0}")]
    Watch(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Error surfaced by a status session
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The reference does not name any known resource type
    #[error("the server doesn't have a resource type \"{resource}\"")]
    ReferenceResolution { resource: String },

    #[error("{target}: {source}")]
    Fetch {
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("rendering {object}: {source}")]
    Render {
        object: String,
        #[source]
        source: minijinja::Error,
    },

    /// Mutually exclusive or incomplete options; fatal before any fetch
    #[error("{0}")]
    ConfigurationConflict(String),

    #[error("{}", no_resources_message(.namespace))]
    NoResourcesFound { namespace: Option<String> },

    #[error("watch terminated: {0}")]
    Watch(#[source] StoreError),

    #[error("writing output: {0}")]
    Output(#[from] std::io::Error),
}

impl StatusError {
    pub fn conflict(message: impl Into<String>) -> Self {
        StatusError::ConfigurationConflict(message.into())
    }

    pub fn fetch(target: impl Into<String>, source: StoreError) -> Self {
        StatusError::Fetch {
            target: target.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StatusError::Fetch { source, .. } if source.is_not_found())
    }
}

fn no_resources_message(namespace: &Option<String>) -> String {
    match namespace {
        Some(ns) => format!("No resources found in {} namespace.", ns),
        None => "No resources found.".to_string(),
    }
}

/// Errors collected across a whole invocation
#[derive(Debug, Default)]
pub struct ErrorAggregate {
    errors: Vec<StatusError>,
}

impl ErrorAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: StatusError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ErrorAggregate) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[StatusError] {
        &self.errors
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> Result<(), ErrorAggregate> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<StatusError> for ErrorAggregate {
    fn from(error: StatusError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ErrorAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorAggregate {}
