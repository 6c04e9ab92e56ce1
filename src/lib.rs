//! kubestatus
//!
//! Human-readable status views of Kubernetes objects. Objects come from a
//! cluster or from local manifests, are correlated with their owners, events
//! and network neighbours, and rendered through per-kind templates.
//!
//! The `kubectl-status` binary is a thin shell over [`session::Session`].

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod kube;
pub mod models;
pub mod relations;
pub mod render;
pub mod repository;
pub mod resolver;
pub mod session;
pub mod status;
pub mod watcher;

pub use error::{ErrorAggregate, StatusError, StoreError};
pub use models::{ApiResourceMapping, ObjectCollection, ResourceObject};
pub use session::{QueryTarget, Session};
