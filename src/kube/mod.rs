//! Kubernetes access
//!
//! - `store.rs` - the `ObjectStore` trait every fetch goes through
//! - `live.rs` - API server backed store
//! - `local.rs` - store over parsed manifest files
//! - `manifest.rs` - multi-document / `kind: List` manifest parsing
//!
//! Supports HTTP/HTTPS proxy configuration via the standard environment
//! variables (`HTTP_PROXY`, `HTTPS_PROXY`, `NO_PROXY`) through kube-rs.

pub mod live;
pub mod local;
pub mod manifest;
pub mod store;

pub use live::KubeStore;
pub use local::ManifestStore;
pub use store::{ListQuery, ObjectStore};

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};

/// Connected client plus the namespace it defaults to
pub struct ClusterConnection {
    pub client: Client,
    pub default_namespace: String,
}

/// Initialize a Kubernetes client
///
/// Without a context, uses the default kubeconfig loading strategy:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
///
/// With a context, loads that context from the kubeconfig.
pub async fn create_client(context: Option<&str>) -> Result<ClusterConnection> {
    let config = match context {
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.to_string()),
                ..KubeConfigOptions::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context {}", context))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration")?,
    };

    tracing::debug!(
        "Connecting to {} (default namespace {})",
        config.cluster_url,
        config.default_namespace
    );

    let default_namespace = config.default_namespace.clone();
    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok(ClusterConnection {
        client,
        default_namespace,
    })
}
