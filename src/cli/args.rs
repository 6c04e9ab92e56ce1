//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, IncludeOverrides, RenderOptions};

/// Show the status of Kubernetes objects in a human-friendly form
#[derive(Parser, Debug, Default)]
#[command(name = "kubectl-status", version)]
#[command(about = "Show the status of Kubernetes objects in a human-friendly form", long_about = None)]
pub struct Args {
    /// TYPE[,TYPE...] [NAME...] or TYPE/NAME...
    pub resources: Vec<String>,

    /// Namespace to query, defaults to the kube config's namespace
    #[arg(long, short = 'n')]
    pub namespace: Option<String>,

    /// Query across all namespaces
    #[arg(long, short = 'A')]
    pub all_namespaces: bool,

    /// Manifest file(s) to show, or whose live objects to show
    #[arg(long, short = 'f')]
    pub filename: Vec<PathBuf>,

    /// Label selector (e.g. app=web,tier!=cache)
    #[arg(long, short = 'l')]
    pub selector: Option<String>,

    /// Field selector (e.g. status.phase=Running)
    #[arg(long)]
    pub field_selector: Option<String>,

    /// Render the files given with --filename without contacting a cluster
    #[arg(long)]
    pub local: bool,

    /// Keep rendering objects as they change
    #[arg(long, short = 'w')]
    pub watch: bool,

    /// Turn off every related-object lookup
    #[arg(long)]
    pub shallow: bool,

    /// Turn on every related-object lookup
    #[arg(long)]
    pub deep: bool,

    /// Show owners
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub include_owners: Option<bool>,

    /// Show events
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub include_events: Option<bool>,

    /// Show services selecting the object
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub include_matching_services: Option<bool>,

    /// Show ingresses routing to a service
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub include_matching_ingresses: Option<bool>,

    /// Show what changed in the latest rollout
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub include_rollout_diffs: Option<bool>,

    /// Kube config context to use
    #[arg(long)]
    pub context: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Layer these flags over the loaded configuration
    pub fn render_options(&self, config: Config) -> RenderOptions {
        RenderOptions {
            namespace: self.namespace.clone(),
            all_namespaces: self.all_namespaces,
            filenames: self.filename.clone(),
            label_selector: self.selector.clone(),
            field_selector: self.field_selector.clone(),
            local: self.local,
            watch: self.watch,
            shallow: self.shallow,
            deep: self.deep,
            overrides: IncludeOverrides {
                owners: self.include_owners,
                events: self.include_events,
                matching_services: self.include_matching_services,
                matching_ingresses: self.include_matching_ingresses,
                rollout_diffs: self.include_rollout_diffs,
            },
            config,
        }
    }
}
