//! Per-invocation options
//!
//! Combines command-line flags with the loaded [`Config`] and checks the
//! combinations that must be rejected before anything is fetched.

use std::path::PathBuf;

use super::schema::{Config, IncludeConfig};
use crate::error::StatusError;

/// Correlation lookups performed for each rendered object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncludeFlags {
    pub owners: bool,
    pub events: bool,
    pub matching_services: bool,
    pub matching_ingresses: bool,
    pub rollout_diffs: bool,
}

impl IncludeFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            owners: true,
            events: true,
            matching_services: true,
            matching_ingresses: true,
            rollout_diffs: true,
        }
    }

    /// Whether any lookup is on; kind-specific extras (endpoints, node
    /// aggregates, ingress backends) follow this
    pub fn any(&self) -> bool {
        self.owners
            || self.events
            || self.matching_services
            || self.matching_ingresses
            || self.rollout_diffs
    }

    fn apply(mut self, overrides: &IncludeOverrides) -> Self {
        let pairs = [
            (&mut self.owners, overrides.owners),
            (&mut self.events, overrides.events),
            (&mut self.matching_services, overrides.matching_services),
            (&mut self.matching_ingresses, overrides.matching_ingresses),
            (&mut self.rollout_diffs, overrides.rollout_diffs),
        ];
        for (flag, value) in pairs {
            if let Some(value) = value {
                *flag = value;
            }
        }
        self
    }
}

impl From<&IncludeConfig> for IncludeFlags {
    fn from(config: &IncludeConfig) -> Self {
        Self {
            owners: config.owners,
            events: config.events,
            matching_services: config.matching_services,
            matching_ingresses: config.matching_ingresses,
            rollout_diffs: config.rollout_diffs,
        }
    }
}

/// `--include-*` values given explicitly on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncludeOverrides {
    pub owners: Option<bool>,
    pub events: Option<bool>,
    pub matching_services: Option<bool>,
    pub matching_ingresses: Option<bool>,
    pub rollout_diffs: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Namespace given with `--namespace`; the kube config default otherwise
    pub namespace: Option<String>,
    pub all_namespaces: bool,
    pub filenames: Vec<PathBuf>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
    pub local: bool,
    pub watch: bool,
    pub shallow: bool,
    pub deep: bool,
    pub overrides: IncludeOverrides,
    pub config: Config,
}

impl RenderOptions {
    /// Reject mutually exclusive or incomplete mode flags
    pub fn validate(&self) -> Result<(), StatusError> {
        if self.shallow && self.deep {
            return Err(StatusError::conflict(
                "--shallow and --deep are mutually exclusive",
            ));
        }
        if self.local && self.filenames.is_empty() {
            return Err(StatusError::conflict(
                "when using --local, --filename must be provided",
            ));
        }
        if self.local && self.watch {
            return Err(StatusError::conflict(
                "--watch cannot be used with --local",
            ));
        }
        Ok(())
    }

    /// Effective include flags
    ///
    /// Explicit `--include-*` values beat `--shallow`/`--deep`, which beat the
    /// config file. Local manifests have nothing to correlate with.
    pub fn includes(&self) -> IncludeFlags {
        if self.local {
            return IncludeFlags::none();
        }
        let base = if self.shallow {
            IncludeFlags::none()
        } else if self.deep {
            IncludeFlags::all()
        } else {
            IncludeFlags::from(&self.config.include)
        };
        base.apply(&self.overrides)
    }

    /// Whether already-rendered objects collapse into a placeholder
    pub fn dedup_enabled(&self) -> bool {
        !self.watch && !self.local
    }

    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }
}
