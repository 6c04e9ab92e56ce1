//! Configuration file schema
//!
//! Every field is optional in the file; missing keys take the built-in
//! defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root of `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Default include flags, overridden by `--shallow`, `--deep` and `--include-*`
    #[serde(default)]
    pub include: IncludeConfig,

    /// How many levels of correlated objects are pulled in below a rendered object
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Directory whose `*.tmpl` files replace or add per-kind templates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

/// Correlation lookups enabled unless the command line says otherwise
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncludeConfig {
    #[serde(default = "default_true")]
    pub owners: bool,

    #[serde(default = "default_true")]
    pub events: bool,

    #[serde(default = "default_true")]
    pub matching_services: bool,

    #[serde(default = "default_true")]
    pub matching_ingresses: bool,

    #[serde(default = "default_false")]
    pub rollout_diffs: bool,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

pub(crate) fn default_max_depth() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include: IncludeConfig::default(),
            max_depth: default_max_depth(),
            templates_dir: None,
        }
    }
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            owners: default_true(),
            events: default_true(),
            matching_services: default_true(),
            matching_ingresses: default_true(),
            rollout_diffs: default_false(),
        }
    }
}
