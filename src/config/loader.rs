//! Configuration loading
//!
//! Precedence, highest first: environment overrides, the config file,
//! built-in defaults. Command-line flags are applied later by
//! [`RenderOptions`](super::RenderOptions).
//!
//! The config file is `$KUBESTATUS_CONFIG` when set. Otherwise the first of
//! these that exists:
//! - `config.yaml` in the platform config dir (`~/.config/kubestatus` on Linux)
//! - `~/.kube/kubestatus.yaml`, next to the kubeconfig

use super::schema::Config;
use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_ENV: &str = "KUBESTATUS_CONFIG";
pub const TEMPLATES_DIR_ENV: &str = "KUBESTATUS_TEMPLATES_DIR";
pub const MAX_DEPTH_ENV: &str = "KUBESTATUS_MAX_DEPTH";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then the root config file if present, then the environment
    ///
    /// A config file that exists but cannot be read or parsed is an error.
    /// An explicit `$KUBESTATUS_CONFIG` must exist.
    pub fn load() -> Result<Config> {
        let config = match std::env::var_os(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
            Some(path) => Self::load_file(Path::new(&path))?,
            None => {
                let candidates = Self::default_locations();
                match Self::find_existing(&candidates) {
                    Some(path) => Self::load_file(path)?,
                    None => {
                        tracing::debug!("No config file in {:?}", candidates);
                        Config::default()
                    }
                }
            }
        };
        Ok(Self::apply_env_overrides(config))
    }

    /// Where a config file is looked for, in order
    pub fn default_locations() -> Vec<PathBuf> {
        let mut locations = Vec::new();
        if let Some(dirs) = ProjectDirs::from("", "", "kubestatus") {
            locations.push(dirs.config_dir().join("config.yaml"));
        }
        if let Some(dirs) = BaseDirs::new() {
            locations.push(dirs.home_dir().join(".kube").join("kubestatus.yaml"));
        }
        locations
    }

    fn find_existing(candidates: &[PathBuf]) -> Option<&Path> {
        candidates
            .iter()
            .find(|path| path.is_file())
            .map(PathBuf::as_path)
    }

    pub fn load_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn apply_env_overrides(mut config: Config) -> Config {
        if let Ok(dir) = std::env::var(TEMPLATES_DIR_ENV) {
            if !dir.is_empty() {
                config.templates_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(depth) = std::env::var(MAX_DEPTH_ENV) {
            match depth.parse::<usize>() {
                Ok(depth) => config.max_depth = depth,
                Err(_) => tracing::warn!("Ignoring {}={}: not a number", MAX_DEPTH_ENV, depth),
            }
        }

        config
    }
}
