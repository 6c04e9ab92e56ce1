//! Configuration
//!
//! A YAML file supplies defaults for include flags, traversal depth and a
//! template override directory; [`RenderOptions`] layers the command line on
//! top of it.

pub mod loader;
mod options;
pub mod schema;

pub use loader::ConfigLoader;
pub use options::{IncludeFlags, IncludeOverrides, RenderOptions};
pub use schema::{Config, IncludeConfig};
