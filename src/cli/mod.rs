//! Command-line surface
//!
//! Argument parsing and logging setup for the `kubectl-status` binary.

mod args;
mod logging;

pub use args::Args;
pub use logging::init_logging;
