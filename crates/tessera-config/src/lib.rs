//! Configuration for the terrain demo.
//!
//! Settings persist to disk as a RON file, every section falls back to its
//! defaults when missing, and command-line flags override loaded values.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{BoardConfig, Config, DebugConfig, TerrainConfig, WalkConfig};
pub use error::ConfigError;
