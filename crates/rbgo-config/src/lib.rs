//! rbgo configuration
//!
//! Settings come from three places, later ones winning:
//! 1. Built-in defaults
//! 2. Project config (`rbgo.toml` at the workspace root)
//! 3. Environment variables (`RBGO_*`, `GOROOT`)
//!
//! Command line flags are applied on top by the caller.
//!
//! # Example
//!
//! ```no_run
//! use rbgo_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! println!("compiler: {}", config.project.compiler());
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "rbgo.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {}: {error}", file.display())]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader};
pub use project::{BuildSection, ProjectConfig, WatchSection, WorkspaceSection};
