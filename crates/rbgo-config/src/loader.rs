//! Configuration loader
//!
//! Reads `rbgo.toml` from the workspace root and applies environment overrides.

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use std::env;
use std::path::{Path, PathBuf};

/// Debounce override in milliseconds
pub const ENV_DEBOUNCE_MS: &str = "RBGO_DEBOUNCE_MS";

/// Compiler program override
pub const ENV_COMPILER: &str = "RBGO_COMPILER";

/// Go installation whose `src` tree resolves standard library imports
pub const ENV_GOROOT: &str = "GOROOT";

/// Configuration loader
///
/// Precedence, lowest first:
/// 1. Built-in defaults
/// 2. Project config (rbgo.toml)
/// 3. Environment variables
/// 4. CLI flags (handled by caller)
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

/// Merged configuration result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    /// Project configuration with overrides applied
    pub project: ProjectConfig,

    /// The rbgo.toml that was read, if any
    pub config_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration for the workspace rooted at `root`.
    ///
    /// A missing rbgo.toml is not an error; defaults are used instead.
    pub fn load_from_directory(&self, root: &Path) -> ConfigResult<Config> {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.is_file() {
            return self.load_from_file(&config_path);
        }
        Ok(Config {
            project: self.apply_env_overrides(ProjectConfig::default())?,
            config_file: None,
        })
    }

    /// Load configuration from an explicit file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        Ok(Config {
            project: self.apply_env_overrides(project)?,
            config_file: Some(config_path.to_path_buf()),
        })
    }

    /// Apply environment variable overrides to project config
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Some(value) = non_empty_var(ENV_DEBOUNCE_MS) {
            let debounce = value
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: ENV_DEBOUNCE_MS.to_string(),
                    reason: format!("'{}': {}", value, e),
                })?;
            config.watch_mut().debounce_ms = Some(debounce);
        }

        if let Some(compiler) = non_empty_var(ENV_COMPILER) {
            config.build_mut().compiler = Some(compiler);
        }

        // Explicit search roots in rbgo.toml win over GOROOT
        if config.search_roots().is_none() {
            if let Some(goroot) = non_empty_var(ENV_GOROOT) {
                config.build_mut().search_roots = Some(vec![PathBuf::from(goroot).join("src")]);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Whether the settings came from an rbgo.toml
    pub fn is_project(&self) -> bool {
        self.config_file.is_some()
    }
}
