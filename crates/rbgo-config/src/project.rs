//! Project configuration (rbgo.toml)

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compiler program used when none is configured
pub const DEFAULT_COMPILER: &str = "go";

/// Project configuration from rbgo.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Tree discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceSection>,

    /// Compiler invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    /// Watch mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch: Option<WatchSection>,
}

/// `[workspace]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceSection {
    /// Directory names skipped in addition to `.git` and `.idea`
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Extra project root patterns for vendored imports
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub package_roots: Vec<String>,
}

/// `[build]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    /// Compiler program (default: "go")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,

    /// Artifact directory relative to the workspace root (default: pkg/<os>_<arch>)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,

    /// Standard library trees (default: $GOROOT/src)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_roots: Option<Vec<PathBuf>>,
}

/// `[watch]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_batch: Option<usize>,

    /// Build everything once on start (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_build: Option<bool>,
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(build) = &self.build {
            if build.compiler.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(invalid("build.compiler", "compiler cannot be empty"));
            }
        }

        if let Some(watch) = &self.watch {
            if watch.max_batch == Some(0) {
                return Err(invalid("watch.max_batch", "must be at least 1"));
            }
        }

        if let Some(workspace) = &self.workspace {
            for name in &workspace.exclude {
                if name.is_empty() || name.contains('/') || name.contains('\\') {
                    return Err(invalid(
                        "workspace.exclude",
                        &format!("'{}' is not a directory name", name),
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn exclude(&self) -> &[String] {
        self.workspace
            .as_ref()
            .map(|w| w.exclude.as_slice())
            .unwrap_or_default()
    }

    pub fn package_roots(&self) -> &[String] {
        self.workspace
            .as_ref()
            .map(|w| w.package_roots.as_slice())
            .unwrap_or_default()
    }

    pub fn compiler(&self) -> &str {
        self.build
            .as_ref()
            .and_then(|b| b.compiler.as_deref())
            .unwrap_or(DEFAULT_COMPILER)
    }

    pub fn artifact_dir(&self) -> Option<&Path> {
        self.build.as_ref().and_then(|b| b.artifact_dir.as_deref())
    }

    pub fn search_roots(&self) -> Option<&[PathBuf]> {
        self.build.as_ref().and_then(|b| b.search_roots.as_deref())
    }

    // Watch settings stay unset here; the watcher owns their defaults.

    pub fn debounce_ms(&self) -> Option<u64> {
        self.watch.as_ref().and_then(|w| w.debounce_ms)
    }

    pub fn max_batch(&self) -> Option<usize> {
        self.watch.as_ref().and_then(|w| w.max_batch)
    }

    pub fn initial_build(&self) -> Option<bool> {
        self.watch.as_ref().and_then(|w| w.initial_build)
    }

    pub(crate) fn build_mut(&mut self) -> &mut BuildSection {
        self.build.get_or_insert_with(BuildSection::default)
    }

    pub(crate) fn watch_mut(&mut self) -> &mut WatchSection {
        self.watch.get_or_insert_with(WatchSection::default)
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
