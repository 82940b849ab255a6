//! Subcommands and the setup they share

pub mod build;
pub mod list;
pub mod watch;

use anyhow::{Context, Result};
use rbgo_build::{GoCompiler, WatchConfig, Workspace, WorkspaceOptions};
use rbgo_config::{Config, ConfigLoader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Load rbgo.toml (explicit file or the workspace's own) with env overrides
pub fn load_config(root: &Path, config_file: Option<&Path>) -> Result<Config> {
    let loader = ConfigLoader::new();
    let config = match config_file {
        Some(file) => loader.load_from_file(file),
        None => loader.load_from_directory(root),
    }
    .context("Failed to load configuration")?;

    if let Some(file) = &config.config_file {
        debug!("config: {}", file.display());
    }
    Ok(config)
}

/// Workspace knobs taken from the configuration
pub fn workspace_options(config: &Config) -> WorkspaceOptions {
    let project = &config.project;
    let mut options = WorkspaceOptions {
        exclude: project.exclude().to_vec(),
        package_roots: project.package_roots().to_vec(),
        ..WorkspaceOptions::default()
    };
    if let Some(dir) = project.artifact_dir() {
        options.artifact_dir = dir.to_path_buf();
    }
    if let Some(roots) = project.search_roots() {
        options.search_roots = roots.to_vec();
    }
    options
}

/// Open the workspace at `root` and seed its package graph
pub fn open_workspace(root: &Path, config: &Config) -> Result<Arc<Workspace>> {
    let workspace = Workspace::with_options(root, workspace_options(config))
        .with_context(|| format!("Failed to open workspace {}", root.display()))?;
    workspace
        .init()
        .with_context(|| format!("Failed to scan {}", workspace.source_root().display()))?;
    Ok(Arc::new(workspace))
}

/// Watch settings: flags over the configuration over the watcher defaults
pub fn watch_config(
    config: &Config,
    debounce_ms: Option<u64>,
    no_initial_build: bool,
) -> WatchConfig {
    let project = &config.project;
    let mut watch = WatchConfig::default();
    if let Some(ms) = debounce_ms.or(project.debounce_ms()) {
        watch.debounce = Duration::from_millis(ms);
    }
    if let Some(max_batch) = project.max_batch() {
        watch.max_batch = max_batch;
    }
    if let Some(initial_build) = project.initial_build() {
        watch.initial_build = initial_build;
    }
    if no_initial_build {
        watch.initial_build = false;
    }
    watch
}

/// Compiler from the command line, falling back to the configuration
pub fn compiler(config: &Config, flag: Option<String>) -> GoCompiler {
    match flag {
        Some(program) => GoCompiler::new(program),
        None => GoCompiler::new(config.project.compiler()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_workspace_options_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("rbgo.toml"),
            "[workspace]\nexclude = [\"testdata\"]\n\n[build]\nartifact_dir = \"pkg/out\"\nsearch_roots = []\n",
        )
        .unwrap();

        let config = load_config(dir.path(), None).unwrap();
        let options = workspace_options(&config);
        assert_eq!(options.exclude, vec!["testdata".to_string()]);
        assert_eq!(options.artifact_dir, Path::new("pkg/out"));
        assert!(options.search_roots.is_empty());
    }

    #[test]
    fn test_watch_config_layers() {
        let dir = tempfile::tempdir().unwrap();
        let defaults = watch_config(&Config::default(), None, false);
        assert_eq!(defaults, WatchConfig::default());

        fs::write(
            dir.path().join("rbgo.toml"),
            "[watch]\ndebounce_ms = 250\nmax_batch = 8\n",
        )
        .unwrap();
        let config = load_config(dir.path(), None).unwrap();
        let configured = watch_config(&config, None, false);
        assert_eq!(configured.debounce, Duration::from_millis(250));
        assert_eq!(configured.max_batch, 8);
        assert!(configured.initial_build);

        let flagged = watch_config(&config, Some(40), true);
        assert_eq!(flagged.debounce, Duration::from_millis(40));
        assert!(!flagged.initial_build);
    }

    #[test]
    fn test_compiler_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(compiler(&config, Some("go1.22".into())).program(), "go1.22");
    }

    #[test]
    fn test_open_missing_workspace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert!(open_workspace(&dir.path().join("absent"), &config).is_err());
    }
}
