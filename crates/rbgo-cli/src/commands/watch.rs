//! Watch mode: keep artifacts fresh until interrupted

use anyhow::{Context, Result};
use rbgo_build::Watcher;
use std::path::PathBuf;
use tracing::info;

/// Watch command arguments
pub struct WatchArgs {
    pub path: PathBuf,
    pub config: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub no_initial_build: bool,
    pub compiler: Option<String>,
}

pub fn run(args: WatchArgs) -> Result<()> {
    let config = super::load_config(&args.path, args.config.as_deref())?;
    let workspace = super::open_workspace(&args.path, &config)?;

    let watch_config = super::watch_config(&config, args.debounce_ms, args.no_initial_build);
    let compiler = super::compiler(&config, args.compiler);

    info!("Watching {} (Ctrl+C to stop)", workspace.root().display());
    Watcher::with_config(workspace, compiler, watch_config)
        .watch()
        .context("Watch failed")
}
