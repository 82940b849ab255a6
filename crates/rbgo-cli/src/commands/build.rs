//! One-shot build of every stale package

use anyhow::{bail, Result};
use rbgo_build::{WatchConfig, Watcher};
use std::path::PathBuf;

/// Build command arguments
pub struct BuildArgs {
    pub path: PathBuf,
    pub config: Option<PathBuf>,
    pub compiler: Option<String>,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let config = super::load_config(&args.path, args.config.as_deref())?;
    let workspace = super::open_workspace(&args.path, &config)?;
    let compiler = super::compiler(&config, args.compiler);

    let watcher = Watcher::with_config(workspace, compiler, WatchConfig::default());
    let summary = watcher.build_all();

    if summary.compiled.is_empty() && summary.is_success() {
        println!("Everything is up to date");
    } else {
        println!("Compiled {} package(s)", summary.compiled.len());
    }

    if !summary.is_success() {
        for (path, error) in &summary.failed {
            eprintln!("  {}: {}", path.display(), error);
        }
        bail!("{} package(s) failed to build", summary.failed.len());
    }
    Ok(())
}
