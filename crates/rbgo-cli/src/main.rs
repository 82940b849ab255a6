use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Incremental builder for GOPATH-style Go workspaces.
///
/// Watches the workspace source tree and rebuilds the compiled archive of
/// every package whose sources changed, dependencies first. Vendored
/// projects under src/vendor are built as one archive per project.
///
/// EXAMPLES:
///     rbgo                       Watch the current directory
///     rbgo watch ~/go            Watch another workspace
///     rbgo build                 Build every stale package once
///     rbgo list --json           Dump the package graph
///
/// ENVIRONMENT VARIABLES:
///     RBGO_LOG           Log filter (overrides -v), e.g. 'rbgo_build=debug'
///     RBGO_DEBOUNCE_MS   Quiet period before a batch of changes is built
///     RBGO_COMPILER      Compiler program (default: go)
///     GOROOT             Standard library location for import resolution
///     GOOS, GOARCH       Platform of the pkg/<os>_<arch> artifact directory
#[derive(Parser)]
#[command(name = "rbgo")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: <workspace>/rbgo.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a workspace and rebuild on change (default)
    ///
    /// EXAMPLES:
    ///     rbgo watch                     Watch the current directory
    ///     rbgo watch . --debounce-ms 200 React faster to edits
    #[command(visible_alias = "w")]
    Watch {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Quiet period before a batch of changes is built
        #[arg(long)]
        debounce_ms: Option<u64>,
        /// Skip building every package on start
        #[arg(long)]
        no_initial_build: bool,
        /// Compiler program
        #[arg(long)]
        compiler: Option<String>,
    },

    /// Build every stale package once and exit
    ///
    /// Exits with a non-zero status if any package fails to build.
    #[command(visible_alias = "b")]
    Build {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Compiler program
        #[arg(long)]
        compiler: Option<String>,
    },

    /// Print the package graph
    #[command(visible_alias = "ls")]
    List {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("RBGO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("rbgo_build={level},rbgo={level}")));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Watch {
        path: PathBuf::from("."),
        debounce_ms: None,
        no_initial_build: false,
        compiler: None,
    });

    match command {
        Commands::Watch {
            path,
            debounce_ms,
            no_initial_build,
            compiler,
        } => commands::watch::run(commands::watch::WatchArgs {
            path,
            config: cli.config,
            debounce_ms,
            no_initial_build,
            compiler,
        }),
        Commands::Build { path, compiler } => commands::build::run(commands::build::BuildArgs {
            path,
            config: cli.config,
            compiler,
        }),
        Commands::List { path, json } => commands::list::run(&path, cli.config.as_deref(), json),
    }
}
