//! The long-running driver: notifications in, builds out

use crate::coalescer::{EventCoalescer, DEFAULT_DEBOUNCE, DEFAULT_MAX_BATCH};
use crate::compiler::Compiler;
use crate::error::{BuildError, BuildResult};
use crate::event::{Event, EventKind, FsNotification};
use crate::task::{build_target, BuildReport};
use crate::workspace::Workspace;
use notify::event::{AccessKind, AccessMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Watch mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Quiet period closing an event batch
    pub debounce: Duration,
    /// Largest event batch
    pub max_batch: usize,
    /// Build every package once before waiting for changes
    pub initial_build: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_batch: DEFAULT_MAX_BATCH,
            initial_build: true,
        }
    }
}

/// Outcome of building several targets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Import names compiled, in order
    pub compiled: Vec<String>,
    /// Watch paths whose build failed, with the error text
    pub failed: Vec<(PathBuf, String)>,
}

impl BuildSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, watch_path: &Path, result: BuildResult<BuildReport>) {
        match result {
            Ok(report) => self.compiled.extend(report.compiled),
            Err(err) => {
                error!("Error: {}", err);
                self.failed.push((watch_path.to_path_buf(), err.to_string()));
            }
        }
    }
}

/// Keeps a workspace's artifacts up to date
pub struct Watcher {
    workspace: Arc<Workspace>,
    compiler: Arc<dyn Compiler>,
    config: WatchConfig,
}

impl Watcher {
    pub fn new(workspace: Arc<Workspace>, compiler: impl Compiler + 'static) -> Self {
        Self::with_config(workspace, compiler, WatchConfig::default())
    }

    pub fn with_config(
        workspace: Arc<Workspace>,
        compiler: impl Compiler + 'static,
        config: WatchConfig,
    ) -> Self {
        Self {
            workspace,
            compiler: Arc::new(compiler),
            config,
        }
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Bring one package and its dependencies up to date
    pub fn build_package(&self, watch_path: &Path) -> BuildResult<BuildReport> {
        build_target(
            self.workspace.packages(),
            watch_path,
            self.compiler.as_ref(),
        )
    }

    /// Build every registered package once.
    ///
    /// Packages sharing an artifact are built once; order follows the
    /// artifact path. Failures are logged and collected.
    pub fn build_all(&self) -> BuildSummary {
        let targets: BTreeMap<PathBuf, PathBuf> = {
            let repo = self.workspace.lock();
            let mut targets = BTreeMap::new();
            for package in repo.all() {
                targets
                    .entry(package.object_path.clone())
                    .or_insert_with(|| package.watch_path.clone());
            }
            targets
        };

        let mut summary = BuildSummary::default();
        for watch_path in targets.values() {
            summary.record(watch_path, self.build_package(watch_path));
        }
        summary
    }

    /// Act on one coalesced batch: only updates trigger builds
    pub fn process_batch(&self, events: &[Event]) -> BuildSummary {
        let mut summary = BuildSummary::default();
        for event in events {
            info!("{}", event);
            if event.kind == EventKind::Update {
                summary.record(event.watch_path(), self.build_package(event.watch_path()));
            }
        }
        summary
    }

    /// Subscribe to the source tree and rebuild on change.
    ///
    /// Returns only if the notification backend shuts down.
    pub fn watch(&self) -> BuildResult<()> {
        let (raw_tx, raw_rx) = mpsc::channel::<notify::Result<notify::Event>>();
        let backend = Arc::new(Mutex::new(notify::recommended_watcher(raw_tx)?));

        let vendor_root = self.workspace.layout().vendor_root();
        let mut watched = 0;
        for dir in self.workspace.walk()? {
            if dir.starts_with(&vendor_root) {
                continue;
            }
            backend.lock().watch(&dir, RecursiveMode::NonRecursive)?;
            watched += 1;
        }
        info!("Watching {} directories", watched);

        let (tx, rx) = mpsc::channel();
        let listener = Listener {
            workspace: Arc::clone(&self.workspace),
            backend: Arc::clone(&backend),
            events: tx,
        };
        thread::Builder::new()
            .name("rbgo-listener".to_string())
            .spawn(move || listener.run(raw_rx))
            .map_err(BuildError::Io)?;

        if self.config.initial_build {
            info!("First build start");
            self.build_all();
        }

        info!("Watch start");
        let coalescer = EventCoalescer::new(self.config.debounce, self.config.max_batch);
        while let Some(batch) = coalescer.next_batch(&rx) {
            self.process_batch(&batch);
        }
        Ok(())
    }
}

struct Listener {
    workspace: Arc<Workspace>,
    backend: Arc<Mutex<RecommendedWatcher>>,
    events: Sender<Event>,
}

impl Listener {
    fn run(self, raw: Receiver<notify::Result<notify::Event>>) {
        for result in raw {
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    warn!("watch error: {}", err);
                    continue;
                }
            };
            if !is_relevant(&event.kind) {
                continue;
            }
            for path in event.paths {
                let notification = FsNotification::probe(path);
                for event in self.workspace.handle_notification(&notification) {
                    if event.kind == EventKind::Found {
                        self.subscribe(event.watch_path());
                    } else if self.events.send(event).is_err() {
                        return;
                    }
                }
            }
        }
    }

    fn subscribe(&self, dir: &Path) {
        match self.backend.lock().watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => debug!("watching {}", dir.display()),
            Err(err) => warn!("cannot watch {}: {}", dir.display(), err),
        }
    }
}

/// Whether a backend event can change sources on disk.
///
/// Plain reads are dropped so that the compiler reading sources does not
/// feed back into another build.
pub fn is_relevant(kind: &notify::EventKind) -> bool {
    match kind {
        notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        notify::EventKind::Access(_) => false,
        _ => true,
    }
}
