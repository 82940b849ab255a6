//! Workspace discovery and the initial tree walk

use crate::error::{BuildError, BuildResult};
use crate::event::{Event, EventClassifier, FsNotification};
use crate::package::{default_artifact_dir, Package, SourceLayout, SOURCE_DIR};
use crate::paths::absolutize;
use crate::repository::PackageRepository;
use crate::root_resolver::PackageRootResolver;
use crate::source::{GoSourceScanner, SourceScanner};
use parking_lot::{Mutex, MutexGuard};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Directory names skipped everywhere in the tree
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[".git", ".idea"];

/// Directory names whose subtrees are ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeDirs {
    names: Vec<String>,
}

impl Default for ExcludeDirs {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDE_DIRS.iter().copied())
    }
}

impl ExcludeDirs {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name);
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether any component of `path` is an excluded name
    pub fn contains(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(name) => self.names.iter().any(|n| name == n.as_str()),
            _ => false,
        })
    }
}

/// Knobs for [`Workspace::with_options`]
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// Names excluded in addition to [`DEFAULT_EXCLUDE_DIRS`]
    pub exclude: Vec<String>,
    /// Root patterns added after the built-in ones
    pub package_roots: Vec<String>,
    /// Artifact directory relative to the workspace root
    pub artifact_dir: PathBuf,
    /// Trees probed for imports no registered package provides
    pub search_roots: Vec<PathBuf>,
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            package_roots: Vec::new(),
            artifact_dir: default_artifact_dir(),
            search_roots: default_search_roots(),
        }
    }
}

/// `$GOROOT/src`, when `GOROOT` is set
pub fn default_search_roots() -> Vec<PathBuf> {
    env::var_os("GOROOT")
        .filter(|v| !v.is_empty())
        .map(|root| vec![PathBuf::from(root).join(SOURCE_DIR)])
        .unwrap_or_default()
}

/// The source tree being built and the live package graph
pub struct Workspace {
    root: PathBuf,
    layout: SourceLayout,
    exclude: ExcludeDirs,
    resolver: PackageRootResolver,
    scanner: Box<dyn SourceScanner>,
    packages: Mutex<PackageRepository>,
}

impl Workspace {
    /// Open the workspace at `path` with default options
    pub fn new(path: impl AsRef<Path>) -> BuildResult<Self> {
        Self::with_options(path, WorkspaceOptions::default())
    }

    /// Open the workspace at `path`.
    ///
    /// Fails when `path` does not exist. `path/src` becomes the source root
    /// when present, otherwise `path` itself.
    pub fn with_options(path: impl AsRef<Path>, options: WorkspaceOptions) -> BuildResult<Self> {
        let root = absolutize(path.as_ref());
        fs::metadata(&root).map_err(|e| BuildError::io(&root, e))?;

        let nested = root.join(SOURCE_DIR);
        let source_root = if nested.is_dir() { nested } else { root.clone() };

        let mut exclude = ExcludeDirs::default();
        for name in options.exclude {
            exclude.add(name);
        }

        let mut resolver = PackageRootResolver::with_defaults();
        for pattern in &options.package_roots {
            resolver.add_pattern(pattern)?;
        }

        Ok(Self {
            root,
            layout: SourceLayout::new(source_root, options.artifact_dir),
            exclude,
            resolver,
            scanner: Box::new(GoSourceScanner),
            packages: Mutex::new(PackageRepository::with_search_roots(options.search_roots)),
        })
    }

    /// Replace the import-extraction collaborator
    pub fn with_scanner(mut self, scanner: impl SourceScanner + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_root(&self) -> &Path {
        self.layout.source_root()
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    pub fn exclude_dirs(&self) -> &ExcludeDirs {
        &self.exclude
    }

    pub fn resolver(&self) -> &PackageRootResolver {
        &self.resolver
    }

    pub fn scanner(&self) -> &dyn SourceScanner {
        self.scanner.as_ref()
    }

    /// The shared repository; lock it only for short planning steps.
    pub fn packages(&self) -> &Mutex<PackageRepository> {
        &self.packages
    }

    pub fn lock(&self) -> MutexGuard<'_, PackageRepository> {
        self.packages.lock()
    }

    /// Unscanned package for a directory of this workspace
    pub fn new_package(&self, watch_path: impl Into<PathBuf>) -> Package {
        Package::new(self.layout.clone(), watch_path)
    }

    /// Every non-excluded directory under the source root, parents first.
    ///
    /// An unreadable source root is an error; unreadable entries below it
    /// are logged and skipped.
    pub fn walk(&self) -> BuildResult<Vec<PathBuf>> {
        let source_root = self.layout.source_root();
        let walker = WalkDir::new(source_root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.exclude.contains(entry.path()));

        let mut dirs = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
                Ok(_) => {}
                Err(err) if err.depth() == 0 => {
                    return Err(BuildError::io(source_root, err.into()));
                }
                Err(err) => warn!("walk: {}", err),
            }
        }
        Ok(dirs)
    }

    /// Scan every directory and seed the repository.
    ///
    /// Directories without sources are skipped quietly; other scan failures
    /// are logged and skipped. Returns the number of registered packages.
    pub fn init(&self) -> BuildResult<usize> {
        let dirs = self.walk()?;
        let mut repo = self.packages.lock();
        for dir in dirs {
            let mut package = repo
                .find_by_path(&dir)
                .cloned()
                .unwrap_or_else(|| self.new_package(dir));
            match package.scan(&self.resolver, self.scanner.as_ref()) {
                Ok(()) => {
                    info!("import: {}", package.full_name);
                    repo.put(package);
                }
                Err(err) if err.is_source_not_found() => {}
                Err(err) => warn!("fresh: {}, {}", package.watch_path.display(), err),
            }
        }
        repo.update_depends();
        Ok(repo.len())
    }

    /// Classifier bound to this workspace's layout and capabilities
    pub fn classifier(&self) -> EventClassifier<'_> {
        EventClassifier::new(
            &self.layout,
            &self.exclude,
            &self.resolver,
            self.scanner.as_ref(),
        )
    }

    /// Classify one notification under the repository lock
    pub fn handle_notification(&self, notification: &FsNotification) -> Vec<Event> {
        let mut repo = self.packages.lock();
        self.classifier().classify(&mut repo, notification)
    }
}
