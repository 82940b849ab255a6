//! Filesystem notifications and package lifecycle events

use crate::package::{Package, SourceLayout};
use crate::repository::PackageRepository;
use crate::root_resolver::PackageRootResolver;
use crate::source::{is_go_source, SourceScanner};
use crate::workspace::ExcludeDirs;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// How the repository's view of a package changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A directory not seen before; it should be watched
    Found,
    /// The package was (re)scanned and needs a build check
    Update,
    /// The package left the repository
    Delete,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Found => "Found",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A lifecycle event with a snapshot of the package it concerns
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub package: Package,
}

impl Event {
    pub fn new(kind: EventKind, package: Package) -> Self {
        Self { kind, package }
    }

    pub fn watch_path(&self) -> &Path {
        &self.package.watch_path
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.package.watch_path.display())
    }
}

/// A normalized raw notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsNotification {
    pub path: PathBuf,
    pub exists: bool,
    pub is_dir: bool,
}

impl FsNotification {
    /// Describe `path` as it is on disk right now
    pub fn probe(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match fs::metadata(&path) {
            Ok(metadata) => Self {
                path,
                exists: true,
                is_dir: metadata.is_dir(),
            },
            Err(_) => Self::removed(path),
        }
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            exists: false,
            is_dir: false,
        }
    }
}

/// Turns raw notifications into lifecycle events, updating the repository
pub struct EventClassifier<'a> {
    layout: &'a SourceLayout,
    exclude: &'a ExcludeDirs,
    resolver: &'a PackageRootResolver,
    scanner: &'a dyn SourceScanner,
}

impl<'a> EventClassifier<'a> {
    pub fn new(
        layout: &'a SourceLayout,
        exclude: &'a ExcludeDirs,
        resolver: &'a PackageRootResolver,
        scanner: &'a dyn SourceScanner,
    ) -> Self {
        Self {
            layout,
            exclude,
            resolver,
            scanner,
        }
    }

    /// Classify one notification.
    ///
    /// When any event is produced the repository's edges are recomputed
    /// before returning, so callers may act on the events right away.
    pub fn classify(
        &self,
        repo: &mut PackageRepository,
        notification: &FsNotification,
    ) -> Vec<Event> {
        let events = self.classify_inner(repo, notification);
        if !events.is_empty() {
            repo.update_depends();
        }
        events
    }

    fn classify_inner(
        &self,
        repo: &mut PackageRepository,
        notification: &FsNotification,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let mut path = notification.path.clone();
        if self.exclude.contains(&path) {
            return events;
        }

        if !notification.exists {
            let mut vanished = repo.paths_under(&path);
            if repo.find_by_path(&path).is_some() {
                vanished.insert(0, path.clone());
            }
            for gone in vanished {
                if let Some(package) = repo.delete(&gone) {
                    events.push(Event::new(EventKind::Delete, package));
                }
            }
            if events.is_empty() {
                if let Some(parent) = path.parent() {
                    if let Some(package) = repo.find_by_path(parent).cloned() {
                        self.rescan(repo, package, true, &mut events);
                    }
                }
            }
            return events;
        }

        if notification.is_dir {
            let mut dirs = vec![path.clone()];
            if let Some(parent) = path.parent() {
                dirs.push(parent.to_path_buf());
            }
            for dir in dirs {
                let vanished: Vec<PathBuf> = repo
                    .find_by_dir(&dir)
                    .into_iter()
                    .filter(|p| !p.watch_path.exists())
                    .map(|p| p.watch_path.clone())
                    .collect();
                for gone in vanished {
                    if let Some(package) = repo.delete(&gone) {
                        events.push(Event::new(EventKind::Delete, package));
                    }
                }
            }
        } else if is_go_source(&path) {
            match path.parent() {
                Some(parent) => path = parent.to_path_buf(),
                None => return events,
            }
        } else {
            return events;
        }

        match repo.find_by_path(&path).cloned() {
            Some(package) => self.rescan(repo, package, true, &mut events),
            None => {
                let package = Package::new(self.layout.clone(), path);
                events.push(Event::new(EventKind::Found, package.clone()));
                self.rescan(repo, package, false, &mut events);
            }
        }
        events
    }

    fn rescan(
        &self,
        repo: &mut PackageRepository,
        mut package: Package,
        registered: bool,
        events: &mut Vec<Event>,
    ) {
        match package.scan(self.resolver, self.scanner) {
            Ok(()) => {
                repo.put(package.clone());
                events.push(Event::new(EventKind::Update, package));
            }
            Err(err) if err.is_source_not_found() => {
                if registered {
                    if let Some(previous) = repo.delete(&package.watch_path) {
                        events.push(Event::new(EventKind::Delete, previous));
                    }
                }
            }
            Err(err) => {
                // Kept in its reset state; the build reports the scan error
                warn!("fresh: {}, {}", package.watch_path.display(), err);
                repo.put(package.clone());
                events.push(Event::new(EventKind::Update, package));
            }
        }
    }
}
