//! Packages: one buildable directory and the paths derived from it

use crate::error::{BuildError, BuildResult};
use crate::paths::{absolutize, import_name, import_path};
use crate::root_resolver::PackageRootResolver;
use crate::source::SourceScanner;
use serde::Serialize;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Name of the reserved third-party subtree under the source root
pub const VENDOR_DIR: &str = "vendor";

/// Conventional name of the source root inside a workspace
pub const SOURCE_DIR: &str = "src";

/// Extension appended to every compiled artifact
pub const ARCHIVE_EXTENSION: &str = "a";

/// Per-platform artifact directory, `pkg/<os>_<arch>`.
///
/// `GOOS` and `GOARCH` win over the host platform when set.
pub fn default_artifact_dir() -> PathBuf {
    let os = env::var("GOOS")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| go_os(env::consts::OS).to_string());
    let arch = env::var("GOARCH")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| go_arch(env::consts::ARCH).to_string());
    artifact_dir_for(&os, &arch)
}

/// Artifact directory for an explicit platform pair
pub fn artifact_dir_for(os: &str, arch: &str) -> PathBuf {
    Path::new("pkg").join(format!("{}_{}", os, arch))
}

fn go_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn go_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Where sources live and where artifacts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    source_root: PathBuf,
    artifact_dir: PathBuf,
}

impl SourceLayout {
    /// Create a layout; `source_root` is made absolute.
    pub fn new(source_root: impl AsRef<Path>, artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_root: absolutize(source_root.as_ref()),
            artifact_dir: artifact_dir.into(),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    pub fn vendor_root(&self) -> PathBuf {
        self.source_root.join(VENDOR_DIR)
    }

    /// Directory the compiler runs from.
    ///
    /// A source root named `src` belongs to the workspace one level up.
    pub fn work_dir(&self) -> PathBuf {
        if self.source_root.file_name().and_then(|n| n.to_str()) == Some(SOURCE_DIR) {
            if let Some(parent) = self.source_root.parent() {
                return parent.to_path_buf();
            }
        }
        self.source_root.clone()
    }

    pub fn artifact_root(&self) -> PathBuf {
        self.work_dir().join(&self.artifact_dir)
    }

    /// Whether `path` (absolute) lies strictly inside the vendor subtree
    pub fn is_vendored(&self, path: &Path) -> bool {
        let vendor = self.vendor_root();
        path != vendor && path.starts_with(&vendor)
    }
}

/// A buildable directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    #[serde(skip)]
    layout: SourceLayout,
    /// Directory being monitored (unique key)
    pub watch_path: PathBuf,
    /// Declared package label
    pub name: String,
    /// Import identifier
    pub full_name: String,
    pub in_vendor: bool,
    /// Root project of a vendored package
    pub project_name: String,
    /// Directory handed to the compiler
    pub source_path: PathBuf,
    /// Compiled archive
    pub object_path: PathBuf,
    pub work_dir: PathBuf,
    pub source_count: usize,
    #[serde(skip)]
    pub mod_time: SystemTime,
    pub imports: Vec<String>,
    /// Watch paths of the packages importing this one
    pub referrers: Vec<PathBuf>,
    pub missing_imports: Vec<String>,
    /// Why the last scan failed, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_error: Option<String>,
}

impl Package {
    /// Create an unscanned package for `watch_path`
    pub fn new(layout: SourceLayout, watch_path: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            watch_path: watch_path.into(),
            name: String::new(),
            full_name: String::new(),
            in_vendor: false,
            project_name: String::new(),
            source_path: PathBuf::new(),
            object_path: PathBuf::new(),
            work_dir: PathBuf::new(),
            source_count: 0,
            mod_time: SystemTime::UNIX_EPOCH,
            imports: Vec::new(),
            referrers: Vec::new(),
            missing_imports: Vec::new(),
            scan_error: None,
        }
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Directory containing `watch_path`
    pub fn parent_dir(&self) -> Option<&Path> {
        self.watch_path.parent()
    }

    /// Re-read the directory and recompute every derived field.
    ///
    /// Derived fields are cleared before anything else, so a failed scan
    /// leaves the package in its unscanned state with `scan_error` set.
    /// Referrers and missing imports belong to the repository and are left
    /// alone.
    pub fn scan(
        &mut self,
        resolver: &PackageRootResolver,
        scanner: &dyn SourceScanner,
    ) -> BuildResult<()> {
        self.reset();
        let result = self.read_sources(resolver, scanner);
        if let Err(err) = &result {
            self.scan_error = Some(err.to_string());
        }
        result
    }

    fn read_sources(
        &mut self,
        resolver: &PackageRootResolver,
        scanner: &dyn SourceScanner,
    ) -> BuildResult<()> {
        let sources = scanner.scan_dir(&self.watch_path)?;
        self.source_count = sources.len();
        if sources.is_empty() {
            return Err(BuildError::source_not_found(&self.watch_path));
        }

        let mut name: Option<&str> = None;
        let mut mod_time = SystemTime::UNIX_EPOCH;
        let mut imports = Vec::new();
        for source in &sources {
            match name {
                Some(existing) if existing != source.package => {
                    return Err(BuildError::AmbiguousPackage {
                        path: self.watch_path.clone(),
                        first: existing.to_string(),
                        second: source.package.clone(),
                    });
                }
                _ => name = Some(&source.package),
            }
            if source.mod_time > mod_time {
                mod_time = source.mod_time;
            }
            imports.extend(source.imports.iter().cloned());
        }
        let name = name.unwrap_or_default().to_string();

        let watch_path = absolutize(&self.watch_path);
        let (full_name, project_name, source_path, in_vendor) =
            if self.layout.is_vendored(&watch_path) {
                let vendor_root = self.layout.vendor_root();
                let full_name = watch_path
                    .strip_prefix(&vendor_root)
                    .map(import_name)
                    .unwrap_or_default();
                let project_name =
                    resolver.vendor_project_name(&vendor_root, &full_name, scanner)?;
                let source_path = vendor_root.join(import_path(&project_name));
                (full_name, project_name, source_path, true)
            } else {
                let full_name = watch_path
                    .strip_prefix(self.layout.source_root())
                    .ok()
                    .map(import_name)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| name.clone());
                (full_name, String::new(), watch_path.clone(), false)
            };

        let work_dir = self.layout.work_dir();
        let object_path = object_path_for(
            &self.layout,
            if in_vendor { &project_name } else { &full_name },
            in_vendor,
        );

        self.name = name;
        self.full_name = full_name;
        self.project_name = project_name;
        self.in_vendor = in_vendor;
        self.source_path = source_path;
        self.object_path = object_path;
        self.work_dir = work_dir;
        self.mod_time = mod_time;
        self.imports = imports;
        Ok(())
    }

    fn reset(&mut self) {
        self.name.clear();
        self.full_name.clear();
        self.in_vendor = false;
        self.project_name.clear();
        self.source_path = PathBuf::new();
        self.object_path = PathBuf::new();
        self.work_dir = PathBuf::new();
        self.source_count = 0;
        self.mod_time = SystemTime::UNIX_EPOCH;
        self.imports.clear();
        self.scan_error = None;
    }

    /// Whether the artifact is missing or older than the newest source
    pub fn is_stale(&self) -> bool {
        let modified = fs::metadata(&self.object_path).and_then(|m| m.modified());
        match modified {
            Ok(artifact_time) => artifact_time < self.mod_time,
            Err(_) => true,
        }
    }
}

/// `<artifact root>[/vendor]/<name>.a`
fn object_path_for(layout: &SourceLayout, name: &str, in_vendor: bool) -> PathBuf {
    let mut entry = layout.artifact_root();
    if in_vendor {
        entry.push(VENDOR_DIR);
    }
    let mut path: OsString = entry.join(import_path(name)).into_os_string();
    path.push(".");
    path.push(ARCHIVE_EXTENSION);
    PathBuf::from(path)
}
