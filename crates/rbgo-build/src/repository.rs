//! In-memory package graph
//!
//! Packages are owned by the path index; every other index refers to them by
//! watch path. Edges (`referrers`, `missing_imports`) are only valid after
//! [`PackageRepository::update_depends`] has run following the last mutation.

use crate::package::Package;
use crate::paths::import_path;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Pseudo-imports handled by the toolchain itself
pub const IGNORED_IMPORTS: &[&str] = &["C", "appengine/cloudsql"];

/// Index of all known packages
#[derive(Debug, Clone, Default)]
pub struct PackageRepository {
    by_path: BTreeMap<PathBuf, Package>,
    by_name: HashMap<String, PathBuf>,
    by_dir: HashMap<PathBuf, Vec<PathBuf>>,
    projects: BTreeMap<String, PackageRepository>,
    search_roots: Vec<PathBuf>,
}

impl PackageRepository {
    /// Create an empty repository with no external search roots
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty repository resolving unknown imports against `roots`
    /// (standard library trees such as `$GOROOT/src`).
    pub fn with_search_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            search_roots: roots,
            ..Self::default()
        }
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// All packages, ordered by watch path
    pub fn all(&self) -> impl Iterator<Item = &Package> {
        self.by_path.values()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Package> {
        self.by_path.get(path)
    }

    pub fn find_by_import_name(&self, name: &str) -> Option<&Package> {
        self.by_name.get(name).and_then(|path| self.by_path.get(path))
    }

    /// Packages whose parent directory is `dir`
    pub fn find_by_dir(&self, dir: &Path) -> Vec<&Package> {
        self.by_dir
            .get(dir)
            .map(|paths| paths.iter().filter_map(|p| self.by_path.get(p)).collect())
            .unwrap_or_default()
    }

    /// Watch paths of registered packages strictly beneath `dir`
    pub fn paths_under(&self, dir: &Path) -> Vec<PathBuf> {
        self.by_path
            .keys()
            .filter(|p| p.as_path() != dir && p.starts_with(dir))
            .cloned()
            .collect()
    }

    /// Insert or replace the package registered at the same watch path
    pub fn put(&mut self, package: Package) {
        self.unlink(&package.watch_path);
        let path = package.watch_path.clone();
        if let Some(dir) = package.parent_dir() {
            self.by_dir
                .entry(dir.to_path_buf())
                .or_default()
                .push(path.clone());
        }
        if !package.full_name.is_empty() {
            self.by_name.insert(package.full_name.clone(), path.clone());
        }
        self.by_path.insert(path, package);
    }

    /// Remove the package at `path` from every index
    pub fn delete(&mut self, path: &Path) -> Option<Package> {
        self.unlink(path);
        self.by_path.remove(path)
    }

    fn unlink(&mut self, path: &Path) {
        let Some(existing) = self.by_path.get(path) else {
            return;
        };
        if self.by_name.get(&existing.full_name).map(PathBuf::as_path) == Some(path) {
            self.by_name.remove(&existing.full_name);
        }
        if let Some(dir) = existing.parent_dir() {
            if let Some(siblings) = self.by_dir.get_mut(dir) {
                siblings.retain(|p| p != path);
                if siblings.is_empty() {
                    self.by_dir.remove(dir);
                }
            }
        }
    }

    /// Sub-repository holding the packages of one vendored project
    pub fn project(&self, project_name: &str) -> Option<&PackageRepository> {
        self.projects.get(project_name)
    }

    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    /// Packages importing any package of the vendored project `project_name`
    pub fn project_referrers(&self, project_name: &str) -> Vec<&Package> {
        let Some(project) = self.projects.get(project_name) else {
            return Vec::new();
        };
        let mut seen: Vec<&Path> = Vec::new();
        for package in project.all() {
            for referrer in &package.referrers {
                if !seen.contains(&referrer.as_path()) {
                    seen.push(referrer.as_path());
                }
            }
        }
        seen.into_iter()
            .filter_map(|path| self.by_path.get(path))
            .collect()
    }

    /// Recompute referrers, missing imports and project sub-repositories from scratch.
    pub fn update_depends(&mut self) {
        for package in self.by_path.values_mut() {
            package.referrers.clear();
            package.missing_imports.clear();
        }

        let mut edges: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut missing: Vec<(PathBuf, String)> = Vec::new();
        for (path, package) in &self.by_path {
            for import in &package.imports {
                if IGNORED_IMPORTS.contains(&import.as_str()) {
                    continue;
                }
                if let Some(target) = self.by_name.get(import) {
                    edges.push((target.clone(), path.clone()));
                } else if !self.in_search_roots(import) {
                    missing.push((path.clone(), import.clone()));
                }
            }
        }

        for (target, referrer) in edges {
            if let Some(package) = self.by_path.get_mut(&target) {
                if !package.referrers.contains(&referrer) {
                    package.referrers.push(referrer);
                }
            }
        }
        for (path, import) in missing {
            if let Some(package) = self.by_path.get_mut(&path) {
                if !package.missing_imports.contains(&import) {
                    package.missing_imports.push(import);
                }
            }
        }

        let mut projects: BTreeMap<String, PackageRepository> = BTreeMap::new();
        for package in self.by_path.values().filter(|p| p.in_vendor) {
            projects
                .entry(package.project_name.clone())
                .or_default()
                .put(package.clone());
        }
        self.projects = projects;
    }

    fn in_search_roots(&self, import: &str) -> bool {
        let relative = import_path(import);
        self.search_roots
            .iter()
            .any(|root| root.join(&relative).is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::SourceLayout;
    use pretty_assertions::assert_eq;

    fn package(path: &str, full_name: &str, imports: &[&str]) -> Package {
        let mut pkg = Package::new(SourceLayout::new("/ws/src", "pkg"), path);
        pkg.full_name = full_name.to_string();
        pkg.imports = imports.iter().map(|s| s.to_string()).collect();
        pkg
    }

    #[test]
    fn test_put_twice_does_not_duplicate_dir_entry() {
        let mut repo = PackageRepository::new();
        repo.put(package("/ws/src/a/b", "a/b", &[]));
        repo.put(package("/ws/src/a/b", "a/b", &["fmt"]));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.find_by_dir(Path::new("/ws/src/a")).len(), 1);
        assert_eq!(
            repo.find_by_path(Path::new("/ws/src/a/b")).unwrap().imports,
            vec!["fmt"]
        );
    }

    #[test]
    fn test_put_renamed_package_drops_old_name() {
        let mut repo = PackageRepository::new();
        repo.put(package("/ws/src/a/b", "a/b", &[]));
        repo.put(package("/ws/src/a/b", "a/c", &[]));
        assert!(repo.find_by_import_name("a/b").is_none());
        assert!(repo.find_by_import_name("a/c").is_some());
    }

    #[test]
    fn test_ignored_imports_are_not_missing() {
        let mut repo = PackageRepository::new();
        repo.put(package("/ws/src/a", "a", &["C", "appengine/cloudsql"]));
        repo.update_depends();
        assert!(repo
            .find_by_path(Path::new("/ws/src/a"))
            .unwrap()
            .missing_imports
            .is_empty());
    }

    #[test]
    fn test_search_roots_resolve_external_imports() {
        let goroot = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(goroot.path().join("net/http")).unwrap();

        let mut repo = PackageRepository::with_search_roots(vec![goroot.path().to_path_buf()]);
        repo.put(package("/ws/src/a", "a", &["net/http", "net/smtp"]));
        repo.update_depends();
        assert_eq!(
            repo.find_by_path(Path::new("/ws/src/a"))
                .unwrap()
                .missing_imports,
            vec!["net/smtp"]
        );
    }

    #[test]
    fn test_paths_under() {
        let mut repo = PackageRepository::new();
        repo.put(package("/ws/src/a", "a", &[]));
        repo.put(package("/ws/src/a/b", "a/b", &[]));
        repo.put(package("/ws/src/a/b/c", "a/b/c", &[]));
        repo.put(package("/ws/src/ab", "ab", &[]));
        assert_eq!(
            repo.paths_under(Path::new("/ws/src/a")),
            vec![
                PathBuf::from("/ws/src/a/b"),
                PathBuf::from("/ws/src/a/b/c")
            ]
        );
    }
}
