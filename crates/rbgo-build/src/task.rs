//! Dependency-first incremental builds
//!
//! There is no precomputed build order. [`BuildTask::find_depends`] walks the
//! import graph depth-first, left to right, and reports the first stale
//! package it meets; the caller builds it and asks again.

use crate::compiler::{compiler_env, CompileRequest, Compiler};
use crate::error::{BuildError, BuildResult};
use crate::package::Package;
use crate::repository::PackageRepository;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Looks packages up by watch path and wraps them in tasks
pub struct TaskFactory<'a> {
    repo: &'a PackageRepository,
}

impl<'a> TaskFactory<'a> {
    pub fn new(repo: &'a PackageRepository) -> Self {
        Self { repo }
    }

    pub fn task(&self, watch_path: &Path) -> BuildResult<BuildTask<'a>> {
        self.repo
            .find_by_path(watch_path)
            .map(|package| BuildTask::new(package, self.repo))
            .ok_or_else(|| BuildError::PackageNotFound {
                path: watch_path.to_path_buf(),
            })
    }
}

/// One package bound to the repository it was resolved from
#[derive(Debug, Clone, Copy)]
pub struct BuildTask<'a> {
    package: &'a Package,
    repo: &'a PackageRepository,
}

impl<'a> BuildTask<'a> {
    pub fn new(package: &'a Package, repo: &'a PackageRepository) -> Self {
        Self { package, repo }
    }

    pub fn package(&self) -> &'a Package {
        self.package
    }

    pub fn package_name(&self) -> &'a str {
        &self.package.full_name
    }

    pub fn object_path(&self) -> &'a Path {
        &self.package.object_path
    }

    /// The first stale dependency that must be built before this package.
    ///
    /// Dependencies sharing this package's artifact (other packages of the same
    /// vendored project) are never reported. Fails when any package on the way
    /// has a missing import, or when the imports form a cycle.
    pub fn find_depends(&self) -> BuildResult<Option<BuildTask<'a>>> {
        let mut stack = Vec::new();
        let mut fresh = HashSet::new();
        let dependency = self.find_stale(self.package, &mut stack, &mut fresh)?;
        Ok(dependency
            .filter(|dep| dep.object_path != self.package.object_path)
            .map(|dep| BuildTask::new(dep, self.repo)))
    }

    fn find_stale(
        &self,
        package: &'a Package,
        stack: &mut Vec<&'a Package>,
        fresh: &mut HashSet<&'a Path>,
    ) -> BuildResult<Option<&'a Package>> {
        if let Some(import) = package.missing_imports.first() {
            return Err(BuildError::MissingImport {
                package: package.full_name.clone(),
                import: import.clone(),
            });
        }
        if let Some(start) = stack
            .iter()
            .position(|p| p.watch_path == package.watch_path)
        {
            let mut cycle: Vec<&str> = stack[start..]
                .iter()
                .map(|p| p.full_name.as_str())
                .collect();
            cycle.push(&package.full_name);
            return Err(BuildError::CyclicDependency(cycle.join(" -> ")));
        }
        if fresh.contains(package.watch_path.as_path()) {
            return Ok(None);
        }

        stack.push(package);
        for name in &package.imports {
            let Some(import) = self.repo.find_by_import_name(name) else {
                continue;
            };
            if let Some(dependency) = self.find_stale(import, stack, fresh)? {
                stack.pop();
                return Ok(Some(dependency));
            }
        }
        stack.pop();

        if package.is_stale() {
            return Ok(Some(package));
        }
        fresh.insert(package.watch_path.as_path());
        Ok(None)
    }

    /// Compiler invocation for this package with the current process environment
    pub fn compile_request(&self) -> CompileRequest {
        CompileRequest {
            package: self.package.full_name.clone(),
            source_path: self.package.source_path.clone(),
            object_path: self.package.object_path.clone(),
            work_dir: self.package.work_dir.clone(),
            env: compiler_env(&self.package.work_dir, env::vars_os()),
        }
    }

    /// Compile this package, ignoring dependencies and staleness
    pub fn build(&self, compiler: &dyn Compiler) -> BuildResult<()> {
        compiler.compile(&self.compile_request())
    }
}

/// Packages compiled while bringing one target up to date
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Import names in compile order
    pub compiled: Vec<String>,
}

impl BuildReport {
    pub fn is_fresh(&self) -> bool {
        self.compiled.is_empty()
    }
}

enum Step {
    Dependency(CompileRequest),
    Target(CompileRequest),
    Done,
}

/// Bring the package at `watch_path` up to date.
///
/// Stale dependencies are built one at a time, deepest first, then the
/// target itself if it is stale. The repository lock is held only while the
/// next step is planned, never while the compiler runs.
pub fn build_target(
    repo: &Mutex<PackageRepository>,
    watch_path: &Path,
    compiler: &dyn Compiler,
) -> BuildResult<BuildReport> {
    let mut report = BuildReport::default();
    let mut last_dependency: Option<PathBuf> = None;

    loop {
        let step = {
            let repo = repo.lock();
            let task = TaskFactory::new(&repo).task(watch_path)?;
            if let Some(message) = &task.package().scan_error {
                return Err(BuildError::ScanFailed {
                    path: watch_path.to_path_buf(),
                    message: message.clone(),
                });
            }
            match task.find_depends()? {
                Some(dependency) => Step::Dependency(dependency.compile_request()),
                None if task.package().is_stale() => Step::Target(task.compile_request()),
                None => Step::Done,
            }
        };

        match step {
            Step::Dependency(request) => {
                if last_dependency.as_deref() == Some(request.object_path.as_path()) {
                    return Err(BuildError::StaleAfterBuild {
                        package: request.package,
                    });
                }
                debug!("dependency of {}: {}", watch_path.display(), request.package);
                compiler.compile(&request)?;
                last_dependency = Some(request.object_path);
                report.compiled.push(request.package);
            }
            Step::Target(request) => {
                compiler.compile(&request)?;
                report.compiled.push(request.package);
                return Ok(report);
            }
            Step::Done => return Ok(report),
        }
    }
}
