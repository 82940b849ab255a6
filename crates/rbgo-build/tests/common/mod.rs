//! Shared fixtures for the rbgo-build integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use rbgo_build::{
    BuildResult, CompileRequest, Compiler, GoSourceScanner, Package, PackageRepository,
    PackageRootResolver, SourceLayout,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scratch GOPATH-style workspace: `<root>/src/...`
pub struct Fixture {
    dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        Self { dir }
    }

    /// Create a fixture with the given files under `src/`
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let fixture = Self::new();
        for (path, content) in files {
            fixture.write(path, content);
        }
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel` under `src/`
    pub fn src(&self, rel: &str) -> PathBuf {
        let mut path = self.dir.path().join("src");
        for part in rel.split('/').filter(|s| !s.is_empty()) {
            path.push(part);
        }
        path
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.src(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn layout(&self) -> SourceLayout {
        SourceLayout::new(self.dir.path().join("src"), "pkg/test_arch")
    }

    pub fn artifact(&self, rel: &str) -> PathBuf {
        let mut path = self.dir.path().join("pkg/test_arch");
        for part in rel.split('/') {
            path.push(part);
        }
        path
    }

    /// Scan the package at `rel` with the default resolver
    pub fn scan(&self, rel: &str) -> BuildResult<Package> {
        let mut package = Package::new(self.layout(), self.src(rel));
        package.scan(&PackageRootResolver::with_defaults(), &GoSourceScanner)?;
        Ok(package)
    }

    /// Repository holding the packages at `rels`, edges computed
    pub fn repository(&self, rels: &[&str]) -> PackageRepository {
        let mut repo = PackageRepository::new();
        for rel in rels {
            repo.put(self.scan(rel).unwrap());
        }
        repo.update_depends();
        repo
    }
}

/// Go source with a package clause and grouped imports
pub fn go_source(package: &str, imports: &[&str]) -> String {
    let mut text = format!("package {}\n", package);
    if !imports.is_empty() {
        text.push_str("\nimport (\n");
        for import in imports {
            text.push_str(&format!("\t\"{}\"\n", import));
        }
        text.push_str(")\n");
    }
    text.push_str("\nfunc init() {}\n");
    text
}

/// Compiler double: writes an empty archive and remembers every request
#[derive(Default)]
pub struct RecordingCompiler {
    requests: Mutex<Vec<CompileRequest>>,
    fail: Option<String>,
}

impl RecordingCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A compiler that fails for the package named `package`
    pub fn failing_on(package: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: Some(package.to_string()),
        }
    }

    pub fn requests(&self) -> Vec<CompileRequest> {
        self.requests.lock().clone()
    }

    /// Package names compiled so far
    pub fn compiled(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.package.clone()).collect()
    }
}

impl Compiler for RecordingCompiler {
    fn compile(&self, request: &CompileRequest) -> BuildResult<()> {
        self.requests.lock().push(request.clone());
        if self.fail.as_deref() == Some(request.package.as_str()) {
            return Err(rbgo_build::BuildError::compiler_failed(
                &request.package,
                "undefined: x",
            ));
        }
        if let Some(parent) = request.object_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&request.object_path, b"!<arch>\n")?;
        Ok(())
    }
}
