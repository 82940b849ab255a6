//! Package scanning against real directory trees

mod common;

use common::{go_source, Fixture};
use pretty_assertions::assert_eq;
use rbgo_build::{
    BuildError, GoSourceScanner, Package, PackageRootResolver,
};
use std::path::PathBuf;

fn example() -> Fixture {
    Fixture::with_files(&[
        (
            "hoge/piyo/piyo.go",
            go_source("piyo", &["github.com/kai-zoa/geeyoko"]).as_str(),
        ),
        ("hoge/piyo/util.go", "package piyo\n"),
        ("hoge/piyo/piyo_test.go", "package piyo\nimport \"testing\"\n"),
        ("hoge/cmd/main.go", "package main\nimport \"hoge/piyo\"\n"),
        (
            "vendor/github.com/kai-zoa/geeyoko/geeyoko.go",
            go_source("geeyoko", &["github.com/kai-zoa/yokohama"]).as_str(),
        ),
        ("vendor/github.com/kai-zoa/yokohama/yokohama.go", "package yokohama\n"),
        ("vendor/github.com/kai-zoa/yokohama/piyo/piyo.go", "package piyo\n"),
    ])
}

#[test]
fn test_scan_plain_package() {
    let fixture = example();
    let pkg = fixture.scan("hoge/piyo").unwrap();

    assert_eq!(pkg.name, "piyo");
    assert_eq!(pkg.full_name, "hoge/piyo");
    assert!(!pkg.in_vendor);
    assert_eq!(pkg.source_count, 2);
    assert_eq!(pkg.project_name, "");
    assert_eq!(pkg.watch_path, fixture.src("hoge/piyo"));
    assert_eq!(pkg.source_path, fixture.src("hoge/piyo"));
    assert_eq!(pkg.object_path, fixture.artifact("hoge/piyo.a"));
    assert_eq!(pkg.work_dir, fixture.root());
    assert!(pkg.mod_time > std::time::SystemTime::UNIX_EPOCH);
    assert_eq!(pkg.imports, vec!["github.com/kai-zoa/geeyoko"]);
    assert!(pkg.referrers.is_empty());
    assert!(pkg.missing_imports.is_empty());
}

#[test]
fn test_scan_vendored_subpackage_uses_project_root() {
    let fixture = example();
    let pkg = fixture
        .scan("vendor/github.com/kai-zoa/yokohama/piyo")
        .unwrap();

    assert_eq!(pkg.name, "piyo");
    assert_eq!(pkg.full_name, "github.com/kai-zoa/yokohama/piyo");
    assert!(pkg.in_vendor);
    assert_eq!(pkg.project_name, "github.com/kai-zoa/yokohama");
    assert_eq!(
        pkg.source_path,
        fixture.src("vendor/github.com/kai-zoa/yokohama")
    );
    assert_eq!(
        pkg.object_path,
        fixture.artifact("vendor/github.com/kai-zoa/yokohama.a")
    );
    assert_eq!(pkg.work_dir, fixture.root());
    assert!(pkg.imports.is_empty());
}

#[test]
fn test_scan_vendored_project_root() {
    let fixture = example();
    let pkg = fixture.scan("vendor/github.com/kai-zoa/geeyoko").unwrap();

    assert_eq!(pkg.name, "geeyoko");
    assert_eq!(pkg.full_name, "github.com/kai-zoa/geeyoko");
    assert_eq!(pkg.project_name, "github.com/kai-zoa/geeyoko");
    assert_eq!(pkg.imports, vec!["github.com/kai-zoa/yokohama"]);
}

#[test]
fn test_main_only_directory_is_source_not_found() {
    let fixture = example();
    let result = fixture.scan("hoge/cmd");
    assert!(matches!(result, Err(BuildError::SourceNotFound { .. })));
}

#[test]
fn test_empty_directory_is_source_not_found() {
    let fixture = example();
    std::fs::create_dir_all(fixture.src("hoge/empty")).unwrap();
    let result = fixture.scan("hoge/empty");
    assert!(result.unwrap_err().is_source_not_found());
}

#[test]
fn test_rescan_yields_identical_object_path() {
    let fixture = example();
    let layout = fixture.layout();
    let resolver = PackageRootResolver::with_defaults();
    let mut pkg = Package::new(layout, fixture.src("vendor/github.com/kai-zoa/yokohama/piyo"));

    pkg.scan(&resolver, &GoSourceScanner).unwrap();
    let first = pkg.object_path.clone();
    pkg.scan(&resolver, &GoSourceScanner).unwrap();
    assert_eq!(pkg.object_path, first);
}

#[test]
fn test_ambiguous_package_leaves_reset_state() {
    let fixture = example();
    fixture.write("mixed/a.go", "package a\n");
    fixture.write("mixed/b.go", "package b\n");

    let mut pkg = fixture.scan("hoge/piyo").unwrap();
    pkg.watch_path = fixture.src("mixed");
    let result = pkg.scan(&PackageRootResolver::with_defaults(), &GoSourceScanner);

    match result {
        Err(BuildError::AmbiguousPackage { first, second, .. }) => {
            assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
        }
        other => panic!("Expected AmbiguousPackage, got {:?}", other),
    }
    assert_eq!(pkg.full_name, "");
    assert!(pkg.imports.is_empty());
    assert_eq!(pkg.object_path, PathBuf::new());
}

#[test]
fn test_unparsable_source_fails_scan() {
    let fixture = example();
    fixture.write("broken/broken.go", "func main() {}\n");
    let result = fixture.scan("broken");
    assert!(matches!(result, Err(BuildError::Parse { .. })));
}

#[test]
fn test_vendor_root_inference_climbs_to_project() {
    let fixture = Fixture::with_files(&[
        ("vendor/example.org/group/project/project.go", "package project\n"),
        ("vendor/example.org/group/project/sub/sub.go", "package sub\n"),
    ]);
    let mut resolver = PackageRootResolver::new();
    resolver.add_pattern("example.org/[a-z]+").unwrap();

    let mut pkg = Package::new(
        fixture.layout(),
        fixture.src("vendor/example.org/group/project/sub"),
    );
    pkg.scan(&resolver, &GoSourceScanner).unwrap();

    assert_eq!(pkg.full_name, "example.org/group/project/sub");
    assert_eq!(pkg.project_name, "example.org/group/project");
    assert_eq!(
        pkg.object_path,
        fixture.artifact("vendor/example.org/group/project.a")
    );
}

#[test]
fn test_vendor_root_inference_without_pattern_match() {
    let fixture = Fixture::with_files(&[
        ("vendor/gopkg.in/yaml.v2/yaml.go", "package yaml\n"),
        ("vendor/gopkg.in/yaml.v2/inner/inner.go", "package inner\n"),
    ]);
    let pkg = fixture.scan("vendor/gopkg.in/yaml.v2/inner").unwrap();
    assert_eq!(pkg.project_name, "gopkg.in/yaml.v2");
    assert_eq!(pkg.object_path, fixture.artifact("vendor/gopkg.in/yaml.v2.a"));
}

#[test]
fn test_vendored_package_without_sourced_ancestor_is_own_root() {
    let fixture = Fixture::with_files(&[("vendor/example.org/lone/pkg/pkg.go", "package pkg\n")]);
    let pkg = fixture.scan("vendor/example.org/lone/pkg").unwrap();
    assert_eq!(pkg.project_name, "example.org/lone/pkg");
}

#[test]
fn test_source_root_without_src_suffix() {
    let dir = tempfile::tempdir().unwrap();
    let code = dir.path().join("code");
    std::fs::create_dir_all(code.join("lib")).unwrap();
    std::fs::write(code.join("lib/lib.go"), "package lib\n").unwrap();

    let layout = rbgo_build::SourceLayout::new(&code, "pkg/test_arch");
    let mut pkg = Package::new(layout, code.join("lib"));
    pkg.scan(&PackageRootResolver::with_defaults(), &GoSourceScanner)
        .unwrap();

    assert_eq!(pkg.work_dir, code);
    assert_eq!(pkg.object_path, code.join("pkg/test_arch/lib.a"));
}
