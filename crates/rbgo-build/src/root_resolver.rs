//! Project root inference for vendored packages
//!
//! A vendored import like `github.com/org/repo/sub/pkg` belongs to the project
//! checked out at `vendor/github.com/org/repo`. Hosting-path patterns give a
//! first guess; the directory tree is consulted when that guess names a bare
//! namespace directory instead of a checkout.

use crate::error::{BuildError, BuildResult};
use crate::paths::{import_name, import_path};
use crate::source::SourceScanner;
use regex::Regex;
use std::path::Path;

/// Hosting-path shapes recognized out of the box
pub const DEFAULT_PACKAGE_ROOTS: &[&str] = &[
    "golang.org/x/[a-zA-Z0-9_-]+",
    "github.com/[a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+",
    "bitbucket.org/[a-zA-Z0-9_-]+/[a-zA-Z0-9_-]+",
];

/// Pattern based resolver mapping import identifiers to project roots
#[derive(Debug, Clone, Default)]
pub struct PackageRootResolver {
    patterns: Vec<Regex>,
}

impl PackageRootResolver {
    /// Create a resolver with no patterns
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with [`DEFAULT_PACKAGE_ROOTS`]
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();
        for pattern in DEFAULT_PACKAGE_ROOTS {
            // Built-in patterns are known to compile
            if let Ok(regex) = Self::compile(pattern) {
                resolver.patterns.push(regex);
            }
        }
        resolver
    }

    fn compile(pattern: &str) -> BuildResult<Regex> {
        Regex::new(&format!("^(?:{})", pattern)).map_err(|error| BuildError::InvalidPattern {
            pattern: pattern.to_string(),
            error,
        })
    }

    /// Add a pattern; it is anchored at the start of the import identifier.
    pub fn add_pattern(&mut self, pattern: &str) -> BuildResult<()> {
        self.patterns.push(Self::compile(pattern)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Longest pattern match that ends on a path segment boundary
    pub fn find<'a>(&self, import: &'a str) -> Option<&'a str> {
        self.patterns
            .iter()
            .filter_map(|re| re.find(import))
            .map(|m| m.end())
            .filter(|&end| end == import.len() || import[end..].starts_with('/'))
            .max()
            .map(|end| &import[..end])
    }

    /// Project root, relative to `vendor_root`, of the vendored package `package_name`.
    ///
    /// A pattern match that equals the package, or that names a directory
    /// with sources of its own, is taken as is. Otherwise the package directory
    /// is climbed one parent at a time while the parent still has sources,
    /// stopping below the matched prefix (or the vendor root when nothing
    /// matched).
    pub fn vendor_project_name(
        &self,
        vendor_root: &Path,
        package_name: &str,
        scanner: &dyn SourceScanner,
    ) -> BuildResult<String> {
        let prefix = self.find(package_name);
        if prefix == Some(package_name) {
            return Ok(package_name.to_string());
        }

        let boundary = match prefix {
            Some(prefix) => {
                let project_root = vendor_root.join(import_path(prefix));
                if !scanner.scan_dir(&project_root)?.is_empty() {
                    return Ok(prefix.to_string());
                }
                project_root
            }
            None => vendor_root.to_path_buf(),
        };

        let unresolved = || BuildError::UnresolvedRoot {
            package: package_name.to_string(),
        };

        let mut source_dir = vendor_root.join(import_path(package_name));
        if scanner.scan_dir(&source_dir)?.is_empty() {
            return Err(unresolved());
        }
        while let Some(next) = source_dir.parent() {
            if next == boundary || !next.starts_with(&boundary) {
                break;
            }
            if scanner.scan_dir(next)?.is_empty() {
                break;
            }
            source_dir = next.to_path_buf();
        }

        source_dir
            .strip_prefix(vendor_root)
            .ok()
            .map(import_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("golang.org/x/crypto/ssh", Some("golang.org/x/crypto"))]
    #[case("golang.org/x/crypto", Some("golang.org/x/crypto"))]
    #[case("github.com/golang/crypto/ssh", Some("github.com/golang/crypto"))]
    #[case("github.com/golang/crypto", Some("github.com/golang/crypto"))]
    #[case("bitbucket.org/team/repo/x/y", Some("bitbucket.org/team/repo"))]
    #[case("github.com/golang", None)]
    #[case("piyo", None)]
    #[case("example.com/github.com/a/b", None)]
    fn test_find_defaults(#[case] import: &str, #[case] expected: Option<&str>) {
        let resolver = PackageRootResolver::with_defaults();
        assert_eq!(resolver.find(import), expected);
    }

    #[test]
    fn test_find_prefers_longest_match() {
        let mut resolver = PackageRootResolver::new();
        resolver.add_pattern("example.org/[a-z]+").unwrap();
        resolver.add_pattern("example.org/[a-z]+/[a-z]+").unwrap();
        assert_eq!(
            resolver.find("example.org/group/project/sub"),
            Some("example.org/group/project")
        );
    }

    #[test]
    fn test_find_requires_segment_boundary() {
        let mut resolver = PackageRootResolver::new();
        resolver.add_pattern("example.org/ab").unwrap();
        assert_eq!(resolver.find("example.org/abc"), None);
        assert_eq!(resolver.find("example.org/ab/c"), Some("example.org/ab"));
    }

    #[test]
    fn test_invalid_pattern() {
        let mut resolver = PackageRootResolver::new();
        let result = resolver.add_pattern("github.com/(");
        assert!(matches!(result, Err(BuildError::InvalidPattern { .. })));
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_defaults_loaded() {
        assert_eq!(
            PackageRootResolver::with_defaults().len(),
            DEFAULT_PACKAGE_ROOTS.len()
        );
    }
}
