/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("No compilable sources in {}", path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Found multiple packages in {}: {first}, {second}", path.display())]
    AmbiguousPackage {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("Cannot determine the vendored project root of '{package}'")]
    UnresolvedRoot { package: String },

    #[error("Package not found '{import}' (imported by {package})")]
    MissingImport { package: String, import: String },

    #[error("Circular dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Compilation failed for package '{package}': {output}")]
    CompilerFailed { package: String, output: String },

    #[error("Package not found: `{}`", path.display())]
    PackageNotFound { path: PathBuf },

    #[error("Package '{package}' is still stale after a successful build")]
    StaleAfterBuild { package: String },

    #[error("Cannot build {}: {message}", path.display())]
    ScanFailed { path: PathBuf, message: String },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid package root pattern '{pattern}': {error}")]
    InvalidPattern {
        pattern: String,
        error: regex::Error,
    },

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error at {}: {error}", path.display())]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a source-not-found error
    pub fn source_not_found(path: impl Into<PathBuf>) -> Self {
        Self::SourceNotFound { path: path.into() }
    }

    /// Create a parse error
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a compiler failure carrying the captured diagnostics
    pub fn compiler_failed(package: impl Into<String>, output: impl ToString) -> Self {
        Self::CompilerFailed {
            package: package.into(),
            output: output.to_string(),
        }
    }

    /// Whether this is the "no compilable sources" condition.
    ///
    /// That outcome is routine while walking a tree and is not worth a warning.
    pub fn is_source_not_found(&self) -> bool {
        matches!(self, Self::SourceNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_not_found_predicate() {
        assert!(BuildError::source_not_found("a/b").is_source_not_found());
        assert!(!BuildError::CyclicDependency("a -> a".into()).is_source_not_found());
    }

    #[test]
    fn test_compiler_failed_message_carries_output() {
        let err = BuildError::compiler_failed("hoge/piyo", "undefined: x");
        let msg = err.to_string();
        assert!(msg.contains("hoge/piyo"));
        assert!(msg.contains("undefined: x"));
    }
}
