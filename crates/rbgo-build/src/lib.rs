//! rbgo build infrastructure
//!
//! Keeps the compiled archives of a GOPATH-style Go workspace up to date:
//! - Package discovery and scanning, including the `vendor` namespace
//! - Project root inference for vendored packages
//! - A live import graph with referrers and missing imports
//! - Dependency-first incremental builds
//! - Filesystem notification classification and debouncing

pub mod coalescer;
pub mod compiler;
pub mod error;
pub mod event;
pub mod package;
pub mod paths;
pub mod repository;
pub mod root_resolver;
pub mod source;
pub mod task;
pub mod watcher;
pub mod workspace;

// Re-export main types
pub use coalescer::{dedup_consecutive, EventCoalescer};
pub use compiler::{compiler_env, CompileRequest, Compiler, GoCompiler};
pub use error::{BuildError, BuildResult};
pub use event::{Event, EventClassifier, EventKind, FsNotification};
pub use package::{artifact_dir_for, default_artifact_dir, Package, SourceLayout};
pub use repository::PackageRepository;
pub use root_resolver::{PackageRootResolver, DEFAULT_PACKAGE_ROOTS};
pub use source::{GoSourceScanner, SourceFile, SourceScanner};
pub use task::{build_target, BuildReport, BuildTask, TaskFactory};
pub use watcher::{BuildSummary, WatchConfig, Watcher};
pub use workspace::{ExcludeDirs, Workspace, WorkspaceOptions, DEFAULT_EXCLUDE_DIRS};
