//! Compiler invocation

use crate::error::{BuildError, BuildResult};
use crate::paths::command_arg;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::info;

/// Environment variable the workspace root is prepended to
pub const WORKSPACE_PATH_VAR: &str = "GOPATH";

#[cfg(windows)]
const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: &str = ":";

/// Everything the compiler needs to build one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Import name of the package being built (for diagnostics)
    pub package: String,
    pub source_path: PathBuf,
    pub object_path: PathBuf,
    pub work_dir: PathBuf,
    /// Complete environment of the compiler process
    pub env: Vec<(OsString, OsString)>,
}

impl CompileRequest {
    /// Value of `key` in the request environment
    pub fn env_var(&self, key: &str) -> Option<&OsString> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Environment for a compiler run from `work_dir`.
///
/// Starts from `inherited` and prepends `work_dir` to any existing
/// [`WORKSPACE_PATH_VAR`] value.
pub fn compiler_env(
    work_dir: &std::path::Path,
    inherited: impl IntoIterator<Item = (OsString, OsString)>,
) -> Vec<(OsString, OsString)> {
    let mut previous: Option<OsString> = None;
    let mut env: Vec<(OsString, OsString)> = inherited
        .into_iter()
        .filter(|(key, value)| {
            if key == WORKSPACE_PATH_VAR {
                previous = Some(value.clone());
                false
            } else {
                true
            }
        })
        .collect();

    let mut value = work_dir.as_os_str().to_os_string();
    if let Some(previous) = previous.filter(|v| !v.is_empty()) {
        value.push(PATH_LIST_SEPARATOR);
        value.push(previous);
    }
    env.push((OsString::from(WORKSPACE_PATH_VAR), value));
    env
}

/// External compiler collaborator
pub trait Compiler: Send + Sync {
    /// Build one package; failures carry the compiler's diagnostics.
    fn compile(&self, request: &CompileRequest) -> BuildResult<()>;
}

impl<C: Compiler + ?Sized> Compiler for Arc<C> {
    fn compile(&self, request: &CompileRequest) -> BuildResult<()> {
        (**self).compile(request)
    }
}

/// Runs `<program> build -o <object> <source>`
#[derive(Debug, Clone)]
pub struct GoCompiler {
    program: String,
}

impl Default for GoCompiler {
    fn default() -> Self {
        Self::new("go")
    }
}

impl GoCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command line arguments for `request`
    pub fn arguments(&self, request: &CompileRequest) -> Vec<String> {
        vec![
            "build".to_string(),
            "-o".to_string(),
            command_arg(&request.object_path),
            command_arg(&request.source_path),
        ]
    }
}

impl Compiler for GoCompiler {
    fn compile(&self, request: &CompileRequest) -> BuildResult<()> {
        if let Some(parent) = request.object_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        let args = self.arguments(request);
        info!("{} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&request.work_dir)
            .env_clear()
            .envs(request.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::io(&self.program, e))?
            .wait_with_output()
            .map_err(|e| BuildError::io(&self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildError::compiler_failed(
                &request.package,
                stderr.trim_end(),
            ));
        }
        Ok(())
    }
}
