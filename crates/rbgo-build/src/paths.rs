//! Lexical path helpers shared by scanning, resolution and compilation.
//!
//! Nothing here touches the filesystem except [`absolutize`], which reads the
//! current directory. Symlinks are deliberately not resolved: package identity
//! is the path the user (or the watcher) reported.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Make `path` absolute against the current directory and normalize it.
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize(&joined)
}

/// Remove `.` components and fold `..` into the preceding component.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Render a relative path as a slash separated import identifier.
pub fn import_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn a slash separated import identifier into a platform path.
pub fn import_path(name: &str) -> PathBuf {
    name.split('/').filter(|s| !s.is_empty()).collect()
}

/// Format a path for the compiler's command line.
///
/// Relative paths get an explicit `./` so the Go tool treats them as
/// directories rather than import paths.
pub fn command_arg(path: &Path) -> String {
    let s = path.to_string_lossy();
    if s.is_empty() {
        return ".".to_string();
    }
    if path.is_absolute() || s.starts_with("./") || s.starts_with("../") || s == "." {
        return s.into_owned();
    }
    format!("./{}", s)
}
