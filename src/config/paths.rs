//! Path normalization and resolution for configuration values.
//!
//! Every path in [`Config`](super::Config) goes through this module:
//!
//! ```text
//! "~/blog/./posts/../pages"
//!     │ normalize()    tilde expansion + lexical `.`/`..` folding
//!     ▼
//! "/home/me/blog/pages"
//!     │ resolve(base, value)
//!     ▼
//! absolute values are kept, relative ones are joined onto `base`
//! ```
//!
//! Resolution is purely lexical; existence is checked separately so that
//! a missing directory produces a validation message instead of an I/O error.

use std::{
    env,
    path::{Component, Path, PathBuf},
};

/// Expand a leading `~` and fold `.` and `..` components without touching
/// the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let expanded = match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    };

    let mut out = PathBuf::new();
    for component in expanded.components() {
        match component {
            Component::CurDir => {}
            // `..` above the root stays at the root; a relative path keeps
            // leading `..` so that later joins still see it.
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }

    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Resolve `value` against the directory `base`.
///
/// An absolute `value` is returned unchanged regardless of `base`.
pub fn resolve(base: &Path, value: &Path) -> PathBuf {
    let value = normalize(value);
    if value.is_absolute() {
        value
    } else {
        normalize(&base.join(value))
    }
}

/// The directory a path should be resolved against: the path itself when it
/// is a directory on disk, its parent otherwise.
pub fn base_dir(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}

/// Make a path absolute, using canonicalize if the path exists.
pub fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let path = normalize(path);
        if path.is_absolute() {
            path
        } else {
            env::current_dir()
                .map(|cwd| normalize(&cwd.join(&path)))
                .unwrap_or(path)
        }
    })
}
