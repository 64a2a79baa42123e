// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Absolute path values (§2: "Path & process primitives").

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A path known to be absolute. The supervisor never carries relative paths
/// across a component boundary — every path that crosses into the resolver,
/// the compiler driver, or the watcher is an `AbsolutePath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsolutePath(PathBuf);

#[derive(Debug, thiserror::Error)]
#[error("path is not absolute: {0}")]
pub struct NotAbsoluteError(PathBuf);

impl AbsolutePath {
    /// Wrap a path that is already absolute.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, NotAbsoluteError> {
        let path = path.into();
        if path.is_absolute() {
            Ok(Self(path))
        } else {
            Err(NotAbsoluteError(path))
        }
    }

    /// Resolve `path` relative to `self` (which must be a directory), then
    /// normalize `.`/`..` components lexically — the file does not need to
    /// exist for this to succeed.
    pub fn join_normalized(&self, path: impl AsRef<Path>) -> Self {
        let joined = self.0.join(path);
        Self(normalize_lexically(&joined))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    pub fn ends_with_extension(&self, ext: &str) -> bool {
        self.0.extension().and_then(|e| e.to_str()).map(|e| e == ext).unwrap_or(false)
    }

    pub fn display(&self) -> std::path::Display<'_> {
        self.0.display()
    }
}

impl std::fmt::Display for AbsolutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for AbsolutePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

fn normalize_lexically(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_relative_paths() {
        assert!(AbsolutePath::new("src/Main.elm").is_err());
    }

    #[test]
    fn normalizes_dot_dot() {
        let root = AbsolutePath::new("/project/src").expect("absolute");
        let joined = root.join_normalized("../elm.json");
        assert_eq!(joined.as_path(), Path::new("/project/elm.json"));
    }

    #[test]
    fn detects_js_extension() {
        let p = AbsolutePath::new("/out/main.js").expect("absolute");
        assert!(p.ends_with_extension("js"));
    }
}
