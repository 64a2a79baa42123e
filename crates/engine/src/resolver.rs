// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency/input resolver (§4.5). Resolves a target's declared input
//! module specifiers to files, finds the shared project manifest, and
//! computes a best-effort transitive import closure by reading source files
//! textually — Elm's import graph does not require invoking the compiler to
//! approximate for watcher purposes.

use elm_watch_core::AbsolutePath;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("input file not found: {0}")]
    InputsNotFound(String),
    #[error("failed to resolve input {path}: {message}")]
    InputsFailedToResolve { path: String, message: String },
    #[error("duplicate input: {0}")]
    DuplicateInputs(String),
    #[error("no elm.json found for input {0}")]
    ElmJsonNotFound(String),
    #[error("inputs resolve to more than one elm.json: {0} and {1}")]
    NonUniqueElmJson(String, String),
    #[error("inputs span multiple filesystem roots (Windows multi-drive)")]
    NoCommonRoot,
}

/// The resolver's output for one target (§3 WatchedFile, §4.5).
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub manifest_path: AbsolutePath,
    /// Best-effort transitive import closure; a partial result is still
    /// useful (§4.5: "does not prevent the already-produced artifact from
    /// being served").
    pub import_closure: Vec<AbsolutePath>,
    /// True if some transitive file in the closure could not be read —
    /// marks the watcher as possibly-incomplete without failing the whole
    /// resolve (§4.5 "TroubleReadingElmFiles").
    pub closure_incomplete: bool,
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*import\s+([A-Z][A-Za-z0-9_.]*)").expect("valid regex"))
}

fn module_header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^module\s+([A-Z][A-Za-z0-9_.]*)\s+exposing").expect("valid regex"))
}

/// Windows drive-letter prefix of a path, e.g. `Some("C:")` for
/// `C:\project\src\Main.elm` (§9 "multi-drive inputs produce NO COMMON
/// ROOT"). Checked as a string prefix rather than via `Path::components()`'s
/// `Prefix` component so the logic is testable on any OS, mirroring
/// `command_lookup`'s explicit, platform-independent pure functions.
fn drive_prefix(path: &Path) -> Option<String> {
    let s = path.to_string_lossy();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        Some(s[..2].to_ascii_uppercase())
    } else {
        None
    }
}

/// Reject inputs that don't share a filesystem root with the project root or
/// each other (§4.5 `NoCommonRoot`, §9). A no-op wherever paths carry no
/// drive prefix (every non-Windows path).
fn check_common_root(project_root: &AbsolutePath, inputs: &[AbsolutePath]) -> Result<(), ResolveError> {
    let mut roots = HashSet::new();
    if let Some(root) = drive_prefix(project_root.as_path()) {
        roots.insert(root);
    }
    for input in inputs {
        if let Some(root) = drive_prefix(input.as_path()) {
            roots.insert(root);
        }
    }
    if roots.len() > 1 {
        Err(ResolveError::NoCommonRoot)
    } else {
        Ok(())
    }
}

/// Read an input's `module X.Y exposing (..)` header and verify it names the
/// path the file actually lives at, relative to `source_root` (§3 Target
/// invariant, §4.5 step 1).
fn verify_module_header(path: &Path, source_root: &Path) -> Result<(), ResolveError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|err| ResolveError::InputsFailedToResolve { path: path.display().to_string(), message: err.to_string() })?;
    let declared_module = module_header_pattern().captures(&contents).map(|c| c[1].to_string()).ok_or_else(|| {
        ResolveError::InputsFailedToResolve { path: path.display().to_string(), message: "no `module ... exposing` header found".to_string() }
    })?;
    let expected_path = module_to_path(source_root, &declared_module);
    if expected_path == path {
        Ok(())
    } else {
        Err(ResolveError::InputsFailedToResolve {
            path: path.display().to_string(),
            message: format!("module header `{declared_module}` does not match its path (expected {})", expected_path.display()),
        })
    }
}

/// Verify each input exists, find a single shared `elm.json`, verify each
/// input's module header matches its path, and compute the best-effort
/// import closure (§4.5).
pub fn resolve(project_root: &AbsolutePath, inputs: &[AbsolutePath]) -> Result<ResolvedTarget, ResolveError> {
    let mut seen = HashSet::new();
    for input in inputs {
        if !seen.insert(input.as_path().to_path_buf()) {
            return Err(ResolveError::DuplicateInputs(input.display().to_string()));
        }
        if !input.as_path().is_file() {
            return Err(ResolveError::InputsNotFound(input.display().to_string()));
        }
    }

    check_common_root(project_root, inputs)?;

    let manifest_path = find_shared_manifest(project_root, inputs)?;
    let source_root = manifest_path.as_path().parent().map(|p| p.join("src")).unwrap_or_else(|| PathBuf::from("src"));

    for input in inputs {
        verify_module_header(input.as_path(), &source_root)?;
    }

    let mut closure = HashSet::new();
    let mut incomplete = false;
    let mut queue: VecDeque<PathBuf> = inputs.iter().map(|p| p.as_path().to_path_buf()).collect();

    while let Some(path) = queue.pop_front() {
        if !closure.insert(path.clone()) {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                for capture in import_pattern().captures_iter(&contents) {
                    let module = &capture[1];
                    let candidate = module_to_path(&source_root, module);
                    if candidate.is_file() && !closure.contains(&candidate) {
                        queue.push_back(candidate);
                    }
                }
            }
            Err(_) => incomplete = true,
        }
    }

    let import_closure = closure.into_iter().filter_map(|p| AbsolutePath::new(p).ok()).collect();

    Ok(ResolvedTarget { manifest_path, import_closure, closure_incomplete: incomplete })
}

fn module_to_path(source_root: &Path, module: &str) -> PathBuf {
    let mut path = source_root.to_path_buf();
    for segment in module.split('.') {
        path.push(segment);
    }
    path.set_extension("elm");
    path
}

fn find_shared_manifest(project_root: &AbsolutePath, inputs: &[AbsolutePath]) -> Result<AbsolutePath, ResolveError> {
    let mut found: Option<PathBuf> = None;
    for input in inputs {
        let manifest = find_manifest_upward(input.as_path(), project_root.as_path())
            .ok_or_else(|| ResolveError::ElmJsonNotFound(input.display().to_string()))?;
        match &found {
            None => found = Some(manifest),
            Some(existing) if *existing != manifest => {
                return Err(ResolveError::NonUniqueElmJson(existing.display().to_string(), manifest.display().to_string()))
            }
            Some(_) => {}
        }
    }
    let manifest = found.ok_or_else(|| ResolveError::ElmJsonNotFound("<no inputs>".to_string()))?;
    AbsolutePath::new(manifest.clone())
        .map_err(|_| ResolveError::InputsFailedToResolve { path: manifest.display().to_string(), message: "not absolute".to_string() })
}

fn find_manifest_upward(start: &Path, stop_above: &Path) -> Option<PathBuf> {
    let mut dir = start.parent()?;
    loop {
        let candidate = dir.join("elm.json");
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir == stop_above {
            return candidate.is_file().then_some(candidate);
        }
        dir = dir.parent()?;
    }
}
