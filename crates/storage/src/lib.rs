// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Persisted state file I/O (§3 PersistedState): the port chosen on first
//! run and each target's last compilation mode, read once at startup and
//! written atomically at each commit point. A failure to write is fatal and
//! surfaced (§5 "Fatal and surfaced: ... cannot write persisted state") since
//! the port is reused across runs, so callers must see the error rather than
//! silently continuing on a write failure.

use elm_watch_core::AbsolutePath;
use elm_watch_wire::{PersistedStateDecodeError, PersistedStateFile};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("failed to decode {path}: {source}")]
    Decode { path: PathBuf, source: PersistedStateDecodeError },
}

/// `elm-stuff/elm-watch-stuff.json`, relative to the project root (§3, §6).
pub fn default_state_path(project_root: &AbsolutePath) -> AbsolutePath {
    project_root.join_normalized("elm-stuff/elm-watch-stuff.json")
}

/// Read the persisted state, if any. A missing file is a first run, not an
/// error: returns `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<PersistedStateFile>, StorageError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let decoded =
                PersistedStateFile::decode(&bytes).map_err(|source| StorageError::Decode { path: path.to_path_buf(), source })?;
            Ok(Some(decoded))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StorageError::Read { path: path.to_path_buf(), source }),
    }
}

/// Write the persisted state atomically: write to a sibling temp file, then
/// rename over the real path (§5 "Shared resources": "written atomically
/// (write-temp-then-rename) only from the supervisor task").
pub fn save(path: &Path, state: &PersistedStateFile) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StorageError::Write { path: path.to_path_buf(), source })?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let json = state.encode_pretty();
    std::fs::write(&tmp_path, json.as_bytes()).map_err(|source| StorageError::Write { path: tmp_path.clone(), source })?;
    std::fs::rename(&tmp_path, path).map_err(|source| StorageError::Write { path: path.to_path_buf(), source })?;
    tracing::debug!(path = %path.display(), "wrote persisted state");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_watch_core::CompilationMode;
    use indexmap::IndexMap;
    use tempfile::tempdir;

    fn sample() -> PersistedStateFile {
        let mut targets = IndexMap::new();
        targets.insert("Main".to_string(), elm_watch_wire::PersistedTargetState { compilation_mode: CompilationMode::Debug });
        PersistedStateFile { port: 8123, targets }
    }

    #[test]
    fn missing_file_is_first_run() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("elm-watch-stuff.json");
        assert_eq!(load(&path).expect("loads"), None);
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/elm-watch-stuff.json");
        let state = sample();
        save(&path, &state).expect("saves");
        let loaded = load(&path).expect("loads").expect("present");
        assert_eq!(loaded, state);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("elm-watch-stuff.json");
        save(&path, &sample()).expect("saves");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported_as_decode_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("elm-watch-stuff.json");
        std::fs::write(&path, b"not json").expect("write");
        assert!(matches!(load(&path), Err(StorageError::Decode { .. })));
    }
}
