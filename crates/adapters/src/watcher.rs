// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File watcher coupling (§4.6): wraps `notify` + `notify-debouncer-full` and
//! classifies surviving events into the categories the supervisor's event
//! loop acts on. Classification here only distinguishes "which kind of
//! watched file is this", not "which targets does it affect" — that
//! cross-referencing against each target's import closure happens in the
//! engine crate, which owns the `WatchedFile` set.

use async_trait::async_trait;
use elm_watch_core::{AbsolutePath, FileClassification};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// A single coalesced filesystem change, already resolved to an absolute,
/// symlink-resolved path (§4.6: "the core debounces bursts... resolves
/// symlinks").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWatchEvent {
    pub path: AbsolutePath,
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("failed to start watching {path}: {source}")]
    Start { path: PathBuf, #[source] source: notify::Error },
    #[error("watcher stopped unexpectedly: {0}")]
    Stopped(String),
}

/// Classifies one watched path against the set of files the supervisor
/// currently cares about (§4.6). `config_path` and `scripts` are supplied by
/// the caller since classification needs knowledge of the live `Project`.
pub fn classify(
    path: &Path,
    config_path: &Path,
    manifest_paths: &[PathBuf],
    elm_source_paths: &[PathBuf],
    postprocess_script_paths: &[PathBuf],
) -> FileClassification {
    if path == config_path {
        FileClassification::ConfigFile
    } else if manifest_paths.iter().any(|p| p == path) {
        FileClassification::ElmManifest
    } else if postprocess_script_paths.iter().any(|p| p == path) {
        FileClassification::PostprocessScript
    } else if elm_source_paths.iter().any(|p| p == path) {
        FileClassification::ElmSource
    } else {
        FileClassification::DerivedInput
    }
}

/// Debounced raw filesystem watching, decoupled from classification so it
/// can be faked in tests (§4.6, §9 test hook `__ELM_WATCH_LOADING_MESSAGE_DELAY`
/// governs a different timer, not this one).
#[async_trait]
pub trait FileWatcherAdapter: Send + Sync + 'static {
    /// Begin watching `root` recursively. Returns a receiver of debounced,
    /// coalesced-by-path events.
    async fn watch(&self, root: &AbsolutePath, debounce: Duration) -> Result<mpsc::Receiver<RawWatchEvent>, WatcherError>;
}

pub mod real {
    use super::*;
    use notify::RecursiveMode;
    use notify_debouncer_full::{new_debouncer, DebouncedEvent};
    use std::collections::HashSet;

    #[derive(Clone, Copy, Default)]
    pub struct RealFileWatcher;

    #[async_trait]
    impl FileWatcherAdapter for RealFileWatcher {
        async fn watch(&self, root: &AbsolutePath, debounce: Duration) -> Result<mpsc::Receiver<RawWatchEvent>, WatcherError> {
            let (tx, rx) = mpsc::channel(256);
            let root_path = root.as_path().to_path_buf();

            let (debounced_tx, mut debounced_rx) = mpsc::unbounded_channel::<Vec<DebouncedEvent>>();
            let mut debouncer = new_debouncer(debounce, None, move |result: Result<Vec<DebouncedEvent>, _>| {
                if let Ok(events) = result {
                    let _ = debounced_tx.send(events);
                }
            })
            .map_err(|source| WatcherError::Start { path: root_path.clone(), source })?;

            debouncer
                .watch(&root_path, RecursiveMode::Recursive)
                .map_err(|source| WatcherError::Start { path: root_path.clone(), source })?;

            tokio::spawn(async move {
                // Keep the debouncer alive for the lifetime of the forwarding task.
                let _debouncer = debouncer;
                let mut seen_this_batch = HashSet::new();
                while let Some(events) = debounced_rx.recv().await {
                    seen_this_batch.clear();
                    for event in events {
                        for path in event.event.paths {
                            let resolved = std::fs::canonicalize(&path).unwrap_or(path);
                            if !seen_this_batch.insert(resolved.clone()) {
                                continue;
                            }
                            let Ok(abs) = AbsolutePath::new(resolved) else { continue };
                            if tx.send(RawWatchEvent { path: abs }).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });

            Ok(rx)
        }
    }
}

pub use real::RealFileWatcher;

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;

    /// A watcher whose events are driven entirely by the test: `emit` pushes
    /// a batch, `watch` just hands back the receiving end.
    pub struct FakeFileWatcher {
        tx: mpsc::Sender<RawWatchEvent>,
        rx: parking_lot::Mutex<Option<mpsc::Receiver<RawWatchEvent>>>,
    }

    impl FakeFileWatcher {
        pub fn new() -> Self {
            let (tx, rx) = mpsc::channel(256);
            Self { tx, rx: parking_lot::Mutex::new(Some(rx)) }
        }

        pub async fn emit(&self, path: AbsolutePath) {
            let _ = self.tx.send(RawWatchEvent { path }).await;
        }
    }

    impl Default for FakeFileWatcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl FileWatcherAdapter for FakeFileWatcher {
        async fn watch(&self, _root: &AbsolutePath, _debounce: Duration) -> Result<mpsc::Receiver<RawWatchEvent>, WatcherError> {
            self.rx.lock().take().ok_or_else(|| WatcherError::Stopped("watch() called twice on FakeFileWatcher".to_string()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeFileWatcher;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_config_file() {
        let config = PathBuf::from("/proj/elm-watch.json");
        let result = classify(&config, &config, &[], &[], &[]);
        assert_eq!(result, FileClassification::ConfigFile);
    }

    #[test]
    fn classifies_manifest_over_unrelated() {
        let config = PathBuf::from("/proj/elm-watch.json");
        let manifest = PathBuf::from("/proj/elm.json");
        let result = classify(&manifest, &config, &[manifest.clone()], &[], &[]);
        assert_eq!(result, FileClassification::ElmManifest);
    }

    #[test]
    fn classifies_elm_source() {
        let config = PathBuf::from("/proj/elm-watch.json");
        let src = PathBuf::from("/proj/src/Main.elm");
        let result = classify(&src, &config, &[], &[src.clone()], &[]);
        assert_eq!(result, FileClassification::ElmSource);
    }

    #[test]
    fn classifies_postprocess_script() {
        let config = PathBuf::from("/proj/elm-watch.json");
        let script = PathBuf::from("/proj/postprocess.js");
        let result = classify(&script, &config, &[], &[], &[script.clone()]);
        assert_eq!(result, FileClassification::PostprocessScript);
    }

    #[test]
    fn unknown_path_is_derived_input() {
        let config = PathBuf::from("/proj/elm-watch.json");
        let other = PathBuf::from("/proj/README.md");
        let result = classify(&other, &config, &[], &[], &[]);
        assert_eq!(result, FileClassification::DerivedInput);
    }

    #[tokio::test]
    async fn fake_watcher_delivers_emitted_events() {
        let watcher = fake::FakeFileWatcher::new();
        let root = AbsolutePath::new(PathBuf::from("/proj")).expect("absolute");
        let mut rx = watcher.watch(&root, Duration::from_millis(10)).await.expect("watch");
        watcher.emit(root.clone()).await;
        let event = rx.recv().await.expect("event");
        assert_eq!(event.path, root);
    }
}
