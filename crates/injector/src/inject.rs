// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::anchors::anchor_table;
use elm_watch_core::AbsolutePath;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Bytes of an injected module plus the timestamp derived from them.
/// Identical input bytes always produce an identical `Artifact`-compatible
/// pair (§8 "Injection determinism").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectedModule {
    pub code: Vec<u8>,
    pub compiled_timestamp: u64,
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("anchor `{anchor}` probe did not match ({purpose}); raw input written to {diagnostic_path}")]
    ProbeMiss { anchor: &'static str, purpose: &'static str, diagnostic_path: AbsolutePath },
    #[error("failed to write diagnostic file {path}: {source}")]
    DiagnosticWrite { path: std::path::PathBuf, #[source] source: std::io::Error },
}

pub struct Injector {
    diagnostics_dir: AbsolutePath,
}

impl Injector {
    pub fn new(diagnostics_dir: AbsolutePath) -> Self {
        Self { diagnostics_dir }
    }

    /// Rewrite `compiled_js` for hot-reload participation (§4.2). Applies
    /// every anchor's probe, then its replace, in table order; fails at the
    /// first probe miss.
    pub fn inject(&self, compiled_js: &[u8], diagnostic_id: &str) -> Result<InjectedModule, InjectError> {
        let source = String::from_utf8_lossy(compiled_js);
        let mut rewritten = source.into_owned();

        for anchor in anchor_table() {
            if !anchor.probe.is_match(&rewritten) {
                let diagnostic_path = self.write_diagnostic(diagnostic_id, anchor.name, compiled_js)?;
                return Err(InjectError::ProbeMiss { anchor: anchor.name, purpose: anchor.purpose, diagnostic_path });
            }
            rewritten = anchor.replace.replace_all(&rewritten, anchor.replacement).into_owned();
        }

        let code = rewritten.into_bytes();
        let compiled_timestamp = deterministic_timestamp(&code);
        Ok(InjectedModule { code, compiled_timestamp })
    }

    fn write_diagnostic(&self, diagnostic_id: &str, anchor_name: &str, bytes: &[u8]) -> Result<AbsolutePath, InjectError> {
        let text = String::from_utf8_lossy(bytes);
        let first_20_lines = text.lines().take(20).collect::<Vec<_>>().join("\n");
        let path = self.diagnostics_dir.join_normalized(format!("inject-error-{diagnostic_id}-{anchor_name}.txt"));
        std::fs::create_dir_all(self.diagnostics_dir.as_path())
            .map_err(|source| InjectError::DiagnosticWrite { path: path.as_path().to_path_buf(), source })?;
        std::fs::write(path.as_path(), first_20_lines)
            .map_err(|source| InjectError::DiagnosticWrite { path: path.as_path().to_path_buf(), source })?;
        Ok(path)
    }
}

/// A stable hash of the injected bytes, used as the compiledTimestamp
/// surrogate so identical input always yields an identical stamp (§8).
fn deterministic_timestamp(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_INPUT: &str = "_Platform_initialize(a,b,c); _VirtualDom_virtualize(x); _Debug_crash(1);";

    #[test]
    fn injects_all_anchors_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let injector = Injector::new(AbsolutePath::new(dir.path()).expect("absolute"));
        let result = injector.inject(VALID_INPUT.as_bytes(), "t1").expect("injects");
        let rewritten = String::from_utf8(result.code).expect("utf8");
        assert!(rewritten.contains("elm-watch-program-type"));
        assert!(rewritten.contains("elm-watch-view-hook"));
        assert!(rewritten.contains("elm-watch-debug-metadata"));
    }

    #[test]
    fn missing_anchor_fails_with_diagnostic_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let injector = Injector::new(AbsolutePath::new(dir.path()).expect("absolute"));
        let err = injector.inject(b"not elm output at all", "t2").expect_err("should fail");
        match err {
            InjectError::ProbeMiss { anchor, diagnostic_path, .. } => {
                assert_eq!(anchor, "program_constructor");
                assert!(diagnostic_path.as_path().exists());
            }
            other => panic!("expected ProbeMiss, got {other:?}"),
        }
    }

    #[test]
    fn identical_input_yields_identical_output_and_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let injector = Injector::new(AbsolutePath::new(dir.path()).expect("absolute"));
        let first = injector.inject(VALID_INPUT.as_bytes(), "t3").expect("injects");
        let second = injector.inject(VALID_INPUT.as_bytes(), "t4").expect("injects");
        assert_eq!(first.code, second.code);
        assert_eq!(first.compiled_timestamp, second.compiled_timestamp);
    }
}
