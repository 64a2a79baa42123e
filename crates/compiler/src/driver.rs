// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use elm_watch_adapters::{CommandAdapter, CommandOutput, CommandSpec, ExitReason, SpawnError};
use elm_watch_core::{AbsolutePath, CompilationMode};
use elm_watch_wire::{CompilerReport, CompilerReportError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Which invocation shape to run (§4.1): typecheck-only never writes an
/// artifact, make writes one at `output`, install forces package downloads
/// with a disposable compile in a scratch directory.
#[derive(Debug, Clone)]
pub enum CompileMode {
    TypecheckOnly,
    Make { output: AbsolutePath },
    Install { scratch_dir: AbsolutePath, dummy_input: AbsolutePath },
}

#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub project_root: AbsolutePath,
    pub inputs: Vec<AbsolutePath>,
    pub mode: CompileMode,
    pub compilation_mode: CompilationMode,
    pub env: HashMap<String, String>,
}

/// The outcome of one compiler invocation (§4.1). `Success` for `Make`
/// carries nothing beyond the exit — the artifact was written to disk by
/// the compiler itself; callers read it back.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    Success,
    StructuredCompileError(CompilerReport),
    /// stderr began with `{` but did not parse; raw bytes were written to
    /// `diagnostic_path` for human inspection (§4.1, §9).
    JsonParseError { diagnostic_path: AbsolutePath, source: CompilerReportErrorDisplay },
    UnexpectedOutput { exit: ExitReason, stdout: Vec<u8>, stderr: Vec<u8> },
    CommandNotFound(String),
    OtherSpawnError(String),
}

/// `CompilerReportError` isn't `Clone`/`PartialEq`-friendly through
/// `serde_json::Error`; store its rendered message instead so
/// `CompileOutcome` stays ordinary data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerReportErrorDisplay(pub String);

impl From<CompilerReportError> for CompilerReportErrorDisplay {
    fn from(err: CompilerReportError) -> Self {
        Self(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to write diagnostic file {path}: {source}")]
    DiagnosticWrite { path: std::path::PathBuf, #[source] source: std::io::Error },
}

pub struct CompilerDriver {
    adapter: Arc<dyn CommandAdapter>,
    compiler_path: String,
    diagnostics_dir: AbsolutePath,
}

impl CompilerDriver {
    pub fn new(adapter: Arc<dyn CommandAdapter>, compiler_path: impl Into<String>, diagnostics_dir: AbsolutePath) -> Self {
        Self { adapter, compiler_path: compiler_path.into(), diagnostics_dir }
    }

    fn build_spec(&self, request: &CompileRequest) -> CommandSpec {
        let mut spec = CommandSpec::new(self.compiler_path.clone(), request.project_root.as_path().to_path_buf())
            .arg("make")
            .args(request.inputs.iter().map(|p| p.as_path().display().to_string()))
            .arg("--report=json");

        match &request.compilation_mode {
            CompilationMode::Standard => {}
            CompilationMode::Debug => spec = spec.arg("--debug"),
            CompilationMode::Optimize => spec = spec.arg("--optimize"),
        }

        let output = match &request.mode {
            CompileMode::TypecheckOnly => "/dev/null".to_string(),
            CompileMode::Make { output } => output.as_path().display().to_string(),
            CompileMode::Install { .. } => "/dev/null".to_string(),
        };
        spec = spec.arg(format!("--output={output}"));

        for (key, value) in &request.env {
            spec = spec.env(key, value);
        }
        spec
    }

    /// Run one compile invocation and classify the result (§4.1). Never
    /// retries.
    pub async fn compile(&self, request: &CompileRequest, diagnostic_id: &str) -> Result<CompileOutcome, DriverError> {
        let spec = self.build_spec(request);
        let result = self.adapter.run(spec).await;

        match result {
            Err(SpawnError::CommandNotFound(cmd)) => Ok(CompileOutcome::CommandNotFound(cmd)),
            Err(SpawnError::Other { source, .. }) => Ok(CompileOutcome::OtherSpawnError(source.to_string())),
            Ok(output) => Ok(self.classify(output, diagnostic_id)?),
        }
    }

    fn classify(&self, output: CommandOutput, diagnostic_id: &str) -> Result<CompileOutcome, DriverError> {
        let exit_zero = matches!(output.exit, ExitReason::Code(0));
        let silent = output.stdout.is_empty() && output.stderr.is_empty();

        if exit_zero && silent {
            return Ok(CompileOutcome::Success);
        }

        let exit_one = matches!(output.exit, ExitReason::Code(1));
        let stderr_looks_like_json = output.stderr.first() == Some(&b'{');

        if exit_one && stderr_looks_like_json {
            return match CompilerReport::parse(&output.stderr) {
                Ok(report) => Ok(CompileOutcome::StructuredCompileError(report)),
                Err(source) => {
                    let diagnostic_path = self.write_diagnostic(diagnostic_id, &output.stderr)?;
                    Ok(CompileOutcome::JsonParseError { diagnostic_path, source: source.into() })
                }
            };
        }

        Ok(CompileOutcome::UnexpectedOutput { exit: output.exit, stdout: output.stdout, stderr: output.stderr })
    }

    fn write_diagnostic(&self, diagnostic_id: &str, bytes: &[u8]) -> Result<AbsolutePath, DriverError> {
        let path = self.diagnostics_dir.join_normalized(format!("compile-error-{diagnostic_id}.json.txt"));
        std::fs::create_dir_all(self.diagnostics_dir.as_path())
            .map_err(|source| DriverError::DiagnosticWrite { path: path.as_path().to_path_buf(), source })?;
        std::fs::write(path.as_path(), bytes)
            .map_err(|source| DriverError::DiagnosticWrite { path: path.as_path().to_path_buf(), source })?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_watch_adapters::FakeCommandAdapter;
    use std::sync::Arc;

    fn driver(responder: elm_watch_adapters::command::fake::FakeResponder, diagnostics_dir: AbsolutePath) -> CompilerDriver {
        CompilerDriver::new(Arc::new(FakeCommandAdapter::new(responder)), "elm", diagnostics_dir)
    }

    fn request(tmp: &AbsolutePath) -> CompileRequest {
        CompileRequest {
            project_root: tmp.clone(),
            inputs: vec![tmp.join_normalized("src/Main.elm")],
            mode: CompileMode::Make { output: tmp.join_normalized("main.js") },
            compilation_mode: CompilationMode::Standard,
            env: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn silent_exit_zero_is_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        let d = driver(
            Arc::new(|_spec| {
                Ok(CommandOutput { exit: ExitReason::Code(0), stdout: vec![], stderr: vec![], stdin_write_failed: false })
            }),
            root.clone(),
        );
        let outcome = d.compile(&request(&root), "t1").await.expect("ran");
        assert!(matches!(outcome, CompileOutcome::Success));
    }

    #[tokio::test]
    async fn structured_json_error_is_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        let json = br#"{"type":"error","path":"elm.json","title":"BAD JSON","message":["oops"]}"#.to_vec();
        let d = driver(
            Arc::new(move |_spec| {
                Ok(CommandOutput { exit: ExitReason::Code(1), stdout: vec![], stderr: json.clone(), stdin_write_failed: false })
            }),
            root.clone(),
        );
        let outcome = d.compile(&request(&root), "t2").await.expect("ran");
        assert!(matches!(outcome, CompileOutcome::StructuredCompileError(_)));
    }

    #[tokio::test]
    async fn malformed_json_writes_diagnostic_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        let d = driver(
            Arc::new(|_spec| {
                Ok(CommandOutput { exit: ExitReason::Code(1), stdout: vec![], stderr: b"{not json".to_vec(), stdin_write_failed: false })
            }),
            root.clone(),
        );
        let outcome = d.compile(&request(&root), "t3").await.expect("ran");
        match outcome {
            CompileOutcome::JsonParseError { diagnostic_path, .. } => {
                assert!(diagnostic_path.as_path().exists());
            }
            other => panic!("expected JsonParseError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_without_json_is_unexpected_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        let d = driver(
            Arc::new(|_spec| {
                Ok(CommandOutput { exit: ExitReason::Code(2), stdout: vec![], stderr: b"boom".to_vec(), stdin_write_failed: false })
            }),
            root.clone(),
        );
        let outcome = d.compile(&request(&root), "t4").await.expect("ran");
        assert!(matches!(outcome, CompileOutcome::UnexpectedOutput { .. }));
    }

    #[tokio::test]
    async fn command_not_found_is_surfaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        let d = driver(Arc::new(|_spec| Err(SpawnError::CommandNotFound("elm".to_string()))), root.clone());
        let outcome = d.compile(&request(&root), "t5").await.expect("ran");
        assert!(matches!(outcome, CompileOutcome::CommandNotFound(_)));
    }
}
