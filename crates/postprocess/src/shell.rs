// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::epipe::{classify_epipe_race, EpipeOutcome};
use elm_watch_adapters::{CommandAdapter, CommandSpec, ExitReason, SpawnError};
use elm_watch_core::{CompilationMode, RunMode};
use std::path::Path;

/// The shell post-process variant's result (§4.3): argv followed by
/// `(outputPath, compilationMode, runMode)`, compiled JS piped through
/// stdin, rewritten bytes read from stdout.
#[derive(Debug, Clone)]
pub enum ShellPostprocessOutcome {
    Success { code: Vec<u8> },
    /// Non-zero exit not attributable to the stdin race (§4.3: "target
    /// transitions to PostprocessError carrying (exit reason, stdout,
    /// stderr, command echo)").
    Failed { exit: ExitReason, stdout: Vec<u8>, stderr: Vec<u8>, command_echo: String },
    /// The user's post-process command never read stdin (§4.3, §9).
    StdinWriteError { command_echo: String },
    CommandNotFound(String),
    OtherSpawnError(String),
}

/// Run the shell post-process variant (§4.3). `argv` is the configured
/// post-process tokens minus the `elm-watch-node` discriminator check —
/// callers must have already decided this is the shell variant.
pub async fn run_shell_postprocess(
    adapter: &dyn CommandAdapter,
    argv: &[String],
    cwd: &Path,
    compiled_js: Vec<u8>,
    output_path: &str,
    compilation_mode: CompilationMode,
    run_mode: RunMode,
) -> ShellPostprocessOutcome {
    let Some((program, rest)) = argv.split_first() else {
        return ShellPostprocessOutcome::OtherSpawnError("postprocess argv is empty".to_string());
    };

    let command_echo = format!(
        "{program} {} {output_path} {compilation_mode} {run_mode}",
        rest.join(" ")
    );

    let spec = CommandSpec::new(program.clone(), cwd.to_path_buf())
        .args(rest.iter().cloned())
        .arg(output_path)
        .arg(compilation_mode.to_string())
        .arg(run_mode.to_string())
        .stdin(compiled_js);

    match adapter.run(spec).await {
        Err(SpawnError::CommandNotFound(cmd)) => ShellPostprocessOutcome::CommandNotFound(cmd),
        Err(SpawnError::Other { source, .. }) => ShellPostprocessOutcome::OtherSpawnError(source.to_string()),
        Ok(output) => match classify_epipe_race(output.stdin_write_failed, output.exit) {
            EpipeOutcome::StdinWriteError => ShellPostprocessOutcome::StdinWriteError { command_echo },
            EpipeOutcome::NotAnError if output.success() => ShellPostprocessOutcome::Success { code: output.stdout },
            EpipeOutcome::NotAnError => {
                ShellPostprocessOutcome::Failed { exit: output.exit, stdout: output.stdout, stderr: output.stderr, command_echo }
            }
        },
    }
}
