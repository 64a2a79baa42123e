// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `make` command (§4.4 RunMode::Make, §6, §8 scenario 1): compile a
//! fixed set of targets once and exit, reusing the same `Supervisor`/
//! `Executor` pair the hot-mode loop drives, but with no watcher and no
//! broker. Every target is marked as having a connected client before
//! `start_hot()` runs, which makes the supervisor queue it straight for a
//! real build instead of the typecheck-only path hot mode uses for
//! unobserved targets (§4.4 "connecting escalates a typecheck-only queue").

use crate::executor::{Executor, ExecutorConfig};
use crate::exit_error::ExitError;
use crate::node_runner;
use crate::pretty::NullSink;
use crate::supervisor_input::{InjectResult, PostprocessResult, SupervisorInput};
use elm_watch_adapters::{EnvSnapshot, RealCommandAdapter};
use elm_watch_compiler::CompileOutcome;
use elm_watch_core::{CompilationMode, Effect, Project, TargetName};
use elm_watch_engine::Supervisor;
use indexmap::IndexMap;
use std::sync::Arc;

pub struct MakeOptions {
    pub project: Project,
    pub target_args: Vec<String>,
    pub compilation_mode: CompilationMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Error,
}

/// Run every selected target to completion, print a one-line-per-target
/// summary, and return an error (exit 1) if anything failed (§6, §8
/// scenario 1 "non-zero exit on the first failing target" generalized to
/// "any failing target").
pub async fn run(options: MakeOptions) -> Result<(), ExitError> {
    let MakeOptions { project, target_args, compilation_mode } = options;
    let needles: Vec<&str> = target_args.iter().map(String::as_str).collect();
    let (matched, unknown) = project.match_targets(&needles);
    if !unknown.is_empty() {
        return Err(ExitError::user(format!("Unknown target(s): {}", unknown.join(", "))));
    }

    let mut targets = IndexMap::new();
    for name in &matched {
        let target = project.target(name).expect("matched name exists in project").clone();
        targets.insert((*name).clone(), target);
    }
    let selected_root = project.root.clone();
    let selected = Project::new(selected_root, targets).map_err(|err| ExitError::new(1, err.to_string()))?;

    let env = EnvSnapshot::capture();
    let max_parallel = env.max_parallel(4);
    let max_parallel_postprocess = env.max_parallel_postprocess(4);
    let diagnostics_dir = selected.root.join_normalized("elm-stuff/elm-watch-diagnostics");
    node_runner::materialize(&selected.root).map_err(|err| ExitError::new(1, err.to_string()))?;

    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<SupervisorInput>();
    let executor = Executor::new(
        ExecutorConfig {
            adapter: Arc::new(RealCommandAdapter),
            compiler_path: "elm".to_string(),
            project: selected.clone(),
            diagnostics_dir,
            env: env.into_map(),
            max_parallel_postprocess,
            connections: None,
            sink: Arc::new(NullSink),
            port: 0,
        },
        events_tx,
    )
    .map_err(|err| ExitError::new(1, err.to_string()))?;

    let mut supervisor = Supervisor::new(selected.clone(), max_parallel, elm_watch_core::RunMode::Make, compilation_mode);

    for name in selected.target_names() {
        supervisor.client_connected(name);
    }
    let initial_effects = supervisor.start_hot();
    run_effects(&executor, initial_effects).await?;

    let mut outcomes: IndexMap<TargetName, Outcome> = IndexMap::new();
    let mut remaining: std::collections::HashSet<TargetName> = selected.target_names().cloned().collect();

    while !remaining.is_empty() {
        let Some(input) = events_rx.recv().await else { break };
        let effects = handle_input(&mut supervisor, &executor, input, &mut outcomes, &mut remaining);
        run_effects(&executor, effects).await?;
    }

    let mut any_failed = false;
    for name in selected.target_names() {
        match outcomes.get(name) {
            Some(Outcome::Success) => println!("{} {}", color_ok(), name),
            Some(Outcome::Error) | None => {
                any_failed = true;
                println!("{} {}", color_err(), name);
            }
        }
    }

    if any_failed {
        Err(ExitError::new(1, "one or more targets failed to compile"))
    } else {
        Ok(())
    }
}

fn color_ok() -> String {
    crate::color::success("OK")
}

fn color_err() -> String {
    crate::color::error("FAIL")
}

async fn run_effects(executor: &Executor, effects: Vec<Effect>) -> Result<(), ExitError> {
    for effect in effects {
        executor.execute(effect).await.map_err(|err| ExitError::new(1, err.to_string()))?;
    }
    Ok(())
}

fn handle_input(
    supervisor: &mut Supervisor,
    executor: &Executor,
    input: SupervisorInput,
    outcomes: &mut IndexMap<TargetName, Outcome>,
    remaining: &mut std::collections::HashSet<TargetName>,
) -> Vec<Effect> {
    match input {
        SupervisorInput::CompileFinished { target, generation, result } => {
            let success = matches!(result.outcome, CompileOutcome::Success);
            if success {
                if let Some(bytes) = result.artifact {
                    executor.stage_pending_bytes(target.clone(), bytes);
                }
            } else {
                outcomes.insert(target.clone(), Outcome::Error);
                remaining.remove(&target);
            }
            let has_postprocess = supervisor.project().target(&target).and_then(|t| t.postprocess.as_ref()).is_some();
            supervisor.compile_finished(&target, generation, success, has_postprocess)
        }
        SupervisorInput::PostprocessFinished { target, generation, result } => {
            let success = matches!(result, PostprocessResult::Success { .. });
            match result {
                PostprocessResult::Success { code } => executor.stage_pending_bytes(target.clone(), code),
                PostprocessResult::Failed { .. } => {
                    outcomes.insert(target.clone(), Outcome::Error);
                    remaining.remove(&target);
                }
            }
            supervisor.postprocess_finished(&target, generation, success)
        }
        SupervisorInput::InjectFinished { target, generation: _, result } => {
            match result {
                InjectResult::Success { code, .. } => {
                    if let Some(project_target) = supervisor.project().target(&target) {
                        if let Err(err) = std::fs::write(project_target.output.as_path(), &code) {
                            tracing::error!(target = %target, error = %err, "failed to write compiled output");
                            outcomes.insert(target.clone(), Outcome::Error);
                        } else {
                            outcomes.insert(target.clone(), Outcome::Success);
                        }
                    }
                }
                InjectResult::Failed { message } => {
                    tracing::error!(target = %target, error = %message, "hot-reload injection failed");
                    outcomes.insert(target.clone(), Outcome::Error);
                }
            }
            remaining.remove(&target);
            supervisor.hot_reload_injected(&target)
        }
        SupervisorInput::SubprocessKilled { target } => supervisor.subprocess_exited_after_interrupt(&target),
        SupervisorInput::FileChanged { .. }
        | SupervisorInput::ClientConnected { .. }
        | SupervisorInput::ClientDisconnected { .. }
        | SupervisorInput::ClientFocused { .. }
        | SupervisorInput::ClientMessage { .. }
        | SupervisorInput::TimerFired { .. }
        | SupervisorInput::Shutdown => Vec::new(),
    }
}
