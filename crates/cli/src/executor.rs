// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns `Effect`s into real subprocesses, files, and broker traffic.
//! `execute()` wraps every effect with structured tracing and timing;
//! `execute_inner()` is one dispatch `match` whose arms mutate shared state
//! directly or spawn a background task that reports back over an unbounded
//! channel.

use crate::node_runner;
use crate::pretty::TerminalEventSink;
use crate::supervisor_input::{CompileResult, InjectResult, PostprocessResult, SupervisorInput};
use elm_watch_adapters::CommandAdapter;
use elm_watch_broker::ConnectionTable;
use elm_watch_compiler::{CompileMode, CompileOutcome, CompileRequest, CompilerDriver};
use elm_watch_core::{
    Artifact, CompilationMode, Effect, Generation, Project, RunMode, TargetName, TimerId,
};
use elm_watch_injector::Injector;
use elm_watch_postprocess::{run_shell_postprocess, ScriptedPostprocessError, ScriptedWorkerPool, ShellPostprocessOutcome};
use elm_watch_wire::{PersistedStateFile, PersistedTargetState, ServerMessage};
use indexmap::IndexMap;
use parking_lot::RwLock as SyncRwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Driver(#[from] elm_watch_compiler::DriverError),
    #[error(transparent)]
    Storage(#[from] elm_watch_storage::StorageError),
    #[error("failed to read compiled artifact {0}: {1}")]
    ReadArtifact(std::path::PathBuf, std::io::Error),
}

/// Everything the executor needs that doesn't change once the supervisor
/// starts (§5 "Shared resources").
pub struct Executor {
    adapter: Arc<dyn CommandAdapter>,
    compiler: Arc<CompilerDriver>,
    injector: Arc<Injector>,
    project: Project,
    diagnostics_dir: elm_watch_core::AbsolutePath,
    node_runner_path: elm_watch_core::AbsolutePath,
    env: HashMap<String, String>,
    max_parallel_postprocess: usize,
    connections: Option<ConnectionTable>,
    sink: Arc<dyn TerminalEventSink>,
    port: u16,
    state_path: std::path::PathBuf,

    scripted_pools: SyncRwLock<HashMap<std::path::PathBuf, Arc<ScriptedWorkerPool>>>,
    /// Bytes produced by the most recent `CompileMake`/`RunPostprocess` for
    /// each target, consumed by the next `RunPostprocess`/`InjectHotReload`
    /// in the same pipeline (§4.1-§4.3). Effects themselves stay small;
    /// this is where the megabyte-sized payload actually lives.
    pending_bytes: SyncRwLock<HashMap<TargetName, Vec<u8>>>,
    artifacts: SyncRwLock<HashMap<TargetName, Artifact>>,
    compilation_modes: SyncRwLock<HashMap<TargetName, CompilationMode>>,
    kill_handles: SyncRwLock<HashMap<TargetName, JoinHandle<()>>>,
    timers: SyncRwLock<HashMap<TimerId, JoinHandle<()>>>,

    events: mpsc::UnboundedSender<SupervisorInput>,
}

pub struct ExecutorConfig {
    pub adapter: Arc<dyn CommandAdapter>,
    pub compiler_path: String,
    pub project: Project,
    pub diagnostics_dir: elm_watch_core::AbsolutePath,
    pub env: HashMap<String, String>,
    pub max_parallel_postprocess: usize,
    pub connections: Option<ConnectionTable>,
    pub sink: Arc<dyn TerminalEventSink>,
    pub port: u16,
}

impl Executor {
    pub fn new(config: ExecutorConfig, events: mpsc::UnboundedSender<SupervisorInput>) -> std::io::Result<Self> {
        let node_runner_path = node_runner::materialize(&config.project.root)?;
        let state_path = elm_watch_storage::default_state_path(&config.project.root).into_path_buf();
        Ok(Self {
            adapter: config.adapter.clone(),
            compiler: Arc::new(CompilerDriver::new(config.adapter, config.compiler_path, config.diagnostics_dir.clone())),
            injector: Arc::new(Injector::new(config.diagnostics_dir.clone())),
            project: config.project,
            diagnostics_dir: config.diagnostics_dir,
            node_runner_path,
            env: config.env,
            max_parallel_postprocess: config.max_parallel_postprocess.max(1),
            connections: config.connections,
            sink: config.sink,
            port: config.port,
            state_path,
            scripted_pools: SyncRwLock::new(HashMap::new()),
            pending_bytes: SyncRwLock::new(HashMap::new()),
            artifacts: SyncRwLock::new(HashMap::new()),
            compilation_modes: SyncRwLock::new(HashMap::new()),
            kill_handles: SyncRwLock::new(HashMap::new()),
            timers: SyncRwLock::new(HashMap::new()),
            events,
        })
    }

    pub fn artifact(&self, target: &TargetName) -> Option<Artifact> {
        self.artifacts.read().get(target).cloned()
    }

    pub fn compilation_mode_of(&self, target: &TargetName) -> Option<CompilationMode> {
        self.compilation_modes.read().get(target).copied()
    }

    /// Run `effect`, logging its name/fields/timing (§5 "Observability").
    pub async fn execute(&self, effect: Effect) -> Result<(), ExecuteError> {
        let name = effect.name();
        let fields = fields_of(&effect);
        let verbose = effect.verbose();
        if verbose {
            tracing::info!(effect = name, %fields, "executing effect");
        }
        let started = Instant::now();
        let result = self.execute_inner(effect).await;
        let elapsed_ms = started.elapsed().as_millis();
        match &result {
            Ok(()) => {
                if verbose {
                    tracing::info!(effect = name, %fields, elapsed_ms, "effect dispatched");
                }
            }
            Err(err) => tracing::error!(effect = name, %fields, elapsed_ms, error = %err, "effect failed"),
        }
        result
    }

    async fn execute_inner(&self, effect: Effect) -> Result<(), ExecuteError> {
        match effect {
            Effect::CompileTypecheck { target, generation } => {
                self.spawn_compile(target, generation, CompileModeKind::TypecheckOnly, CompilationMode::Standard);
                Ok(())
            }
            Effect::CompileMake { target, generation, mode } => {
                self.spawn_compile(target, generation, CompileModeKind::Make, mode);
                Ok(())
            }
            Effect::CompileInstall { generation } => self.run_install(generation).await,
            Effect::RunPostprocess { target, generation, mode, run_mode } => {
                self.spawn_postprocess(target, generation, mode, run_mode);
                Ok(())
            }
            Effect::InjectHotReload { target, generation } => {
                self.run_inject(target, generation);
                Ok(())
            }
            Effect::KillSubprocess { target, generation: _ } => {
                if let Some(handle) = self.kill_handles.write().remove(&target) {
                    handle.abort();
                }
                let _ = self.events.send(SupervisorInput::SubprocessKilled { target });
                Ok(())
            }
            Effect::BroadcastArtifactReady { target } => {
                self.broadcast(&target);
                Ok(())
            }
            Effect::SetTimer { id, duration } => {
                self.spawn_timer(id, duration);
                Ok(())
            }
            Effect::CancelTimer { id } => {
                if let Some(handle) = self.timers.write().remove(&id) {
                    handle.abort();
                }
                Ok(())
            }
            Effect::PersistState => self.persist_state(),
            Effect::EmitTerminalEvent(event) => {
                self.sink.emit(&event);
                Ok(())
            }
        }
    }

    fn resolved_inputs(&self, name: &TargetName) -> Vec<elm_watch_core::AbsolutePath> {
        let Some(target) = self.project.target(name) else { return Vec::new() };
        target
            .inputs
            .iter()
            .map(|input| input.resolved.clone().unwrap_or_else(|| self.project.root.join_normalized(&input.specifier)))
            .collect()
    }

    fn spawn_compile(&self, target: TargetName, generation: Generation, kind: CompileModeKind, compilation_mode: CompilationMode) {
        let Some(project_target) = self.project.target(&target).cloned() else { return };
        let inputs = self.resolved_inputs(&target);
        let mode = match kind {
            CompileModeKind::TypecheckOnly => CompileMode::TypecheckOnly,
            CompileModeKind::Make => CompileMode::Make { output: project_target.output.clone() },
        };
        let request = CompileRequest { project_root: self.project.root.clone(), inputs, mode, compilation_mode, env: self.env.clone() };
        let diagnostic_id = format!("{target}-{generation}");
        let compiler = self.compiler.clone();
        let events = self.events.clone();
        let output_path = project_target.output.clone();
        self.compilation_modes.write().insert(target.clone(), compilation_mode);

        let target_for_task = target.clone();
        let handle = tokio::spawn(async move {
            let compile_result = compiler.compile(&request, &diagnostic_id).await;
            let (outcome, artifact) = match compile_result {
                Ok(CompileOutcome::Success) if matches!(kind, CompileModeKind::Make) => {
                    match tokio::fs::read(output_path.as_path()).await {
                        Ok(bytes) => (CompileOutcome::Success, Some(bytes)),
                        Err(_) => (CompileOutcome::Success, None),
                    }
                }
                Ok(outcome) => (outcome, None),
                Err(err) => (CompileOutcome::OtherSpawnError(err.to_string()), None),
            };
            let _ = events.send(SupervisorInput::CompileFinished {
                target: target_for_task,
                generation,
                result: CompileResult { outcome, artifact },
            });
        });
        self.kill_handles.write().insert(target, handle);
    }

    async fn run_install(&self, generation: Generation) -> Result<(), ExecuteError> {
        let Some(first) = self.project.targets().next() else { return Ok(()) };
        let Some(dummy_input) = first.inputs.first() else { return Ok(()) };
        let dummy_input = dummy_input.resolved.clone().unwrap_or_else(|| self.project.root.join_normalized(&dummy_input.specifier));
        let scratch_dir = self.diagnostics_dir.join_normalized(format!("install-scratch-{generation}"));
        let request = CompileRequest {
            project_root: self.project.root.clone(),
            inputs: vec![dummy_input.clone()],
            mode: CompileMode::Install { scratch_dir, dummy_input },
            compilation_mode: CompilationMode::Standard,
            env: self.env.clone(),
        };
        match self.compiler.compile(&request, "install").await? {
            CompileOutcome::Success => tracing::info!("dependencies installed"),
            other => tracing::warn!(?other, "install compile did not succeed cleanly"),
        }
        Ok(())
    }

    fn spawn_postprocess(&self, target: TargetName, generation: Generation, mode: CompilationMode, run_mode: RunMode) {
        let Some(project_target) = self.project.target(&target).cloned() else { return };
        let Some(postprocess) = project_target.postprocess.clone() else { return };
        let Some(code) = self.pending_bytes.write().remove(&target) else {
            let _ = self.events.send(SupervisorInput::PostprocessFinished {
                target,
                generation,
                result: PostprocessResult::Failed { message: "no compiled artifact to postprocess".to_string() },
            });
            return;
        };

        let events = self.events.clone();
        let target_for_task = target.clone();
        let output_path = project_target.output.as_path().display().to_string();
        let project_root = self.project.root.clone();

        if postprocess.is_scripted() {
            let Some((script, user_args)) = postprocess.scripted_script_and_args() else { return };
            let pool = self.scripted_pool_for(script);
            let user_args = user_args.to_vec();
            let target_name_string = target.to_string();
            let handle = tokio::spawn(async move {
                let code_string = String::from_utf8_lossy(&code).into_owned();
                let result = pool.run(code_string, target_name_string, mode, run_mode, user_args).await;
                let result = match result {
                    Ok(code) => PostprocessResult::Success { code: code.into_bytes() },
                    Err(ScriptedPostprocessError::MissingScript) => PostprocessResult::Failed { message: "postprocess script not found".to_string() },
                    Err(other) => PostprocessResult::Failed { message: other.to_string() },
                };
                let _ = events.send(SupervisorInput::PostprocessFinished { target: target_for_task, generation, result });
            });
            self.kill_handles.write().insert(target, handle);
        } else {
            let adapter = self.adapter.clone();
            let (_, argv_rest) = postprocess.shell_command_and_args();
            let mut argv = vec![postprocess.shell_command_and_args().0.to_string()];
            argv.extend(argv_rest.iter().cloned());
            let handle = tokio::spawn(async move {
                let outcome =
                    run_shell_postprocess(adapter.as_ref(), &argv, project_root.as_path(), code, &output_path, mode, run_mode).await;
                let result = match outcome {
                    ShellPostprocessOutcome::Success { code } => PostprocessResult::Success { code },
                    ShellPostprocessOutcome::Failed { exit, stderr, .. } => {
                        PostprocessResult::Failed { message: format!("exited {exit:?}: {}", String::from_utf8_lossy(&stderr)) }
                    }
                    ShellPostprocessOutcome::StdinWriteError { command_echo } => {
                        PostprocessResult::Failed { message: format!("postprocess never read stdin: {command_echo}") }
                    }
                    ShellPostprocessOutcome::CommandNotFound(cmd) => PostprocessResult::Failed { message: format!("command not found: {cmd}") },
                    ShellPostprocessOutcome::OtherSpawnError(message) => PostprocessResult::Failed { message },
                };
                let _ = events.send(SupervisorInput::PostprocessFinished { target: target_for_task, generation, result });
            });
            self.kill_handles.write().insert(target, handle);
        }
    }

    fn scripted_pool_for(&self, script: &str) -> Arc<ScriptedWorkerPool> {
        let script_path = self.project.root.join_normalized(script).into_path_buf();
        if let Some(pool) = self.scripted_pools.read().get(&script_path) {
            return pool.clone();
        }
        let pool = Arc::new(ScriptedWorkerPool::new(
            "node",
            self.node_runner_path.as_path().to_path_buf(),
            script_path.clone(),
            self.max_parallel_postprocess,
        ));
        self.scripted_pools.write().insert(script_path, pool.clone());
        pool
    }

    fn run_inject(&self, target: TargetName, generation: Generation) {
        let Some(code) = self.pending_bytes.write().remove(&target) else {
            let _ = self.events.send(SupervisorInput::InjectFinished {
                target,
                generation,
                result: InjectResult::Failed { message: "no compiled artifact to inject".to_string() },
            });
            return;
        };
        let diagnostic_id = format!("{target}-{generation}");
        match self.injector.inject(&code, &diagnostic_id) {
            Ok(injected) => {
                self.artifacts.write().insert(target.clone(), Artifact::new(injected.code.clone(), injected.compiled_timestamp));
                let _ = self.events.send(SupervisorInput::InjectFinished {
                    target,
                    generation,
                    result: InjectResult::Success { code: injected.code, compiled_timestamp: injected.compiled_timestamp },
                });
            }
            Err(err) => {
                let _ = self.events.send(SupervisorInput::InjectFinished { target, generation, result: InjectResult::Failed { message: err.to_string() } });
            }
        }
    }

    /// Record freshly compiled or postprocessed bytes for the next effect
    /// in this target's pipeline (called by the hot-mode loop after
    /// observing a `CompileFinished`/`PostprocessFinished` success).
    pub fn stage_pending_bytes(&self, target: TargetName, bytes: Vec<u8>) {
        self.pending_bytes.write().insert(target, bytes);
    }

    fn broadcast(&self, target: &TargetName) {
        let Some(connections) = &self.connections else { return };
        let Some(artifact) = self.artifacts.read().get(target).cloned() else { return };
        let code = String::from_utf8_lossy(artifact.code()).into_owned();
        connections.broadcast_to_target(target, ServerMessage::HotReload { code, compiled_timestamp: artifact.compiled_timestamp });
    }

    fn spawn_timer(&self, id: TimerId, duration: std::time::Duration) {
        let events = self.events.clone();
        let id_for_task = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = events.send(SupervisorInput::TimerFired { id: id_for_task });
        });
        self.timers.write().insert(id, handle);
    }

    fn persist_state(&self) -> Result<(), ExecuteError> {
        let mut targets = IndexMap::new();
        for name in self.project.target_names() {
            let compilation_mode = self.compilation_modes.read().get(name).copied().unwrap_or_default();
            targets.insert(name.to_string(), PersistedTargetState { compilation_mode });
        }
        let state = PersistedStateFile { port: self.port, targets };
        elm_watch_storage::save(&self.state_path, &state)?;
        Ok(())
    }

    /// Invalidate every scripted-postprocess worker for `script`, because
    /// its file changed on disk (§5).
    pub async fn invalidate_scripted_workers(&self, script_path: &std::path::Path) {
        if let Some(pool) = self.scripted_pools.read().get(script_path).cloned() {
            pool.invalidate_all().await;
        }
    }

    /// Reap idle scripted-postprocess workers beyond one per script, on the
    /// idle-worker-reap timer (§3, §C.2 supplement).
    pub async fn reap_idle_workers(&self) {
        let pools: Vec<Arc<ScriptedWorkerPool>> = self.scripted_pools.read().values().cloned().collect();
        for pool in pools {
            pool.reap_idle_beyond_one().await;
        }
    }

    /// Abort every in-flight compile/postprocess task and pending timer
    /// (§5 "Shutdown aborts all in-flight work").
    pub fn abort_all_subprocesses(&self) {
        for (_, handle) in self.kill_handles.write().drain() {
            handle.abort();
        }
        for (_, handle) in self.timers.write().drain() {
            handle.abort();
        }
    }
}

#[derive(Clone, Copy)]
enum CompileModeKind {
    TypecheckOnly,
    Make,
}

fn fields_of(effect: &Effect) -> String {
    match effect {
        Effect::CompileTypecheck { target, generation } => format!("target={target} generation={generation}"),
        Effect::CompileMake { target, generation, mode } => format!("target={target} generation={generation} mode={mode}"),
        Effect::CompileInstall { generation } => format!("generation={generation}"),
        Effect::RunPostprocess { target, generation, .. } => format!("target={target} generation={generation}"),
        Effect::InjectHotReload { target, generation } => format!("target={target} generation={generation}"),
        Effect::KillSubprocess { target, generation } => format!("target={target} generation={generation}"),
        Effect::BroadcastArtifactReady { target } => format!("target={target}"),
        Effect::SetTimer { id, duration } => format!("id={id} duration_ms={}", duration.as_millis()),
        Effect::CancelTimer { id } => format!("id={id}"),
        Effect::PersistState => String::new(),
        Effect::EmitTerminalEvent(_) => String::new(),
    }
}
