// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `hot` command's event loop (§4.4-§4.7): owns the `Supervisor`, the
//! `Executor`, the file watcher, and the broker, and drives one iteration
//! per `SupervisorInput` received from its unbounded channel.

use crate::classify_state::ClassifyState;
use crate::executor::{Executor, ExecutorConfig};
use crate::exit_error::ExitError;
use crate::node_runner;
use crate::pretty::TextSink;
use crate::supervisor_input::{CompileResult, InjectResult, PostprocessResult, SupervisorInput};
use elm_watch_adapters::{EnvSnapshot, FileWatcherAdapter, RealCommandAdapter, RealFileWatcher};
use elm_watch_broker::{build_router, BrokerEvent, BrokerState, ConnectionTable, TargetConnectState, TargetLookup};
use elm_watch_compiler::CompileOutcome;
use elm_watch_core::{
    CompilationMode, Effect, Phase, Project, ProgressOutcome, ProgressRecord, RunMode, TargetName, TargetState, TerminalEvent,
};
use elm_watch_engine::Supervisor;
use elm_watch_wire::{ClientMessage, ServerMessage, StatusChanged};
use parking_lot::Mutex as SyncMutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const ELM_WATCH_VERSION: &str = env!("CARGO_PKG_VERSION");

struct SupervisorLookup {
    supervisor: Arc<SyncMutex<Supervisor>>,
    executor: Arc<Executor>,
    enabled: Vec<TargetName>,
}

impl TargetLookup for SupervisorLookup {
    fn candidate_names(&self) -> Vec<String> {
        self.enabled.iter().map(ToString::to_string).collect()
    }

    fn resolve(&self, target_name: &str) -> TargetConnectState {
        let Ok(name) = TargetName::new(target_name) else { return TargetConnectState::NotFound };
        let supervisor = self.supervisor.lock();
        if supervisor.project().target(&name).is_none() {
            return TargetConnectState::NotFound;
        }
        if !self.enabled.contains(&name) {
            return TargetConnectState::Disabled;
        }
        match supervisor.state_of(&name) {
            Some(TargetState::Ready { .. }) => match self.executor.artifact(&name) {
                Some(artifact) => TargetConnectState::Ready {
                    compiled_timestamp: artifact.compiled_timestamp,
                    compilation_mode: self.executor.compilation_mode_of(&name).unwrap_or_default(),
                },
                None => TargetConnectState::Other,
            },
            Some(TargetState::QueuedForTypecheckOnly { .. }) => TargetConnectState::QueuedForTypecheckOnly,
            Some(_) => TargetConnectState::Other,
            None => TargetConnectState::NotFound,
        }
    }
}

pub struct HotOptions {
    pub project: Project,
    pub enabled_targets: Vec<TargetName>,
    pub port_override: Option<u16>,
}

pub async fn run(options: HotOptions) -> Result<(), ExitError> {
    let HotOptions { project, enabled_targets, port_override } = options;
    let project_root = project.root.clone();
    let env = EnvSnapshot::capture();
    let max_parallel = env.max_parallel(4);
    let max_parallel_postprocess = env.max_parallel_postprocess(4);

    let state_path = elm_watch_storage::default_state_path(&project_root).into_path_buf();
    let persisted = elm_watch_storage::load(&state_path).map_err(|err| ExitError::new(1, err.to_string()))?;

    let requested_port = port_override.or_else(|| persisted.as_ref().map(|state| state.port)).unwrap_or(0);
    let listener = bind_listener(requested_port).await.map_err(|err| ExitError::new(1, format!("failed to bind: {err}")))?;
    let port = listener.local_addr().map_err(|err| ExitError::new(1, err.to_string()))?.port();

    let diagnostics_dir = project_root.join_normalized("elm-stuff/elm-watch-diagnostics");
    let _runner_path = node_runner::materialize(&project_root).map_err(|err| ExitError::new(1, err.to_string()))?;

    let connections = ConnectionTable::new();
    let (events_tx, mut events_rx) = tokio::sync::mpsc::unbounded_channel::<SupervisorInput>();

    let executor = Arc::new(
        Executor::new(
            ExecutorConfig {
                adapter: Arc::new(RealCommandAdapter),
                compiler_path: "elm".to_string(),
                project: project.clone(),
                diagnostics_dir,
                env: env.into_map(),
                max_parallel_postprocess,
                connections: Some(connections.clone()),
                sink: Arc::new(TextSink),
                port,
            },
            events_tx.clone(),
        )
        .map_err(|err| ExitError::new(1, err.to_string()))?,
    );

    let mut supervisor = Supervisor::new(project.clone(), max_parallel, RunMode::Hot, CompilationMode::Standard);
    if let Some(state) = &persisted {
        for (name, target_state) in &state.targets {
            if let Ok(name) = TargetName::new(name) {
                supervisor.seed_compilation_mode(&name, target_state.compilation_mode);
            }
        }
    }
    let supervisor = Arc::new(SyncMutex::new(supervisor));

    let lookup = Arc::new(SupervisorLookup { supervisor: supervisor.clone(), executor: executor.clone(), enabled: enabled_targets.clone() });
    let (broker_events_tx, mut broker_events_rx) = tokio::sync::mpsc::unbounded_channel::<BrokerEvent>();
    let broker_state =
        Arc::new(BrokerState { server_version: ELM_WATCH_VERSION.to_string(), connections: connections.clone(), lookup, events: broker_events_tx });
    let router = build_router(broker_state);
    let server_handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!(error = %err, "broker server stopped");
        }
    });
    tracing::info!(port, "hot mode listening");

    {
        let mut events = events_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = events.send(SupervisorInput::Shutdown);
            }
        });
    }

    let postprocess_scripts: Vec<PathBuf> = project
        .targets()
        .filter_map(|target| target.postprocess.as_ref())
        .filter_map(|command| command.scripted_script_and_args())
        .map(|(script, _)| project_root.join_normalized(script).into_path_buf())
        .collect();
    let classify_state = Arc::new(SyncMutex::new(ClassifyState::new(
        project_root.join_normalized("elm-watch.json").into_path_buf(),
        postprocess_scripts,
    )));

    let watcher = RealFileWatcher;
    let mut raw_events = watcher.watch(&project_root, Duration::from_millis(50)).await.map_err(|err| ExitError::new(1, err.to_string()))?;

    {
        let mut events = events_tx.clone();
        let classify_state = classify_state.clone();
        let project_root = project_root.clone();
        tokio::spawn(async move {
            while let Some(raw) = raw_events.recv().await {
                let (config_path, manifests, sources, scripts) = {
                    let state = classify_state.lock();
                    (state.config_path.clone(), state.manifest_paths(), state.elm_source_paths(), state.postprocess_script_paths())
                };
                let classification = elm_watch_adapters::classify(raw.path.as_path(), &config_path, &manifests, &sources, &scripts);
                let _ = events.send(SupervisorInput::FileChanged { path: raw.path, classification });
            }
            let _ = project_root;
        });
    }

    tokio::spawn(async move {
        while let Some(event) = broker_events_rx.recv().await {
            let mapped = match event {
                BrokerEvent::Connected { target, .. } => SupervisorInput::ClientConnected { target },
                BrokerEvent::Message { target, message, .. } => SupervisorInput::ClientMessage { target, message },
                BrokerEvent::Disconnected { target, .. } => SupervisorInput::ClientDisconnected { target },
            };
            if events_tx.send(mapped).is_err() {
                break;
            }
        }
    });

    let install_effect = Effect::CompileInstall { generation: elm_watch_core::Generation::INITIAL };
    executor.execute(install_effect).await.map_err(|err| ExitError::new(1, err.to_string()))?;

    let initial_effects = supervisor.lock().start_hot();
    run_effects(&executor, initial_effects).await?;

    while let Some(input) = events_rx.recv().await {
        if is_shutdown_request(&input) {
            shutdown(&supervisor, &executor, &connections, &server_handle).await;
            break;
        }
        let effects = handle_input(&supervisor, &executor, &classify_state, input).await;
        run_effects(&executor, effects).await?;
    }

    Ok(())
}

fn is_shutdown_request(input: &SupervisorInput) -> bool {
    matches!(input, SupervisorInput::Shutdown) || matches!(input, SupervisorInput::ClientMessage { message: ClientMessage::ExitRequested, .. })
}

/// Graceful shutdown (§5: "aborts all in-flight work, closes the server
/// socket, closes all client connections with a terminal status, and exits
/// after all subprocesses have been reaped").
async fn shutdown(
    supervisor: &Arc<SyncMutex<Supervisor>>,
    executor: &Arc<Executor>,
    connections: &ConnectionTable,
    server_handle: &tokio::task::JoinHandle<()>,
) {
    tracing::info!("shutting down");
    server_handle.abort();
    executor.abort_all_subprocesses();
    let snapshot = supervisor.lock().shutdown_snapshot();
    for (name, state) in &snapshot {
        if matches!(state, TargetState::StuckInProgress { .. }) {
            tracing::warn!(target = %name, "aborted while in progress");
        }
    }
    connections.broadcast_all(ServerMessage::StatusChanged { status: StatusChanged::ServerShutdown });
    connections.close_all();
    let _ = executor.execute(Effect::PersistState).await;
}

async fn bind_listener(port: u16) -> std::io::Result<tokio::net::TcpListener> {
    match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => Ok(listener),
        Err(_) if port != 0 => tokio::net::TcpListener::bind(("127.0.0.1", 0)).await,
        Err(err) => Err(err),
    }
}

async fn run_effects(executor: &Arc<Executor>, effects: Vec<Effect>) -> Result<(), ExitError> {
    for effect in effects {
        executor.execute(effect).await.map_err(|err| ExitError::new(1, err.to_string()))?;
    }
    Ok(())
}

async fn handle_input(
    supervisor: &Arc<SyncMutex<Supervisor>>,
    executor: &Arc<Executor>,
    classify_state: &Arc<SyncMutex<ClassifyState>>,
    input: SupervisorInput,
) -> Vec<Effect> {
    match input {
        SupervisorInput::FileChanged { path, classification } => supervisor.lock().file_changed(&path, classification),
        SupervisorInput::CompileFinished { target, generation, result } => {
            handle_compile_finished(supervisor, executor, classify_state, target, generation, result).await
        }
        SupervisorInput::PostprocessFinished { target, generation, result } => {
            let success = matches!(result, PostprocessResult::Success { .. });
            if let PostprocessResult::Success { code } = result {
                executor.stage_pending_bytes(target.clone(), code);
            }
            emit_progress(executor, &target, Phase::Postprocess, success).await;
            supervisor.lock().postprocess_finished(&target, generation, success)
        }
        SupervisorInput::InjectFinished { target, generation, result } => {
            if let InjectResult::Failed { message } = &result {
                tracing::error!(target = %target, error = %message, "hot-reload injection failed");
            }
            let _ = generation;
            supervisor.lock().hot_reload_injected(&target)
        }
        SupervisorInput::SubprocessKilled { target } => supervisor.lock().subprocess_exited_after_interrupt(&target),
        SupervisorInput::ClientConnected { target } => supervisor.lock().client_connected(&target),
        SupervisorInput::ClientDisconnected { target } => {
            supervisor.lock().client_disconnected(&target);
            Vec::new()
        }
        SupervisorInput::ClientFocused { target } => {
            supervisor.lock().client_focused(&target);
            Vec::new()
        }
        SupervisorInput::ClientMessage { target, message } => handle_client_message(supervisor, target, message),
        SupervisorInput::TimerFired { id } => {
            tracing::debug!(id = %id, "timer fired");
            executor.reap_idle_workers().await;
            Vec::new()
        }
        SupervisorInput::Shutdown => Vec::new(),
    }
}

fn handle_client_message(supervisor: &Arc<SyncMutex<Supervisor>>, target: TargetName, message: ClientMessage) -> Vec<Effect> {
    match message {
        ClientMessage::FocusedTab => {
            supervisor.lock().client_focused(&target);
            Vec::new()
        }
        ClientMessage::ChangedCompilationMode { compilation_mode } => supervisor.lock().set_compilation_mode(&target, compilation_mode),
        // Handled in `run`'s event loop before it ever reaches here (§5 shutdown).
        ClientMessage::ExitRequested => Vec::new(),
    }
}

async fn handle_compile_finished(
    supervisor: &Arc<SyncMutex<Supervisor>>,
    executor: &Arc<Executor>,
    classify_state: &Arc<SyncMutex<ClassifyState>>,
    target: TargetName,
    generation: elm_watch_core::Generation,
    result: CompileResult,
) -> Vec<Effect> {
    let success = matches!(result.outcome, CompileOutcome::Success);
    if success {
        if let Some(bytes) = result.artifact {
            executor.stage_pending_bytes(target.clone(), bytes);
            recompute_closure(supervisor, classify_state, &target);
        }
    } else if let CompileOutcome::StructuredCompileError(report) = &result.outcome {
        tracing::warn!(target = %target, ?report, "elm compile reported errors");
    }
    emit_progress(executor, &target, Phase::ElmMake, success).await;

    let has_postprocess = supervisor.lock().project().target(&target).and_then(|t| t.postprocess.as_ref()).is_some();
    supervisor.lock().compile_finished(&target, generation, success, has_postprocess)
}

fn recompute_closure(supervisor: &Arc<SyncMutex<Supervisor>>, classify_state: &Arc<SyncMutex<ClassifyState>>, target: &TargetName) {
    let (project_root, inputs) = {
        let supervisor = supervisor.lock();
        let Some(project_target) = supervisor.project().target(target) else { return };
        let inputs: Vec<_> = project_target
            .inputs
            .iter()
            .map(|input| input.resolved.clone().unwrap_or_else(|| supervisor.project().root.join_normalized(&input.specifier)))
            .collect();
        (supervisor.project().root.clone(), inputs)
    };

    match elm_watch_engine::resolve(&project_root, &inputs) {
        Ok(resolved) => {
            let manifest_path = resolved.manifest_path.as_path().to_path_buf();
            let source_paths: Vec<PathBuf> = resolved.import_closure.iter().map(|p| p.as_path().to_path_buf()).collect();
            classify_state.lock().set_closure(target.clone(), manifest_path, source_paths.clone());
            let closure_paths = resolved.import_closure;
            supervisor.lock().set_closure(target.clone(), closure_paths);
            if resolved.closure_incomplete {
                tracing::warn!(target = %target, "import closure is incomplete, some files may not be watched");
            }
        }
        Err(err) => tracing::warn!(target = %target, error = %err, "failed to resolve import closure"),
    }
}

async fn emit_progress(executor: &Arc<Executor>, target: &TargetName, phase: Phase, success: bool) {
    let event = TerminalEvent::Progress(ProgressRecord {
        target_name: target.clone(),
        phase,
        outcome: if success { ProgressOutcome::Success } else { ProgressOutcome::Error },
        durations: Default::default(),
        size_before_bytes: None,
        size_after_bytes: None,
    });
    let _ = executor.execute(Effect::EmitTerminalEvent(event)).await;
    let _ = executor.execute(Effect::PersistState).await;
}
