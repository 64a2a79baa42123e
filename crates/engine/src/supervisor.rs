// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level per-project reducer (§4.4, §4.6, §5). Combines
//! `state_machine`, `scheduler`, and `watcher_events` into one step function
//! per supervisor input; owns no I/O itself. The executor (not in this
//! crate) is the only thing that turns the returned `Effect`s into
//! subprocesses, files, and broker messages.

use crate::scheduler::{self, SchedulerCandidate};
use crate::state_machine::{self, ClientPresence, Invalidation};
use crate::watcher_events::{self, SupervisorEvent, TargetClosures};
use elm_watch_core::{
    AbsolutePath, CompilationMode, Effect, FileClassification, Generation, Project, RunMode, TargetName, TargetState, TerminalEvent,
};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Supervisor-owned per-target bookkeeping that is not part of the
/// persisted config (§3): connection/focus state and the generation
/// allocator for cancellation-safety (§5 "Cancellation").
#[derive(Debug, Clone)]
struct TargetRuntime {
    state: TargetState,
    next_generation: Generation,
    has_connected_client: bool,
    focused: bool,
    /// Whether the subprocess currently (or most recently) running for this
    /// target was a typecheck-only compile, set at schedule time and read
    /// back in `compile_finished` since `TargetState::ElmMakeRunning` itself
    /// doesn't distinguish the two (§4.4).
    running_is_typecheck: bool,
    /// The generation of the last typecheck-only compile that already
    /// succeeded, so `schedule` doesn't keep re-running it once it's done
    /// (it only becomes schedulable again by escalating to `QueuedForMake`
    /// or being invalidated into a fresh generation).
    typechecked_generation: Option<Generation>,
    /// This target's own compilation mode (§3/§6: mode is per-target, not
    /// project-wide). Seeded from the CLI default, overridable from
    /// `PersistedState` at startup and from `ChangedCompilationMode` at runtime.
    compilation_mode: CompilationMode,
}

impl TargetRuntime {
    fn new(compilation_mode: CompilationMode) -> Self {
        Self {
            state: TargetState::Idle,
            next_generation: Generation::INITIAL,
            has_connected_client: false,
            focused: false,
            running_is_typecheck: false,
            typechecked_generation: None,
            compilation_mode,
        }
    }

    fn allocate_generation(&mut self) -> Generation {
        let generation = self.next_generation;
        self.next_generation = generation.next();
        generation
    }

    /// Whether this target currently needs a scheduler slot: `QueuedForMake`
    /// always does; `QueuedForTypecheckOnly` does unless its generation has
    /// already been typechecked successfully (§4.4).
    fn needs_scheduling(&self) -> bool {
        match self.state {
            TargetState::QueuedForMake { .. } => true,
            TargetState::QueuedForTypecheckOnly { generation } => self.typechecked_generation != Some(generation),
            _ => false,
        }
    }
}

/// Owns the live per-target state for one project and turns supervisor
/// inputs (client connects, file changes, subprocess completions) into
/// `Effect`s for the executor to run (§4.4).
pub struct Supervisor {
    project: Project,
    runtimes: IndexMap<TargetName, TargetRuntime>,
    closures: TargetClosures,
    max_parallel: usize,
    run_mode: RunMode,
}

impl Supervisor {
    pub fn new(project: Project, max_parallel: usize, run_mode: RunMode, default_compilation_mode: CompilationMode) -> Self {
        let runtimes = project.target_names().map(|name| (name.clone(), TargetRuntime::new(default_compilation_mode))).collect();
        Self { project, runtimes, closures: TargetClosures::new(), max_parallel: max_parallel.max(1), run_mode }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn state_of(&self, name: &TargetName) -> Option<&TargetState> {
        self.runtimes.get(name).map(|runtime| &runtime.state)
    }

    pub fn compilation_mode_of(&self, name: &TargetName) -> Option<CompilationMode> {
        self.runtimes.get(name).map(|runtime| runtime.compilation_mode)
    }

    /// Seed a target's compilation mode from `PersistedState` before hot mode
    /// starts (§3 PersistedState, §6), so a target last built in Debug/Optimize
    /// doesn't silently revert to the CLI default on restart.
    pub fn seed_compilation_mode(&mut self, name: &TargetName, mode: CompilationMode) {
        if let Some(runtime) = self.runtimes.get_mut(name) {
            runtime.compilation_mode = mode;
        }
    }

    /// A client asked to switch its target's compilation mode (§4.7, §3/§6
    /// per-target mode): kill any in-flight compile, requeue a real build
    /// under the new mode, and persist it.
    pub fn set_compilation_mode(&mut self, name: &TargetName, mode: CompilationMode) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(runtime) = self.runtimes.get_mut(name) {
            if runtime.compilation_mode != mode {
                runtime.compilation_mode = mode;
                if runtime.state.has_live_subprocess() {
                    let current_generation = runtime.state.generation().unwrap_or(runtime.next_generation);
                    effects.push(Effect::KillSubprocess { target: name.clone(), generation: current_generation });
                }
                let allocated = runtime.allocate_generation();
                runtime.state = TargetState::QueuedForMake { generation: allocated };
            }
        }
        effects.extend(self.schedule());
        effects.push(Effect::PersistState);
        effects
    }

    /// Queue every target: typecheck-only unless a client is already
    /// connected for it (§4.4).
    pub fn start_hot(&mut self) -> Vec<Effect> {
        let names: Vec<TargetName> = self.runtimes.keys().cloned().collect();
        for name in names {
            if let Some(runtime) = self.runtimes.get_mut(&name) {
                let presence = if runtime.has_connected_client { ClientPresence::Connected } else { ClientPresence::NotConnected };
                let generation = runtime.allocate_generation();
                runtime.state = state_machine::start_hot(generation, presence);
            }
        }
        self.schedule()
    }

    /// A WebSocket client reported which target it serves (§4.4, §4.7):
    /// escalates a typecheck-only queue to a real build.
    pub fn client_connected(&mut self, target: &TargetName) -> Vec<Effect> {
        if let Some(runtime) = self.runtimes.get_mut(target) {
            runtime.has_connected_client = true;
            runtime.state = state_machine::escalate_to_make(runtime.state.clone());
        }
        self.schedule()
    }

    pub fn client_disconnected(&mut self, target: &TargetName) {
        if let Some(runtime) = self.runtimes.get_mut(target) {
            runtime.has_connected_client = false;
        }
    }

    /// The browser reported which target has focus; used as the scheduler's
    /// secondary tie-break (§5).
    pub fn client_focused(&mut self, target: &TargetName) {
        for (name, runtime) in self.runtimes.iter_mut() {
            runtime.focused = name == target;
        }
    }

    /// A classified file change arrived from the watcher (§4.6).
    pub fn file_changed(&mut self, path: &AbsolutePath, classification: FileClassification) -> Vec<Effect> {
        let event = watcher_events::classify_event(path, classification, &self.closures);
        let mut effects = Vec::new();
        match event {
            SupervisorEvent::ConfigChanged => {
                effects.push(Effect::EmitTerminalEvent(TerminalEvent::WatcherNote { message: "config changed, restarting".to_string() }));
            }
            SupervisorEvent::ManifestChanged => {
                let names: Vec<TargetName> = self.runtimes.keys().cloned().collect();
                for name in names {
                    effects.extend(self.invalidate_target(&name, Invalidation::ConfigOrManifest));
                }
            }
            SupervisorEvent::ElmSourceChanged { affected_targets, unimported } => {
                if unimported {
                    effects.push(Effect::EmitTerminalEvent(TerminalEvent::WatcherNote {
                        message: format!("{} changed but is not imported by any target", path.display()),
                    }));
                } else {
                    for name in affected_targets {
                        effects.extend(self.invalidate_target(&name, Invalidation::Input));
                    }
                }
            }
            SupervisorEvent::PostprocessScriptChanged => {
                effects.push(Effect::EmitTerminalEvent(TerminalEvent::WatcherNote {
                    message: "postprocess script changed, restarting its workers".to_string(),
                }));
            }
            SupervisorEvent::Unrelated => {}
        }
        effects.extend(self.schedule());
        effects
    }

    fn invalidate_target(&mut self, name: &TargetName, kind: Invalidation) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(runtime) = self.runtimes.get_mut(name) {
            let had_subprocess = runtime.state.has_live_subprocess();
            let current_generation = runtime.state.generation().unwrap_or(runtime.next_generation);
            if had_subprocess {
                effects.push(Effect::KillSubprocess { target: name.clone(), generation: current_generation });
            }
            let allocated = runtime.allocate_generation();
            runtime.state = state_machine::invalidate(runtime.state.clone(), kind, allocated);
        }
        effects
    }

    /// The killed subprocess for an interrupted target confirmed exit; it is
    /// re-queued (§4.4, §4.6).
    pub fn subprocess_exited_after_interrupt(&mut self, name: &TargetName) -> Vec<Effect> {
        if let Some(runtime) = self.runtimes.get_mut(name) {
            let allocated = runtime.allocate_generation();
            runtime.state = state_machine::requeue_after_interrupt(runtime.state.clone(), allocated);
        }
        self.schedule()
    }

    /// A compile subprocess for `generation` finished. Stale generations are
    /// ignored by `state_machine`'s guards, so it's safe to call this for
    /// every exit regardless of whether it's still relevant (§5 "Cancellation").
    pub fn compile_finished(&mut self, name: &TargetName, generation: Generation, success: bool, has_postprocess: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(runtime) = self.runtimes.get_mut(name) {
            let before = runtime.state.clone();
            let is_typecheck = runtime.running_is_typecheck;
            runtime.state = if success {
                if is_typecheck {
                    state_machine::typecheck_succeeded(runtime.state.clone(), generation)
                } else {
                    state_machine::compile_succeeded(runtime.state.clone(), generation, has_postprocess)
                }
            } else {
                state_machine::compile_failed(runtime.state.clone(), generation)
            };
            if success && runtime.state != before {
                if is_typecheck {
                    // No artifact to inject for a typecheck-only compile
                    // (§4.4); just remember it's done so it isn't rescheduled.
                    runtime.typechecked_generation = Some(generation);
                } else {
                    let mode = runtime.compilation_mode;
                    effects.push(if has_postprocess {
                        Effect::RunPostprocess { target: name.clone(), generation, mode, run_mode: self.run_mode }
                    } else {
                        Effect::InjectHotReload { target: name.clone(), generation }
                    });
                }
            }
        }
        effects.extend(self.schedule());
        effects
    }

    pub fn postprocess_finished(&mut self, name: &TargetName, generation: Generation, success: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(runtime) = self.runtimes.get_mut(name) {
            let before = runtime.state.clone();
            runtime.state = if success {
                state_machine::postprocess_succeeded(runtime.state.clone(), generation)
            } else {
                state_machine::postprocess_failed(runtime.state.clone(), generation)
            };
            if success && runtime.state != before {
                effects.push(Effect::InjectHotReload { target: name.clone(), generation });
            }
        }
        effects.extend(self.schedule());
        effects
    }

    pub fn hot_reload_injected(&self, name: &TargetName) -> Vec<Effect> {
        vec![Effect::BroadcastArtifactReady { target: name.clone() }]
    }

    /// Replace the resolver-derived watched-file closure for one target
    /// (§3: recomputed after each successful or partial compile).
    pub fn set_closure(&mut self, name: TargetName, paths: Vec<AbsolutePath>) {
        self.closures.insert(name, paths);
    }

    /// Start as many queued targets as there are free slots, highest
    /// priority first (§5 "Ordering guarantees").
    fn schedule(&mut self) -> Vec<Effect> {
        let running_count = self.runtimes.values().filter(|runtime| runtime.state.has_live_subprocess()).count();
        if scheduler::at_capacity(running_count, self.max_parallel) {
            return Vec::new();
        }
        let free_slots = self.max_parallel - running_count;
        let focused = self.runtimes.iter().find(|(_, runtime)| runtime.focused).map(|(name, _)| name.clone());
        let already_running: HashSet<&TargetName> =
            self.runtimes.iter().filter(|(_, runtime)| runtime.state.has_live_subprocess()).map(|(name, _)| name).collect();

        let candidates: Vec<SchedulerCandidate> = self
            .runtimes
            .iter()
            .enumerate()
            .filter(|(_, (_, runtime))| runtime.needs_scheduling())
            .map(|(configuration_index, (target_name, runtime))| SchedulerCandidate {
                target_name,
                has_connected_client: runtime.has_connected_client,
                configuration_index,
            })
            .collect();
        let candidates = scheduler::exclude_already_running(candidates, &already_running);
        let ordered = scheduler::order_candidates(candidates, focused.as_ref());
        let selected: Vec<TargetName> = scheduler::select_for_slots(&ordered, free_slots).into_iter().cloned().collect();

        let mut effects = Vec::new();
        for name in selected {
            if let Some(runtime) = self.runtimes.get_mut(&name) {
                let is_typecheck = matches!(runtime.state, TargetState::QueuedForTypecheckOnly { .. });
                runtime.running_is_typecheck = is_typecheck;
                let mode = runtime.compilation_mode;
                runtime.state = state_machine::start_running(runtime.state.clone());
                let generation = runtime.state.generation().unwrap_or(runtime.next_generation);
                effects.push(if is_typecheck {
                    Effect::CompileTypecheck { target: name, generation }
                } else {
                    Effect::CompileMake { target: name, generation, mode }
                });
            }
        }
        effects
    }

    /// Snapshot every target's state for shutdown reporting (§4.4): anything
    /// still in-flight is reported `StuckInProgress`.
    pub fn shutdown_snapshot(&self) -> IndexMap<TargetName, TargetState> {
        self.runtimes.iter().map(|(name, runtime)| (name.clone(), state_machine::shutdown_snapshot(runtime.state.clone()))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_watch_core::test_support::test_target;
    use indexmap::IndexMap;

    fn project_with(names: &[&str]) -> Project {
        let root = AbsolutePath::new("/project").expect("absolute");
        let mut targets = IndexMap::new();
        for name in names {
            let target = test_target(name, &format!("{name}.js"));
            targets.insert(target.name.clone(), target);
        }
        Project::new(root, targets).expect("valid project")
    }

    #[test]
    fn start_hot_queues_typecheck_only_without_clients() {
        let project = project_with(&["Main"]);
        let mut supervisor = Supervisor::new(project, 4, RunMode::Hot, CompilationMode::Standard);
        supervisor.start_hot();
        let name = TargetName::new("Main").expect("valid");
        assert!(matches!(supervisor.state_of(&name), Some(TargetState::ElmMakeRunning { .. })) || matches!(supervisor.state_of(&name), Some(TargetState::QueuedForTypecheckOnly { .. })));
    }

    #[test]
    fn schedule_respects_parallelism_cap() {
        let project = project_with(&["A", "B", "C"]);
        let mut supervisor = Supervisor::new(project, 2, RunMode::Hot, CompilationMode::Standard);
        let effects = supervisor.start_hot();
        let running = effects.iter().filter(|e| matches!(e, Effect::CompileTypecheck { .. } | Effect::CompileMake { .. })).count();
        assert_eq!(running, 2);
    }

    #[test]
    fn client_connect_escalates_to_make_and_reschedules() {
        let project = project_with(&["Main"]);
        let mut supervisor = Supervisor::new(project, 1, RunMode::Hot, CompilationMode::Standard);
        supervisor.start_hot();
        let name = TargetName::new("Main").expect("valid");
        let effects = supervisor.client_connected(&name);
        assert!(effects.iter().any(|e| matches!(e, Effect::CompileMake { .. })));
    }

    #[test]
    fn compile_failure_reports_elm_error_state() {
        let project = project_with(&["Main"]);
        let mut supervisor = Supervisor::new(project, 1, RunMode::Hot, CompilationMode::Standard);
        supervisor.start_hot();
        let name = TargetName::new("Main").expect("valid");
        let generation = supervisor.state_of(&name).and_then(|s| s.generation()).expect("generation");
        supervisor.compile_finished(&name, generation, false, false);
        assert!(matches!(supervisor.state_of(&name), Some(TargetState::ElmError { .. })));
    }

    #[test]
    fn seeded_compilation_mode_is_used_for_the_next_compile() {
        let project = project_with(&["Main"]);
        let mut supervisor = Supervisor::new(project, 1, RunMode::Hot, CompilationMode::Standard);
        let name = TargetName::new("Main").expect("valid");
        supervisor.seed_compilation_mode(&name, CompilationMode::Optimize);
        supervisor.client_connected(&name);
        let effects = supervisor.start_hot();
        assert!(effects.iter().any(|e| matches!(e, Effect::CompileMake { mode: CompilationMode::Optimize, .. })));
    }

    #[test]
    fn changing_compilation_mode_requeues_a_make_and_persists() {
        let project = project_with(&["Main"]);
        let mut supervisor = Supervisor::new(project, 1, RunMode::Hot, CompilationMode::Standard);
        supervisor.start_hot();
        let name = TargetName::new("Main").expect("valid");
        let effects = supervisor.set_compilation_mode(&name, CompilationMode::Debug);
        assert!(effects.iter().any(|e| matches!(e, Effect::KillSubprocess { .. })));
        assert!(effects.iter().any(|e| matches!(e, Effect::PersistState)));
        assert_eq!(supervisor.compilation_mode_of(&name), Some(CompilationMode::Debug));
    }

    #[test]
    fn shutdown_snapshot_marks_running_targets_stuck() {
        let project = project_with(&["Main"]);
        let mut supervisor = Supervisor::new(project, 1, RunMode::Hot, CompilationMode::Standard);
        supervisor.start_hot();
        let name = TargetName::new("Main").expect("valid");
        let snapshot = supervisor.shutdown_snapshot();
        assert!(matches!(snapshot.get(&name), Some(TargetState::StuckInProgress { .. })));
    }
}
