// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects represent side effects the scheduler needs executed.
//!
//! The target state machine (`elm-watch-engine::state_machine`) is a pure
//! reducer: given a state and an event it returns a new state plus a list of
//! `Effect`s. The executor is the only place that actually spawns
//! subprocesses, writes files, or talks to the broker.

use crate::compilation_mode::{CompilationMode, RunMode};
use crate::event::TerminalEvent;
use crate::generation::Generation;
use crate::target::TargetName;
use crate::timer::TimerId;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Typecheck-only compile: no output file, just surfaces errors cheaply (§4.1).
    CompileTypecheck { target: TargetName, generation: Generation },

    /// Full compile that produces a JS artifact at the target's output path (§4.1).
    CompileMake { target: TargetName, generation: Generation, mode: CompilationMode },

    /// One dummy install compile in a scratch dir, run once before any real
    /// compile so package-manager errors surface as one project-level error (§4.1).
    CompileInstall { generation: Generation },

    /// Run the configured post-process (shell or scripted variant) over the
    /// freshly compiled artifact (§4.3).
    RunPostprocess { target: TargetName, generation: Generation, mode: CompilationMode, run_mode: RunMode },

    /// Rewrite the compiler's JS artifact for HMR participation (§4.2).
    InjectHotReload { target: TargetName, generation: Generation },

    /// Kill the in-flight subprocess for `target`, if any (§5 "Cancellation").
    KillSubprocess { target: TargetName, generation: Generation },

    /// Broadcast the freshly published artifact to connected clients for `target` (§4.7).
    BroadcastArtifactReady { target: TargetName },

    SetTimer { id: TimerId, duration: Duration },
    CancelTimer { id: TimerId },

    /// Persist port + per-target compilation mode (§3 PersistedState, §5).
    PersistState,

    EmitTerminalEvent(TerminalEvent),
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::CompileTypecheck { .. } => "compile_typecheck",
            Effect::CompileMake { .. } => "compile_make",
            Effect::CompileInstall { .. } => "compile_install",
            Effect::RunPostprocess { .. } => "run_postprocess",
            Effect::InjectHotReload { .. } => "inject_hot_reload",
            Effect::KillSubprocess { .. } => "kill_subprocess",
            Effect::BroadcastArtifactReady { .. } => "broadcast_artifact_ready",
            Effect::SetTimer { .. } => "set_timer",
            Effect::CancelTimer { .. } => "cancel_timer",
            Effect::PersistState => "persist_state",
            Effect::EmitTerminalEvent(_) => "emit_terminal_event",
        }
    }

    /// Whether this effect is frequent/low-signal enough to log tersely.
    pub fn verbose(&self) -> bool {
        !matches!(self, Effect::SetTimer { .. } | Effect::CancelTimer { .. } | Effect::EmitTerminalEvent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_stable_per_variant() {
        let effect = Effect::PersistState;
        assert_eq!(effect.name(), "persist_state");
    }
}
