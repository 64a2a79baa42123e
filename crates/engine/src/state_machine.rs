// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-target compile state machine (§4.4). Pure transition functions:
//! given a current `TargetState` and an event, produce the next state. The
//! engine's supervisor calls these and turns the resulting state changes
//! into `Effect` values; no I/O happens here.

use elm_watch_core::{Generation, TargetState};

/// Whether a target currently has a connected WebSocket client — decides
/// whether a newly-queued target starts in the cheap typecheck-only state
/// or escalates straight to a real build (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPresence {
    Connected,
    NotConnected,
}

/// The kind of file-change event that invalidates in-flight work (§4.4,
/// §4.6). `Input` means a module in the target's own closure changed;
/// `ConfigOrManifest` means the whole project must reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    Input,
    ConfigOrManifest,
}

/// Start hot mode for a target (§4.4: "Idle → QueuedForMake on startHot" for
/// enabled targets; unfocused/no-client targets start in typecheck-only).
pub fn start_hot(generation: Generation, presence: ClientPresence) -> TargetState {
    match presence {
        ClientPresence::Connected => TargetState::QueuedForMake { generation },
        ClientPresence::NotConnected => TargetState::QueuedForTypecheckOnly { generation },
    }
}

/// A client connected for a target that was only typecheck-queued — escalate
/// it to a real build (§4.4 rationale: avoid generating artifacts nobody
/// will load).
pub fn escalate_to_make(state: TargetState) -> TargetState {
    match state {
        TargetState::QueuedForTypecheckOnly { generation } => TargetState::QueuedForMake { generation },
        other => other,
    }
}

/// A scheduler slot opened for this target.
pub fn start_running(state: TargetState) -> TargetState {
    match state {
        TargetState::QueuedForTypecheckOnly { generation } | TargetState::QueuedForMake { generation } => {
            TargetState::ElmMakeRunning { generation }
        }
        other => other,
    }
}

/// The compile subprocess for `generation` succeeded. `has_postprocess`
/// decides whether the target needs a postprocess phase before Ready.
pub fn compile_succeeded(state: TargetState, completed_generation: Generation, has_postprocess: bool) -> TargetState {
    match state {
        TargetState::ElmMakeRunning { generation } if generation == completed_generation => {
            if has_postprocess {
                TargetState::PostprocessRunning { generation }
            } else {
                TargetState::Ready { generation }
            }
        }
        other => other,
    }
}

/// A typecheck-only compile succeeded. No artifact was produced, so unlike
/// `compile_succeeded` this does not reach `Ready`: the target goes back to
/// an escalatable `QueuedForTypecheckOnly` so a later client connect still
/// triggers a real build (§4.4 "only escalate to QueuedForMake when a client
/// connects").
pub fn typecheck_succeeded(state: TargetState, completed_generation: Generation) -> TargetState {
    match state {
        TargetState::ElmMakeRunning { generation } if generation == completed_generation => {
            TargetState::QueuedForTypecheckOnly { generation }
        }
        other => other,
    }
}

/// The compile subprocess for `completed_generation` failed.
pub fn compile_failed(state: TargetState, completed_generation: Generation) -> TargetState {
    match state {
        TargetState::ElmMakeRunning { generation } if generation == completed_generation => TargetState::ElmError { generation },
        other => other,
    }
}

pub fn postprocess_succeeded(state: TargetState, completed_generation: Generation) -> TargetState {
    match state {
        TargetState::PostprocessRunning { generation } if generation == completed_generation => TargetState::Ready { generation },
        other => other,
    }
}

pub fn postprocess_failed(state: TargetState, completed_generation: Generation) -> TargetState {
    match state {
        TargetState::PostprocessRunning { generation } if generation == completed_generation => {
            TargetState::PostprocessError { generation }
        }
        other => other,
    }
}

/// A relevant file change arrived (§4.4: "Any non-Idle → Interrupted on
/// relevant file change; subprocess killed; state then collapses to
/// QueuedForMake if the change is an input change, or back to Idle+rebuild-all
/// if the change is config/manifest"). `next_generation` is the generation
/// the re-queued state will carry.
pub fn invalidate(state: TargetState, kind: Invalidation, next_generation: Generation) -> TargetState {
    match state {
        TargetState::Idle => state,
        _ if state.has_live_subprocess() => match kind {
            Invalidation::Input => TargetState::Interrupted { generation: state.generation().unwrap_or(next_generation) },
            Invalidation::ConfigOrManifest => TargetState::Interrupted { generation: state.generation().unwrap_or(next_generation) },
        },
        TargetState::Ready { .. } | TargetState::ElmError { .. } | TargetState::PostprocessError { .. } => match kind {
            Invalidation::Input => TargetState::QueuedForMake { generation: next_generation },
            Invalidation::ConfigOrManifest => TargetState::Idle,
        },
        other => other,
    }
}

/// An interrupted target's killed subprocess has confirmed exit — re-queue
/// it (§4.6: "events received during ElmMakeRunning/PostprocessRunning mark
/// the target Interrupted and are re-queued once the killed subprocess has
/// confirmed exit").
pub fn requeue_after_interrupt(state: TargetState, next_generation: Generation) -> TargetState {
    match state {
        TargetState::Interrupted { .. } => TargetState::QueuedForMake { generation: next_generation },
        other => other,
    }
}

/// At shutdown, any state that is neither Ready nor a terminal error is
/// reported as StuckInProgress (§4.4).
pub fn shutdown_snapshot(state: TargetState) -> TargetState {
    if state.is_terminal_success() || state.is_terminal_error() || matches!(state, TargetState::Idle) {
        state
    } else {
        TargetState::StuckInProgress { generation: state.generation().unwrap_or(Generation::INITIAL) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_hot_without_client_begins_typecheck_only() {
        let state = start_hot(Generation::INITIAL, ClientPresence::NotConnected);
        assert_eq!(state, TargetState::QueuedForTypecheckOnly { generation: Generation::INITIAL });
    }

    #[test]
    fn start_hot_with_client_begins_make() {
        let state = start_hot(Generation::INITIAL, ClientPresence::Connected);
        assert_eq!(state, TargetState::QueuedForMake { generation: Generation::INITIAL });
    }

    #[test]
    fn escalate_promotes_typecheck_only_to_make() {
        let state = TargetState::QueuedForTypecheckOnly { generation: Generation::INITIAL };
        assert_eq!(escalate_to_make(state), TargetState::QueuedForMake { generation: Generation::INITIAL });
    }

    #[test]
    fn escalate_is_noop_for_other_states() {
        let state = TargetState::Ready { generation: Generation::INITIAL };
        assert_eq!(escalate_to_make(state), state);
    }

    #[test]
    fn compile_success_without_postprocess_reaches_ready() {
        let state = TargetState::ElmMakeRunning { generation: Generation::INITIAL };
        assert_eq!(compile_succeeded(state, Generation::INITIAL, false), TargetState::Ready { generation: Generation::INITIAL });
    }

    #[test]
    fn compile_success_with_postprocess_moves_to_postprocess_running() {
        let state = TargetState::ElmMakeRunning { generation: Generation::INITIAL };
        assert_eq!(
            compile_succeeded(state, Generation::INITIAL, true),
            TargetState::PostprocessRunning { generation: Generation::INITIAL }
        );
    }

    #[test]
    fn typecheck_success_returns_to_queued_for_typecheck_only_not_ready() {
        let state = TargetState::ElmMakeRunning { generation: Generation::INITIAL };
        assert_eq!(
            typecheck_succeeded(state, Generation::INITIAL),
            TargetState::QueuedForTypecheckOnly { generation: Generation::INITIAL }
        );
    }

    #[test]
    fn stale_generation_exit_does_not_transition_state() {
        let current = Generation::INITIAL.next();
        let state = TargetState::ElmMakeRunning { generation: current };
        let result = compile_succeeded(state, Generation::INITIAL, false);
        assert_eq!(result, state, "stale exit from an earlier generation must not transition a newer running state");
    }

    #[test]
    fn input_change_during_running_interrupts() {
        let state = TargetState::ElmMakeRunning { generation: Generation::INITIAL };
        let next = Generation::INITIAL.next();
        assert_eq!(invalidate(state, Invalidation::Input, next), TargetState::Interrupted { generation: Generation::INITIAL });
    }

    #[test]
    fn input_change_on_ready_requeues_for_make() {
        let state = TargetState::Ready { generation: Generation::INITIAL };
        let next = Generation::INITIAL.next();
        assert_eq!(invalidate(state, Invalidation::Input, next), TargetState::QueuedForMake { generation: next });
    }

    #[test]
    fn config_change_on_ready_resets_to_idle() {
        let state = TargetState::Ready { generation: Generation::INITIAL };
        let next = Generation::INITIAL.next();
        assert_eq!(invalidate(state, Invalidation::ConfigOrManifest, next), TargetState::Idle);
    }

    #[test]
    fn interrupted_target_requeues_on_confirmed_exit() {
        let state = TargetState::Interrupted { generation: Generation::INITIAL };
        let next = Generation::INITIAL.next();
        assert_eq!(requeue_after_interrupt(state, next), TargetState::QueuedForMake { generation: next });
    }

    #[test]
    fn shutdown_marks_running_state_stuck() {
        let state = TargetState::PostprocessRunning { generation: Generation::INITIAL };
        assert_eq!(shutdown_snapshot(state), TargetState::StuckInProgress { generation: Generation::INITIAL });
    }

    #[test]
    fn shutdown_leaves_ready_alone() {
        let state = TargetState::Ready { generation: Generation::INITIAL };
        assert_eq!(shutdown_snapshot(state), state);
    }
}
