// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-target compile state machine (§3, §4.4).
//!
//! `TargetState` is a pure value; the transition *logic* (which events are
//! legal from which states, and what effects they produce) lives in
//! `elm-watch-engine::state_machine` so this crate stays free of the
//! compiler/postprocess/adapter dependencies that logic needs. This module
//! only defines the states themselves and which generation (if any) they carry.

use crate::generation::Generation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetState {
    Idle,
    QueuedForTypecheckOnly { generation: Generation },
    QueuedForMake { generation: Generation },
    ElmMakeRunning { generation: Generation },
    PostprocessRunning { generation: Generation },
    /// A subprocess was killed because a newer event arrived; the exit of
    /// the killed process is still pending and must be matched against
    /// `generation` and ignored if stale.
    Interrupted { generation: Generation },
    Ready { generation: Generation },
    ElmError { generation: Generation },
    PostprocessError { generation: Generation },
    /// Only observable at shutdown when parallelism cap is 0 (test hook) or
    /// when the process is killed mid-build (§4.4).
    StuckInProgress { generation: Generation },
}

impl TargetState {
    /// The generation that produced this state, if any (`Idle` has none).
    pub fn generation(&self) -> Option<Generation> {
        match self {
            TargetState::Idle => None,
            TargetState::QueuedForTypecheckOnly { generation }
            | TargetState::QueuedForMake { generation }
            | TargetState::ElmMakeRunning { generation }
            | TargetState::PostprocessRunning { generation }
            | TargetState::Interrupted { generation }
            | TargetState::Ready { generation }
            | TargetState::ElmError { generation }
            | TargetState::PostprocessError { generation }
            | TargetState::StuckInProgress { generation } => Some(*generation),
        }
    }

    /// At most one subprocess exists per target (§3, §8 "At-most-one per
    /// target"): true exactly in the two running states.
    pub fn has_live_subprocess(&self) -> bool {
        matches!(self, TargetState::ElmMakeRunning { .. } | TargetState::PostprocessRunning { .. })
    }

    pub fn is_terminal_success(&self) -> bool {
        matches!(self, TargetState::Ready { .. })
    }

    pub fn is_terminal_error(&self) -> bool {
        matches!(self, TargetState::ElmError { .. } | TargetState::PostprocessError { .. })
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, TargetState::QueuedForTypecheckOnly { .. } | TargetState::QueuedForMake { .. })
    }
}

crate::simple_display! {
    TargetState {
        Idle => "Idle",
        QueuedForTypecheckOnly(..) => "QueuedForTypecheckOnly",
        QueuedForMake(..) => "QueuedForMake",
        ElmMakeRunning(..) => "ElmMakeRunning",
        PostprocessRunning(..) => "PostprocessRunning",
        Interrupted(..) => "Interrupted",
        Ready(..) => "Ready",
        ElmError(..) => "ElmError",
        PostprocessError(..) => "PostprocessError",
        StuckInProgress(..) => "StuckInProgress",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_has_no_generation() {
        assert_eq!(TargetState::Idle.generation(), None);
    }

    #[test]
    fn running_states_have_live_subprocess() {
        let g = Generation::INITIAL;
        assert!(TargetState::ElmMakeRunning { generation: g }.has_live_subprocess());
        assert!(TargetState::PostprocessRunning { generation: g }.has_live_subprocess());
        assert!(!TargetState::Ready { generation: g }.has_live_subprocess());
        assert!(!TargetState::Idle.has_live_subprocess());
    }
}
