// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identities for debounce and idle-worker-reap suspension points (§5).

use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct TimerId("tmr-");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Coalesce a burst of watcher events within a short window (§4.6).
    Debounce,
    /// Reap an idle scripted-postprocess worker beyond the first spare one (§3).
    IdleWorkerReap,
    /// Grace period for the stdin-EPIPE/exit race (§9 Open Question).
    StdinEpipeGrace,
}
