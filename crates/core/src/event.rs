// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured events the terminal pretty-printer consumes (§2, §6). The
//! pretty-printer itself is out of scope (§1); this is the fixed interface
//! it reads from.

use crate::target::TargetName;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Dependencies,
    ElmMake,
    Postprocess,
    Idle,
}

crate::simple_display! {
    Phase {
        Dependencies => "Dependencies",
        ElmMake => "ElmMake",
        Postprocess => "Postprocess",
        Idle => "Idle",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressOutcome {
    InProgress,
    Success,
    Error,
}

/// Per-target durations, all optional because a given transition only
/// populates the phases it actually ran through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub queue_ms: Option<u64>,
    pub elm_make_ms: Option<u64>,
    pub read_ms: Option<u64>,
    pub postprocess_ms: Option<u64>,
    pub total_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub target_name: TargetName,
    pub phase: Phase,
    pub outcome: ProgressOutcome,
    pub durations: Durations,
    pub size_before_bytes: Option<u64>,
    pub size_after_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalEvent {
    Progress(ProgressRecord),
    ConnectionCount { count: usize },
    WatcherNote { message: String },
    CompilationFinishedIn { duration: CompatDuration },
}

/// `std::time::Duration` doesn't implement Eq; wrap it so `TerminalEvent`
/// derives can stay simple and tests can compare events structurally.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompatDuration(#[serde(with = "duration_ms")] pub Duration);

impl PartialEq for CompatDuration {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for CompatDuration {}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        duration.as_millis().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
