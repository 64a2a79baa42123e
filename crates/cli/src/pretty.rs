// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A minimal terminal pretty-printer for `TerminalEvent` (§2, §6: "a
//! minimal pretty-printer is included... kept intentionally thin"). Behind
//! a trait seam so a future richer renderer, or a test double, can stand in
//! for it without touching the executor.

use crate::color;
use elm_watch_core::{Phase, ProgressOutcome, TerminalEvent};
use std::io::Write;

pub trait TerminalEventSink: Send + Sync {
    fn emit(&self, event: &TerminalEvent);
}

/// Writes one line per event to stdout, styled through `color` (§6).
pub struct TextSink;

impl TerminalEventSink for TextSink {
    fn emit(&self, event: &TerminalEvent) {
        let line = match event {
            TerminalEvent::Progress(record) => {
                let phase = match record.phase {
                    Phase::Dependencies => "dependencies",
                    Phase::ElmMake => "elm make",
                    Phase::Postprocess => "postprocess",
                    Phase::Idle => "idle",
                };
                let status = match record.outcome {
                    ProgressOutcome::InProgress => color::muted("in progress"),
                    ProgressOutcome::Success => color::success("ok"),
                    ProgressOutcome::Error => color::error("error"),
                };
                format!("{} {phase} {status}", color::header(record.target_name.as_str()))
            }
            TerminalEvent::ConnectionCount { count } => color::muted(&format!("{count} client(s) connected")),
            TerminalEvent::WatcherNote { message } => color::muted(message),
            TerminalEvent::CompilationFinishedIn { duration } => {
                color::muted(&format!("compiled in {}ms", duration.0.as_millis()))
            }
        };
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "{line}");
    }
}

/// Discards every event; used by `make` runs that render their own
/// per-target summary instead of streaming progress lines.
pub struct NullSink;

impl TerminalEventSink for NullSink {
    fn emit(&self, _event: &TerminalEvent) {}
}
