// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Everything that can arrive at the hot-mode event loop (§5 "Suspension
//! points"): watcher batches, subprocess completions, broker traffic, and
//! timers. The executor produces these from the effects it runs; the loop
//! in `hot.rs` feeds them straight back into `Supervisor`.

use elm_watch_compiler::CompileOutcome;
use elm_watch_core::{AbsolutePath, FileClassification, Generation, TargetName, TimerId};
use elm_watch_wire::ClientMessage;

/// What a `CompileTypecheck`/`CompileMake` effect produced, once the
/// subprocess exited. `artifact` is only populated for a successful `Make`
/// (the bytes just written to the target's output file); `TypecheckOnly`
/// never has one, matching the engine's own `CompileMode` split.
#[derive(Debug)]
pub struct CompileResult {
    pub outcome: CompileOutcome,
    pub artifact: Option<Vec<u8>>,
}

#[derive(Debug)]
pub enum PostprocessResult {
    Success { code: Vec<u8> },
    Failed { message: String },
}

#[derive(Debug)]
pub enum InjectResult {
    Success { code: Vec<u8>, compiled_timestamp: u64 },
    Failed { message: String },
}

#[derive(Debug)]
pub enum SupervisorInput {
    FileChanged { path: AbsolutePath, classification: FileClassification },
    CompileFinished { target: TargetName, generation: Generation, result: CompileResult },
    PostprocessFinished { target: TargetName, generation: Generation, result: PostprocessResult },
    InjectFinished { target: TargetName, generation: Generation, result: InjectResult },
    SubprocessKilled { target: TargetName },
    ClientConnected { target: TargetName },
    ClientDisconnected { target: TargetName },
    ClientFocused { target: TargetName },
    ClientMessage { target: TargetName, message: ClientMessage },
    TimerFired { id: TimerId },
    Shutdown,
}
