// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scripted (`elm-watch-node`) post-process worker pool (§4.3, §9:
//! "Model each worker as an owned subprocess with a typed request/reply
//! channel"). Each worker is a long-lived Node child process hosting one
//! loaded user script; requests and replies are newline-delimited JSON sent
//! over the child's stdin/stdout, because the request/reply cadence here
//! doesn't fit `CommandAdapter`'s spawn-to-completion shape.

use elm_watch_core::{define_id, CompilationMode, RunMode};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};

define_id! {
    /// Identifies one scripted-postprocess worker subprocess.
    pub struct WorkerId("wkr-");
}

#[derive(Debug, Clone, Serialize)]
struct WorkerRequest {
    code: String,
    target_name: String,
    compilation_mode: CompilationMode,
    run_mode: RunMode,
    user_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum WorkerReplyWire {
    Ok { code: String },
    MissingScript,
    ImportError { message: String },
    DefaultExportNotFunction,
    RunError { message: String },
    BadReturnValue,
}

/// Failure modes of the scripted variant (§4.3): "errors are values", never
/// exceptions that cross the supervisor boundary.
#[derive(Debug, Clone, Error)]
pub enum ScriptedPostprocessError {
    #[error("postprocess script not found")]
    MissingScript,
    #[error("failed to import postprocess script: {0}")]
    ImportError(String),
    #[error("postprocess script's default export is not a function")]
    DefaultExportNotFunction,
    #[error("postprocess script threw: {0}")]
    RunError(String),
    #[error("postprocess script did not return a string")]
    BadReturnValue,
    #[error("worker subprocess failed: {0}")]
    WorkerFailure(String),
}

impl From<WorkerReplyWire> for Result<String, ScriptedPostprocessError> {
    fn from(wire: WorkerReplyWire) -> Self {
        match wire {
            WorkerReplyWire::Ok { code } => Ok(code),
            WorkerReplyWire::MissingScript => Err(ScriptedPostprocessError::MissingScript),
            WorkerReplyWire::ImportError { message } => Err(ScriptedPostprocessError::ImportError(message)),
            WorkerReplyWire::DefaultExportNotFunction => Err(ScriptedPostprocessError::DefaultExportNotFunction),
            WorkerReplyWire::RunError { message } => Err(ScriptedPostprocessError::RunError(message)),
            WorkerReplyWire::BadReturnValue => Err(ScriptedPostprocessError::BadReturnValue),
        }
    }
}

struct Worker {
    id: WorkerId,
    script_path: PathBuf,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    async fn spawn(node_runner: &str, runner_script: &PathBuf, script_path: &PathBuf) -> Result<Self, ScriptedPostprocessError> {
        let mut child = tokio::process::Command::new(node_runner)
            .arg(runner_script)
            .arg(script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ScriptedPostprocessError::WorkerFailure(e.to_string()))?;

        let stdin = child.stdin.take().ok_or_else(|| ScriptedPostprocessError::WorkerFailure("no stdin".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| ScriptedPostprocessError::WorkerFailure("no stdout".to_string()))?;

        Ok(Self { id: WorkerId::new(), script_path: script_path.clone(), child, stdin, stdout: BufReader::new(stdout) })
    }

    async fn request(
        &mut self,
        code: String,
        target_name: String,
        compilation_mode: CompilationMode,
        run_mode: RunMode,
        user_args: Vec<String>,
    ) -> Result<String, ScriptedPostprocessError> {
        let request = WorkerRequest { code, target_name, compilation_mode, run_mode, user_args };
        let mut line = serde_json::to_string(&request).map_err(|e| ScriptedPostprocessError::WorkerFailure(e.to_string()))?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await.map_err(|e| ScriptedPostprocessError::WorkerFailure(e.to_string()))?;

        let mut reply_line = String::new();
        let bytes_read = self
            .stdout
            .read_line(&mut reply_line)
            .await
            .map_err(|e| ScriptedPostprocessError::WorkerFailure(e.to_string()))?;
        if bytes_read == 0 {
            return Err(ScriptedPostprocessError::WorkerFailure("worker closed stdout".to_string()));
        }

        let wire: WorkerReplyWire =
            serde_json::from_str(reply_line.trim_end()).map_err(|e| ScriptedPostprocessError::WorkerFailure(e.to_string()))?;
        Result::<String, ScriptedPostprocessError>::from(wire)
    }

    async fn kill(&mut self) {
        let _ = self.child.kill().await;
    }
}

/// Bounds concurrency at a per-project cap (§4.3) and kills+replaces every
/// worker when the script file changes (§5: "a change to the script file
/// invalidates all workers").
///
/// `in_flight` counts requests currently being serviced, not cumulative
/// spawns: every `run()` call increments it, win or lose, and decrements it
/// once its worker is done, regardless of whether that worker was freshly
/// spawned or pulled from `idle`. A new worker is only spawned when
/// `in_flight` plus the idle count is already at the cap — `idle.len()` is
/// read fresh each time rather than folded into the counter, so reaping idle
/// workers shrinks capacity usage immediately without `in_flight` itself
/// needing to know about it.
pub struct ScriptedWorkerPool {
    node_runner: String,
    runner_script: PathBuf,
    script_path: PathBuf,
    cap: usize,
    idle: Mutex<VecDeque<Worker>>,
    in_flight: Mutex<usize>,
}

impl ScriptedWorkerPool {
    pub fn new(node_runner: impl Into<String>, runner_script: PathBuf, script_path: PathBuf, cap: usize) -> Self {
        Self {
            node_runner: node_runner.into(),
            runner_script,
            script_path,
            cap: cap.max(1),
            idle: Mutex::new(VecDeque::new()),
            in_flight: Mutex::new(0),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Run one scripted post-process invocation, reusing an idle worker or
    /// spawning a fresh one while under the cap (§4.3).
    pub async fn run(
        &self,
        code: String,
        target_name: String,
        compilation_mode: CompilationMode,
        run_mode: RunMode,
        user_args: Vec<String>,
    ) -> Result<String, ScriptedPostprocessError> {
        let mut worker = match self.idle.lock().pop_front() {
            Some(worker) => {
                *self.in_flight.lock() += 1;
                worker
            }
            None => {
                {
                    let mut in_flight = self.in_flight.lock();
                    if *in_flight + self.idle.lock().len() >= self.cap {
                        return Err(ScriptedPostprocessError::WorkerFailure("worker pool exhausted".to_string()));
                    }
                    *in_flight += 1;
                }
                Worker::spawn(&self.node_runner, &self.runner_script, &self.script_path).await?
            }
        };

        let result = worker.request(code, target_name, compilation_mode, run_mode, user_args).await;
        *self.in_flight.lock() -= 1;
        self.idle.lock().push_back(worker);
        result
    }

    /// Kill every idle worker because the script file changed (§5). Workers
    /// currently servicing a request finish it against the old script and
    /// self-report through `run`'s own bookkeeping when they return to idle;
    /// `in_flight` is left alone so that decrement doesn't underflow.
    pub async fn invalidate_all(&self) {
        let mut idle = self.idle.lock().split_off(0);
        for worker in idle.iter_mut() {
            worker.kill().await;
        }
    }

    /// Terminate idle workers beyond the first, per the idle-worker reaper
    /// (§3 PersistedState docs: "Idle workers beyond one are terminated
    /// after a timeout"). Called when the engine's idle-reap timer fires.
    pub async fn reap_idle_beyond_one(&self) {
        let mut idle = self.idle.lock();
        while idle.len() > 1 {
            if let Some(mut worker) = idle.pop_back() {
                worker.kill().await;
            }
        }
    }
}
