// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! elm-watch-adapters: the boundary between pure supervisor logic and the
//! outside world — subprocess spawning, PATH lookup, environment snapshots,
//! and the file watcher. Every trait here has a `Real*` implementation that
//! touches the OS and, under `test-support`, a `Fake*` implementation that
//! records calls for assertions instead.

pub mod command;
pub mod command_lookup;
pub mod env_snapshot;
pub mod watcher;

pub use command::{CommandAdapter, CommandOutput, CommandSpec, ExitReason, KillHandle, RealCommandAdapter, SpawnError};
pub use command_lookup::{enoent_retry_candidate, find_on_path, locate_on_real_path, path_like_variable_names};
pub use env_snapshot::EnvSnapshot;
pub use watcher::{classify, FileWatcherAdapter, RawWatchEvent, RealFileWatcher, WatcherError};

#[cfg(any(test, feature = "test-support"))]
pub use command::FakeCommandAdapter;
#[cfg(any(test, feature = "test-support"))]
pub use watcher::FakeFileWatcher;
