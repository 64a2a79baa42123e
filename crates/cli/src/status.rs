// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `status` command (§C.3 item 4). `hot` runs in the foreground with no
//! daemon process of its own, so there is no socket to dial; instead this
//! reads the persisted state file (§3 `PersistedState`) a `hot` run keeps up
//! to date at every commit point and reports the last snapshot it wrote.

use crate::exit_error::ExitError;
use elm_watch_core::AbsolutePath;

pub struct StatusOptions {
    pub project_root: AbsolutePath,
}

pub fn run(options: StatusOptions) -> Result<(), ExitError> {
    let path = elm_watch_storage::default_state_path(&options.project_root).into_path_buf();
    let state = elm_watch_storage::load(&path).map_err(|err| ExitError::new(1, err.to_string()))?;

    let Some(state) = state else {
        println!("No persisted state at {}; has `elm-watch hot` run here yet?", path.display());
        return Ok(());
    };

    println!("port: {}", state.port);
    if state.targets.is_empty() {
        println!("no targets recorded yet");
    }
    for (name, target_state) in &state.targets {
        println!("  {name}: last compiled with {:?}", target_state.compilation_mode);
    }
    println!("(reflects the last state `hot` persisted to disk, not a live query of a running process)");
    Ok(())
}
