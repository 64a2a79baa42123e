// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Node.js harness that hosts one `elm-watch-node` user script (§4.3,
//! §9). `ScriptedWorkerPool` spawns this file with the user's script path as
//! its one argument; it speaks the same newline-delimited JSON protocol
//! `worker_pool.rs` expects on the other end.

use elm_watch_core::AbsolutePath;
use std::io;

const SOURCE: &str = r#"'use strict';
const readline = require('readline');

const scriptPath = process.argv[2];
let userFn;
try {
  const mod = require(scriptPath);
  userFn = mod && mod.__esModule ? mod.default : mod;
} catch (err) {
  if (err && err.code === 'MODULE_NOT_FOUND') {
    reply({ outcome: 'missing_script' });
  } else {
    reply({ outcome: 'import_error', message: String(err && err.message || err) });
  }
  process.exitCode = 1;
}

function reply(value) {
  process.stdout.write(JSON.stringify(value) + '\n');
}

if (userFn !== undefined && typeof userFn !== 'function') {
  reply({ outcome: 'default_export_not_function' });
  process.exit(1);
}

if (userFn) {
  const rl = readline.createInterface({ input: process.stdin, terminal: false });
  rl.on('line', (line) => {
    let request;
    try {
      request = JSON.parse(line);
    } catch (err) {
      reply({ outcome: 'run_error', message: 'bad request JSON: ' + String(err) });
      return;
    }
    const args = [
      request.code,
      request.target_name,
      request.compilation_mode,
      request.run_mode,
      ...(request.user_args || [])
    ];
    Promise.resolve()
      .then(() => userFn(args))
      .then((result) => {
        if (typeof result !== 'string') {
          reply({ outcome: 'bad_return_value' });
        } else {
          reply({ outcome: 'ok', code: result });
        }
      })
      .catch((err) => {
        reply({ outcome: 'run_error', message: String(err && err.message || err) });
      });
  });
}
"#;

pub const RUNNER_FILE_NAME: &str = "elm-watch-node-runner.js";

/// Write the harness to `<project_root>/elm-stuff/elm-watch-node-runner.js`
/// if it doesn't already exist with this exact content, returning its path.
pub fn materialize(project_root: &AbsolutePath) -> io::Result<AbsolutePath> {
    let dir = project_root.join_normalized("elm-stuff");
    std::fs::create_dir_all(dir.as_path())?;
    let path = dir.join_normalized(RUNNER_FILE_NAME);
    let needs_write = match std::fs::read(path.as_path()) {
        Ok(existing) => existing != SOURCE.as_bytes(),
        Err(_) => true,
    };
    if needs_write {
        std::fs::write(path.as_path(), SOURCE)?;
    }
    Ok(path)
}
