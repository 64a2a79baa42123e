// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `elm-watch` binary entry point: parse argv, resolve the project root,
//! load `elm-watch.json`, and dispatch to the selected command (§6).

mod args;
mod classify_state;
mod color;
mod config;
mod executor;
mod exit_error;
mod hot;
mod make;
mod node_runner;
mod pretty;
mod status;
mod supervisor_input;

use args::Command;
use exit_error::ExitError;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "elm_watch=info".into()))
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let code = match run(argv).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            err.code
        }
    };
    std::process::exit(code);
}

async fn run(argv: Vec<String>) -> Result<(), ExitError> {
    let command = args::parse(&argv).map_err(|err| ExitError::user(err.to_string()))?;

    match command {
        Command::Help => {
            println!("{}", args::HELP_TEXT);
            Ok(())
        }
        Command::Version => {
            println!("elm-watch {}", args::VERSION_TEXT);
            Ok(())
        }
        other => dispatch(other).await,
    }
}

async fn dispatch(command: Command) -> Result<(), ExitError> {
    let cwd = std::env::current_dir().map_err(|err| ExitError::new(1, err.to_string()))?;
    let project_root = config::find_project_root(&cwd).map_err(|err| ExitError::new(1, err.to_string()))?;

    match command {
        Command::Help | Command::Version => unreachable!("handled in run()"),
        Command::Make(make_args) => {
            let project = config::load(&project_root).map_err(|err| ExitError::user(err.to_string()))?;
            make::run(make::MakeOptions { project, target_args: make_args.targets, compilation_mode: make_args.compilation_mode() }).await
        }
        Command::Hot(hot_args) => {
            let project = config::load(&project_root).map_err(|err| ExitError::user(err.to_string()))?;
            let needles: Vec<&str> = hot_args.targets.iter().map(String::as_str).collect();
            let (matched, unknown) = project.match_targets(&needles);
            if !unknown.is_empty() {
                return Err(ExitError::user(format!("Unknown target(s): {}", unknown.join(", "))));
            }
            let enabled_targets = matched.into_iter().cloned().collect();
            hot::run(hot::HotOptions { project, enabled_targets, port_override: hot_args.port }).await
        }
        Command::Status(_) => status::run(status::StatusOptions { project_root }),
    }
}
