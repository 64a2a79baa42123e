// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level command dispatch (§6). Help/unknown-command handling is
//! hand-rolled to match the exact required wording; each command's own
//! flags are parsed with `clap::Parser` since that's the idiomatic fit for
//! a fixed flag set.

use clap::Parser;
use elm_watch_core::CompilationMode;

pub const HELP_TEXT: &str = "\
elm-watch <command> [options] [targets...]

Commands:
  make [--debug|--optimize] [targets...]   Compile every target once and exit
  hot [--port <port>] [targets...]         Watch, recompile, and serve hot reloads
  status                                    Print the running hot-mode supervisor's target states

targets... are matched as substrings against configured target names; with
none given, every target runs.
";

#[derive(Debug, Parser)]
#[command(name = "elm-watch make", disable_help_flag = true, disable_help_subcommand = true)]
pub struct MakeArgs {
    #[arg(long, conflicts_with = "optimize")]
    pub debug: bool,
    #[arg(long, conflicts_with = "debug")]
    pub optimize: bool,
    pub targets: Vec<String>,
}

impl MakeArgs {
    pub fn compilation_mode(&self) -> CompilationMode {
        if self.debug {
            CompilationMode::Debug
        } else if self.optimize {
            CompilationMode::Optimize
        } else {
            CompilationMode::Standard
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "elm-watch hot", disable_help_flag = true, disable_help_subcommand = true)]
pub struct HotArgs {
    /// Overrides the persisted/ephemeral port selection (§C.3 supplement).
    #[arg(long)]
    pub port: Option<u16>,
    pub targets: Vec<String>,
}

#[derive(Debug, Parser)]
#[command(name = "elm-watch status", disable_help_flag = true, disable_help_subcommand = true)]
pub struct StatusArgs {}

#[derive(Debug)]
pub enum Command {
    Help,
    Version,
    Make(MakeArgs),
    Hot(HotArgs),
    Status(StatusArgs),
}

/// `CARGO_PKG_VERSION` plus the commit `build.rs` recorded, e.g. `0.1.0
/// (a1b2c3d)`.
pub const VERSION_TEXT: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Debug, thiserror::Error)]
pub enum ArgsError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("{0}")]
    Clap(#[from] clap::Error),
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "-help" || arg == "--help"
}

fn is_version_flag(arg: &str) -> bool {
    arg == "-V" || arg == "--version"
}

/// Parse the process argv (without argv[0]) into a `Command` (§6: "Help is
/// printed when args are empty or `-h/-help/--help` is present anywhere").
pub fn parse(args: &[String]) -> Result<Command, ArgsError> {
    if args.is_empty() || args.iter().any(|a| is_help_flag(a)) {
        return Ok(Command::Help);
    }
    if args.iter().any(|a| is_version_flag(a)) {
        return Ok(Command::Version);
    }

    let (command_name, rest) = args.split_first().expect("checked non-empty above");
    let with_program_name = |program: &str| std::iter::once(program.to_string()).chain(rest.iter().cloned());

    match command_name.as_str() {
        "make" => Ok(Command::Make(MakeArgs::try_parse_from(with_program_name("elm-watch make"))?)),
        "hot" => Ok(Command::Hot(HotArgs::try_parse_from(with_program_name("elm-watch hot"))?)),
        "status" => Ok(Command::Status(StatusArgs::try_parse_from(with_program_name("elm-watch status"))?)),
        other => Err(ArgsError::UnknownCommand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_args_is_help() {
        assert!(matches!(parse(&args(&[])), Ok(Command::Help)));
    }

    #[test]
    fn help_flag_anywhere_wins() {
        assert!(matches!(parse(&args(&["make", "--help"])), Ok(Command::Help)));
        assert!(matches!(parse(&args(&["-h"])), Ok(Command::Help)));
    }

    #[test]
    fn version_flag_anywhere_wins() {
        assert!(matches!(parse(&args(&["hot", "--version"])), Ok(Command::Version)));
        assert!(matches!(parse(&args(&["-V"])), Ok(Command::Version)));
    }

    #[test]
    fn unknown_command_is_an_error() {
        let err = parse(&args(&["frobnicate"])).unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: frobnicate");
    }

    #[test]
    fn make_parses_targets_and_debug_flag() {
        let command = parse(&args(&["make", "--debug", "Main", "Html"])).expect("parses");
        match command {
            Command::Make(make_args) => {
                assert_eq!(make_args.compilation_mode(), CompilationMode::Debug);
                assert_eq!(make_args.targets, vec!["Main".to_string(), "Html".to_string()]);
            }
            other => panic!("expected Make, got {other:?}"),
        }
    }

    #[test]
    fn make_rejects_debug_and_optimize_together() {
        let err = parse(&args(&["make", "--debug", "--optimize"])).unwrap_err();
        assert!(matches!(err, ArgsError::Clap(_)));
    }

    #[test]
    fn hot_rejects_debug_flag() {
        let err = parse(&args(&["hot", "--debug"])).unwrap_err();
        assert!(matches!(err, ArgsError::Clap(_)));
    }

    #[test]
    fn hot_parses_port_override() {
        let command = parse(&args(&["hot", "--port", "9000", "Main"])).expect("parses");
        match command {
            Command::Hot(hot_args) => {
                assert_eq!(hot_args.port, Some(9000));
                assert_eq!(hot_args.targets, vec!["Main".to_string()]);
            }
            other => panic!("expected Hot, got {other:?}"),
        }
    }
}
