//! Black-box CLI specs run against the built `elm-watch` binary (§6, §8).
//! Kept thin: anything that needs a real `elm` compiler on PATH belongs in
//! each crate's own unit tests instead, where the adapters are fakeable.

use assert_cmd::Command;
use predicates::str::contains;
use std::fs;

fn elm_watch() -> Command {
    Command::cargo_bin("elm-watch").expect("binary built")
}

#[test]
fn no_args_prints_help_and_exits_zero() {
    elm_watch().assert().success().stdout(contains("elm-watch <command>"));
}

#[test]
fn help_flag_anywhere_prints_help() {
    elm_watch().arg("make").arg("--help").assert().success().stdout(contains("Commands:"));
}

#[test]
fn version_flag_prints_version() {
    elm_watch().arg("--version").assert().success().stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_command_exits_nonzero() {
    elm_watch().arg("frobnicate").assert().failure().stderr(contains("Unknown command"));
}

#[test]
fn missing_config_reports_template() {
    let dir = tempfile::tempdir().expect("tempdir");
    elm_watch()
        .current_dir(dir.path())
        .arg("make")
        .assert()
        .failure()
        .stderr(contains("elm-watch.json NOT FOUND"));
}

#[test]
fn make_with_unknown_target_exits_nonzero() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("elm-watch.json"),
        br#"{"targets":{"main":{"inputs":["src/Main.elm"],"output":"main.js"}}}"#,
    )
    .expect("write config");

    elm_watch()
        .current_dir(dir.path())
        .arg("make")
        .arg("does-not-exist")
        .assert()
        .failure()
        .stderr(contains("Unknown target"));
}

#[test]
fn status_without_prior_hot_run_says_so() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("elm-watch.json"),
        br#"{"targets":{"main":{"inputs":["src/Main.elm"],"output":"main.js"}}}"#,
    )
    .expect("write config");

    elm_watch()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No persisted state"));
}
