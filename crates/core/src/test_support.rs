// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only builders shared across crates (gated behind `test-support`).

use crate::path::AbsolutePath;
use crate::target::{InputModule, PostprocessCommand, Target, TargetName};

/// Build a minimal valid `Target` for tests without repeating the
/// name/inputs/output boilerplate at every call site.
pub fn test_target(name: &str, output: &str) -> Target {
    Target::new(
        TargetName::new(name).expect("valid test target name"),
        vec![InputModule::new("src/Main.elm")],
        AbsolutePath::new(output).expect("absolute test output path"),
        None,
    )
    .expect("valid test target")
}

pub fn test_target_with_postprocess(name: &str, output: &str, argv: Vec<&str>) -> Target {
    let mut t = test_target(name, output);
    t.postprocess = PostprocessCommand::new(argv.into_iter().map(String::from).collect());
    t
}
