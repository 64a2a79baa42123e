// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compilation mode and run mode (§4.1, §4.3).

use serde::{Deserialize, Serialize};

/// Standard, debug, or optimize — mutually exclusive per §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationMode {
    Standard,
    Debug,
    Optimize,
}

impl Default for CompilationMode {
    fn default() -> Self {
        Self::Standard
    }
}

crate::simple_display! {
    CompilationMode {
        Standard => "standard",
        Debug => "debug",
        Optimize => "optimize",
    }
}

/// Whether the supervisor is running `make` (one-shot) or `hot` (watch loop).
/// Passed through to post-process invocations as the third positional arg
/// (§4.3: "outputPath, compilationMode, runMode").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Make,
    Hot,
}

crate::simple_display! {
    RunMode {
        Make => "make",
        Hot => "hot",
    }
}
