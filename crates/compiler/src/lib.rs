// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! elm-watch-compiler: builds the elm compiler command line, runs it through
//! an `elm-watch-adapters::CommandAdapter`, and classifies the outcome
//! (§4.1). Never retries — retry policy is the supervisor's job.

mod driver;

pub use driver::{CompileMode, CompileOutcome, CompileRequest, CompilerDriver, CompilerReportErrorDisplay, DriverError};
