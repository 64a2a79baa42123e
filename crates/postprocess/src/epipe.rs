// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The stdin-EPIPE/exit race policy (§4.3, §9 "Open question"). The source
//! treats EPIPE-then-exit-0 as success and EPIPE-then-nonzero-exit as a
//! stdin-write error; the ordering between the write failure and the exit
//! is inherently racy, so the policy is reproduced exactly rather than
//! "fixed" — a grace period lets the exit event win the race before the
//! stdin error is reported. The wait itself is bounded by
//! `RealCommandAdapter::run`, which owns the subprocess handle; this module
//! only classifies the result once both sides of the race are known.
use elm_watch_adapters::ExitReason;

pub use elm_watch_adapters::STDIN_EPIPE_GRACE_PERIOD;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpipeOutcome {
    /// No stdin write failure, or one that raced a clean exit — not an error.
    NotAnError,
    /// Stdin write failed and the process exited non-zero: user forgot to
    /// read stdin.
    StdinWriteError,
}

/// Decide the outcome once both the stdin-write result and the process exit
/// are known (§4.3: "if the process exits 0 with an EPIPE that raced the
/// exit, that succeeds").
pub fn classify_epipe_race(stdin_write_failed: bool, exit: ExitReason) -> EpipeOutcome {
    if !stdin_write_failed {
        return EpipeOutcome::NotAnError;
    }
    match exit {
        ExitReason::Code(0) => EpipeOutcome::NotAnError,
        _ => EpipeOutcome::StdinWriteError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_write_failure_is_never_an_error() {
        assert_eq!(classify_epipe_race(false, ExitReason::Code(1)), EpipeOutcome::NotAnError);
    }

    #[test]
    fn write_failure_with_clean_exit_is_not_an_error() {
        assert_eq!(classify_epipe_race(true, ExitReason::Code(0)), EpipeOutcome::NotAnError);
    }

    #[test]
    fn write_failure_with_nonzero_exit_is_an_error() {
        assert_eq!(classify_epipe_race(true, ExitReason::Code(1)), EpipeOutcome::StdinWriteError);
    }

    #[test]
    fn write_failure_with_signal_exit_is_an_error() {
        assert_eq!(classify_epipe_race(true, ExitReason::Signal(15)), EpipeOutcome::StdinWriteError);
    }
}
