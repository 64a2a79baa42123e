// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The WebSocket upgrade validation sequence (§4.7, steps 1-4). Kept free of
//! `elm-watch-engine` so the broker can't depend on the supervisor crate;
//! callers answer through the small `TargetLookup` trait instead.

use elm_watch_core::CompilationMode;
use elm_watch_wire::{ConnectParams, ConnectParamsError, StatusChanged, UnexpectedErrorKind};

/// What the caller knows about one target name at connect time — enough to
/// run the §4.7 validation sequence without the broker depending on the
/// engine's `TargetState`.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetConnectState {
    NotFound,
    Disabled,
    /// The target is `Ready` with the given published artifact.
    Ready { compiled_timestamp: u64, compilation_mode: CompilationMode },
    /// The target is queued for a typecheck-only compile — connecting
    /// escalates it to a real build (§4.4 rationale).
    QueuedForTypecheckOnly,
    /// Any other in-flight or error state: the client just waits.
    Other,
}

pub trait TargetLookup: Send + Sync {
    /// All configured (enabled) target names, used to suggest candidates in
    /// `UnexpectedError` responses.
    fn candidate_names(&self) -> Vec<String>;
    fn resolve(&self, target_name: &str) -> TargetConnectState;
}

/// The outcome of validating one connection's query string against the
/// supervisor's state (§4.7 steps 2-4).
pub struct ValidatedConnect {
    pub target_name: String,
    /// True if this connect should escalate a typecheck-only target to a
    /// real build (step 4); the caller (which owns the supervisor) performs
    /// the actual escalation.
    pub escalate_to_make: bool,
    pub initial_status: StatusChanged,
}

/// Run steps 2-4 of the upgrade validation sequence over a decoded query
/// string. Step 1 (path must be root) is the router's job, since it doesn't
/// need `ConnectParams` at all.
pub fn validate_connect(query: &str, server_version: &str, lookup: &dyn TargetLookup) -> Result<ValidatedConnect, StatusChanged> {
    let params = ConnectParams::decode(query).map_err(|err| match err {
        ConnectParamsError::Missing(_) | ConnectParamsError::BadTimestamp(_) => {
            StatusChanged::UnexpectedError(UnexpectedErrorKind::ParamsDecodeError { message: err.to_string() })
        }
    })?;

    if params.elm_watch_version != server_version {
        return Err(StatusChanged::UnexpectedError(UnexpectedErrorKind::WrongVersion {
            server_version: server_version.to_string(),
            client_version: params.elm_watch_version,
        }));
    }

    match lookup.resolve(&params.target_name) {
        TargetConnectState::NotFound => Err(StatusChanged::UnexpectedError(UnexpectedErrorKind::TargetNotFound {
            target_name: params.target_name,
            candidates: lookup.candidate_names(),
        })),
        TargetConnectState::Disabled => Err(StatusChanged::UnexpectedError(UnexpectedErrorKind::TargetDisabled {
            target_name: params.target_name,
            candidates: lookup.candidate_names(),
        })),
        TargetConnectState::Ready { compiled_timestamp, compilation_mode } if compiled_timestamp == params.elm_compiled_timestamp => {
            Ok(ValidatedConnect {
                target_name: params.target_name,
                escalate_to_make: false,
                initial_status: StatusChanged::SuccessfullyCompiled { compiled_timestamp, compilation_mode },
            })
        }
        TargetConnectState::QueuedForTypecheckOnly => Ok(ValidatedConnect {
            target_name: params.target_name,
            escalate_to_make: true,
            initial_status: StatusChanged::WaitingForCompilation,
        }),
        TargetConnectState::Ready { .. } | TargetConnectState::Other => {
            Ok(ValidatedConnect { target_name: params.target_name, escalate_to_make: false, initial_status: StatusChanged::Connecting })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLookup(Vec<(&'static str, TargetConnectState)>);

    impl TargetLookup for FakeLookup {
        fn candidate_names(&self) -> Vec<String> {
            self.0.iter().map(|(name, _)| name.to_string()).collect()
        }
        fn resolve(&self, target_name: &str) -> TargetConnectState {
            self.0.iter().find(|(name, _)| *name == target_name).map(|(_, state)| state.clone()).unwrap_or(TargetConnectState::NotFound)
        }
    }

    fn query(target: &str, timestamp: u64) -> String {
        format!("elmWatchVersion=1.0.0&targetName={target}&elmCompiledTimestamp={timestamp}")
    }

    #[test]
    fn unknown_target_lists_candidates() {
        let lookup = FakeLookup(vec![("Main", TargetConnectState::Other)]);
        let err = validate_connect(&query("Nope", 0), "1.0.0", &lookup).unwrap_err();
        match err {
            StatusChanged::UnexpectedError(UnexpectedErrorKind::TargetNotFound { candidates, .. }) => {
                assert_eq!(candidates, vec!["Main".to_string()]);
            }
            other => panic!("expected TargetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let lookup = FakeLookup(vec![("Main", TargetConnectState::Other)]);
        let err = validate_connect(&query("Main", 0), "2.0.0", &lookup).unwrap_err();
        assert!(matches!(err, StatusChanged::UnexpectedError(UnexpectedErrorKind::WrongVersion { .. })));
    }

    #[test]
    fn matching_timestamp_on_ready_target_is_already_compiled() {
        let lookup = FakeLookup(vec![("Main", TargetConnectState::Ready { compiled_timestamp: 42, compilation_mode: CompilationMode::Standard })]);
        let result = validate_connect(&query("Main", 42), "1.0.0", &lookup).expect("validates");
        assert!(!result.escalate_to_make);
        assert!(matches!(result.initial_status, StatusChanged::SuccessfullyCompiled { compiled_timestamp: 42, .. }));
    }

    #[test]
    fn typecheck_only_target_escalates_to_make() {
        let lookup = FakeLookup(vec![("Main", TargetConnectState::QueuedForTypecheckOnly)]);
        let result = validate_connect(&query("Main", 0), "1.0.0", &lookup).expect("validates");
        assert!(result.escalate_to_make);
        assert_eq!(result.initial_status, StatusChanged::WaitingForCompilation);
    }

    #[test]
    fn disabled_target_lists_candidates() {
        let lookup = FakeLookup(vec![("Main", TargetConnectState::Disabled)]);
        let err = validate_connect(&query("Main", 0), "1.0.0", &lookup).unwrap_err();
        assert!(matches!(err, StatusChanged::UnexpectedError(UnexpectedErrorKind::TargetDisabled { .. })));
    }
}
