// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket envelope types exchanged between the broker and the injected
//! client runtime (§4.7, §4.8). Wire format: JSON objects tagged by `tag`.

use elm_watch_core::CompilationMode;
use serde::{Deserialize, Serialize};

/// Why an `UnexpectedError` was sent — each corresponds to one upgrade
/// validation failure in §4.7.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnexpectedErrorKind {
    /// The connection's URL path was not exactly the broker's root path.
    BadUrl { message: String },
    /// `elmWatchVersion` query param didn't match the supervisor's version.
    WrongVersion { server_version: String, client_version: String },
    /// `targetName` didn't name a configured target. Lists candidates so
    /// the overlay can suggest close matches.
    TargetNotFound { target_name: String, candidates: Vec<String> },
    /// `targetName` named a target the CLI invocation disabled (not in the
    /// `targets...` filter for this run).
    TargetDisabled { target_name: String, candidates: Vec<String> },
    /// Query parameters failed to decode (missing/malformed).
    ParamsDecodeError { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum StatusChanged {
    Connecting,
    WaitingForCompilation,
    SuccessfullyCompiled { compiled_timestamp: u64, compilation_mode: CompilationMode },
    CompilationError { message: String },
    InjectError { message: String },
    EvalError { message: String },
    ReloadRequired { reasons: Vec<String> },
    UnexpectedError(UnexpectedErrorKind),
    /// Sent once to every connection right before the supervisor exits
    /// (§5 "Shutdown ... closes all client connections with a terminal
    /// status").
    ServerShutdown,
}

/// Messages the broker sends to a connected client (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum ServerMessage {
    StatusChanged { status: StatusChanged },
    HotReload { code: String, compiled_timestamp: u64 },
    FullReload { reasons: Vec<String> },
}

/// Messages a client sends to the broker (§4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum ClientMessage {
    ChangedCompilationMode { compilation_mode: CompilationMode },
    FocusedTab,
    ExitRequested,
}

/// Parsed `?elmWatchVersion=&targetName=&elmCompiledTimestamp=` query string (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub elm_watch_version: String,
    pub target_name: String,
    pub elm_compiled_timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectParamsError {
    #[error("missing required query parameter `{0}`")]
    Missing(&'static str),
    #[error("query parameter `elmCompiledTimestamp` was not a valid integer: {0}")]
    BadTimestamp(String),
}

impl ConnectParams {
    /// Decode from the raw query string of a WebSocket upgrade request.
    pub fn decode(query: &str) -> Result<Self, ConnectParamsError> {
        let mut elm_watch_version = None;
        let mut target_name = None;
        let mut elm_compiled_timestamp = None;
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else { continue };
            let value = percent_decode(value);
            match key {
                "elmWatchVersion" => elm_watch_version = Some(value),
                "targetName" => target_name = Some(value),
                "elmCompiledTimestamp" => elm_compiled_timestamp = Some(value),
                _ => {}
            }
        }
        let elm_watch_version = elm_watch_version.ok_or(ConnectParamsError::Missing("elmWatchVersion"))?;
        let target_name = target_name.ok_or(ConnectParamsError::Missing("targetName"))?;
        let raw_timestamp = elm_compiled_timestamp.ok_or(ConnectParamsError::Missing("elmCompiledTimestamp"))?;
        let elm_compiled_timestamp =
            raw_timestamp.parse::<u64>().map_err(|_| ConnectParamsError::BadTimestamp(raw_timestamp))?;
        Ok(Self { elm_watch_version, target_name, elm_compiled_timestamp })
    }
}

/// Minimal percent-decoding sufficient for target names and version strings
/// (no `+`-as-space handling needed: this is a WS query string, not a form body).
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_query_string() {
        let params =
            ConnectParams::decode("elmWatchVersion=1.2.3&targetName=Main&elmCompiledTimestamp=42").expect("decodes");
        assert_eq!(params.elm_watch_version, "1.2.3");
        assert_eq!(params.target_name, "Main");
        assert_eq!(params.elm_compiled_timestamp, 42);
    }

    #[test]
    fn missing_param_is_an_error() {
        assert_eq!(
            ConnectParams::decode("elmWatchVersion=1.2.3&targetName=Main"),
            Err(ConnectParamsError::Missing("elmCompiledTimestamp"))
        );
    }

    #[test]
    fn bad_timestamp_is_an_error() {
        let err = ConnectParams::decode("elmWatchVersion=1&targetName=Main&elmCompiledTimestamp=nope").unwrap_err();
        assert_eq!(err, ConnectParamsError::BadTimestamp("nope".into()));
    }

    #[test]
    fn percent_decodes_target_name() {
        let params =
            ConnectParams::decode("elmWatchVersion=1&targetName=My%20Target&elmCompiledTimestamp=0").expect("decodes");
        assert_eq!(params.target_name, "My Target");
    }

    #[test]
    fn server_message_round_trips_through_json() {
        let msg = ServerMessage::HotReload { code: "console.log(1)".into(), compiled_timestamp: 7 };
        let json = serde_json::to_string(&msg).expect("serializes");
        let back: ServerMessage = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(msg, back);
    }

    #[test]
    fn unknown_client_message_tag_fails_to_decode() {
        let result: Result<ClientMessage, _> = serde_json::from_str(r#"{"tag":"nonsense"}"#);
        assert!(result.is_err());
    }
}
