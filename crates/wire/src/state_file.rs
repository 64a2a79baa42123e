// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `elm-stuff/elm-watch-stuff.json` shape (§3 PersistedState, §6).

use elm_watch_core::CompilationMode;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTargetState {
    pub compilation_mode: CompilationMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedStateFile {
    pub port: u16,
    pub targets: IndexMap<String, PersistedTargetState>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistedStateDecodeError {
    #[error("elm-watch-stuff.json was not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl PersistedStateFile {
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistedStateDecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn encode_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let mut targets = IndexMap::new();
        targets.insert("main".to_string(), PersistedTargetState { compilation_mode: CompilationMode::Debug });
        let state = PersistedStateFile { port: 9999, targets };
        let encoded = state.encode_pretty();
        let decoded = PersistedStateFile::decode(encoded.as_bytes()).expect("decodes");
        assert_eq!(state, decoded);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(PersistedStateFile::decode(b"not json").is_err());
    }
}
