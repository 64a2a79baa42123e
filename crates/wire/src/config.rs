// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `elm-watch.json` decoding (§6). Decode errors report a JSONPath-like
//! location (`root["targets"]["name"]["inputs"][0]`) and the offending value.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub inputs: Vec<String>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postprocess: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub targets: IndexMap<String, TargetConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigDecodeError {
    #[error("{path}: not valid JSON ({message})")]
    SyntaxError { path: String, message: String },
    #[error("{path}: {problem}, got {value}")]
    AtPath { path: String, problem: String, value: String },
}

impl ConfigFile {
    /// Decode raw bytes, validating structural invariants (§3, §6):
    /// target names are validated elsewhere (core::TargetName); here we
    /// only check the JSON shape and the field-level rules §6 names
    /// (outputs end in `.js`, inputs end in `.elm`).
    pub fn decode(bytes: &[u8]) -> Result<Self, ConfigDecodeError> {
        let file: ConfigFile = serde_json::from_slice(bytes).map_err(|e| ConfigDecodeError::SyntaxError {
            path: "root".to_string(),
            message: e.to_string(),
        })?;

        for (name, target) in &file.targets {
            if !target.output.ends_with(".js") {
                return Err(ConfigDecodeError::AtPath {
                    path: format!("root[\"targets\"][\"{name}\"][\"output\"]"),
                    problem: "must end with `.js`".to_string(),
                    value: target.output.clone(),
                });
            }
            if target.inputs.is_empty() {
                return Err(ConfigDecodeError::AtPath {
                    path: format!("root[\"targets\"][\"{name}\"][\"inputs\"]"),
                    problem: "must be a non-empty array".to_string(),
                    value: "[]".to_string(),
                });
            }
            for (index, input) in target.inputs.iter().enumerate() {
                if !input.ends_with(".elm") {
                    return Err(ConfigDecodeError::AtPath {
                        path: format!("root[\"targets\"][\"{name}\"][\"inputs\"][{index}]"),
                        problem: "must end with `.elm`".to_string(),
                        value: input.clone(),
                    });
                }
            }
            if let Some(postprocess) = &target.postprocess {
                if postprocess.is_empty() {
                    return Err(ConfigDecodeError::AtPath {
                        path: format!("root[\"targets\"][\"{name}\"][\"postprocess\"]"),
                        problem: "must be a non-empty array when present".to_string(),
                        value: "[]".to_string(),
                    });
                }
            }
        }
        Ok(file)
    }

    /// A new config document with one `main` target, used to populate the
    /// `elm-watch.json NOT FOUND` template (§8 scenario 5).
    pub fn template() -> Self {
        let mut targets = IndexMap::new();
        targets.insert(
            "main".to_string(),
            TargetConfig { inputs: vec!["src/Main.elm".to_string()], output: "main.js".to_string(), postprocess: None },
        );
        Self { targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_config() {
        let json = br#"{"targets":{"main":{"inputs":["src/Main.elm"],"output":"main.js"}}}"#;
        let config = ConfigFile::decode(json).expect("decodes");
        assert_eq!(config.targets.len(), 1);
    }

    #[test]
    fn rejects_output_without_js_extension() {
        let json = br#"{"targets":{"main":{"inputs":["src/Main.elm"],"output":"main.txt"}}}"#;
        let err = ConfigFile::decode(json).unwrap_err();
        match err {
            ConfigDecodeError::AtPath { path, .. } => {
                assert_eq!(path, "root[\"targets\"][\"main\"][\"output\"]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_elm_input() {
        let json = br#"{"targets":{"main":{"inputs":["src/Main.txt"],"output":"main.js"}}}"#;
        let err = ConfigFile::decode(json).unwrap_err();
        match err {
            ConfigDecodeError::AtPath { path, .. } => {
                assert_eq!(path, "root[\"targets\"][\"main\"][\"inputs\"][0]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_postprocess() {
        let json = br#"{"targets":{"main":{"inputs":["src/Main.elm"],"output":"main.js","postprocess":[]}}}"#;
        assert!(ConfigFile::decode(json).is_err());
    }

    #[test]
    fn template_round_trips() {
        let template = ConfigFile::template();
        let json = serde_json::to_vec(&template).expect("serializes");
        let back = ConfigFile::decode(&json).expect("decodes");
        assert_eq!(template, back);
    }
}
