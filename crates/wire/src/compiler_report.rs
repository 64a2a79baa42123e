// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The compiler's structured JSON error report (§4.1). Decoded from stderr
//! when the exit code is 1 and the stream begins with `{`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// One piece of a problem's message: either a plain string or a styled span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePiece {
    Plain(String),
    Styled { bold: bool, underline: bool, color: Option<String>, string: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub title: String,
    pub region: Region,
    pub message: Vec<MessagePiece>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleError {
    pub path: String,
    pub name: String,
    pub problems: Vec<Problem>,
}

/// The two report shapes the compiler's `--report=json` emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CompilerReport {
    /// A single project-level problem (e.g. a bad elm.json) that isn't tied
    /// to one module.
    Error { path: Option<String>, title: String, message: Vec<MessagePiece> },
    /// One or more modules failed to compile.
    CompileErrors { errors: Vec<ModuleError> },
}

#[derive(Debug, thiserror::Error)]
pub enum CompilerReportError {
    #[error("compiler stderr was not well-formed JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl CompilerReport {
    /// Parse the compiler's stderr bytes. Callers should have already
    /// checked the stream begins with `{` before calling this (§4.1).
    pub fn parse(bytes: &[u8]) -> Result<Self, CompilerReportError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compile_errors_shape() {
        let json = r#"{
            "type": "compile-errors",
            "errors": [{
                "path": "src/Main.elm",
                "name": "Main",
                "problems": [{
                    "title": "TYPE MISMATCH",
                    "region": {"start": {"line": 1, "column": 1}, "end": {"line": 1, "column": 5}},
                    "message": ["Expected ", {"bold": true, "underline": false, "color": null, "string": "Int"}]
                }]
            }]
        }"#;
        let report = CompilerReport::parse(json.as_bytes()).expect("parses");
        match report {
            CompilerReport::CompileErrors { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].problems[0].title, "TYPE MISMATCH");
            }
            CompilerReport::Error { .. } => panic!("expected compile-errors"),
        }
    }

    #[test]
    fn parses_project_level_error_shape() {
        let json = r#"{"type":"error","path":"elm.json","title":"BAD JSON","message":["oops"]}"#;
        let report = CompilerReport::parse(json.as_bytes()).expect("parses");
        assert!(matches!(report, CompilerReport::Error { .. }));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(CompilerReport::parse(b"{not json").is_err());
    }
}
