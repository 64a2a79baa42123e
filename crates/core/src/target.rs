// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target definition and name validation (§3, §8 "Target-name validation").

use crate::path::AbsolutePath;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // A single non-whitespace, non-'-' char, OR a first char that's
    // non-whitespace and not '-', a run of non-newline chars, and a
    // non-whitespace last char.
    PATTERN.get_or_init(|| Regex::new(r"^(?:[^\s-]|[^\s-][^\n]*\S)$").expect("valid regex"))
}

pub const TARGET_NAME_ERROR_MESSAGE: &str = "Target names must start with a non-whitespace character except `-`, cannot contain newlines and must end with a non-whitespace character";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{TARGET_NAME_ERROR_MESSAGE}")]
pub struct TargetNameError;

/// A validated target name (§3 invariant; exact rejection message tested in §8).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetName(String);

impl TargetName {
    pub fn new(raw: impl Into<String>) -> Result<Self, TargetNameError> {
        let raw = raw.into();
        if !name_pattern().is_match(&raw) {
            return Err(TargetNameError);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring match used by the CLI's `targets...` argument filter (§6).
    pub fn matches_substring(&self, needle: &str) -> bool {
        self.0.contains(needle)
    }
}

impl TryFrom<String> for TargetName {
    type Error = TargetNameError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TargetName> for String {
    fn from(value: TargetName) -> Self {
        value.0
    }
}

impl std::fmt::Display for TargetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One input module specifier, resolved to a file during §4.5 resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputModule {
    /// As written in the config, e.g. `"src/Main.elm"`.
    pub specifier: String,
    /// Filled in once the resolver has verified the file exists and its
    /// module header matches its path. `None` before first resolution.
    #[serde(skip)]
    pub resolved: Option<AbsolutePath>,
}

impl InputModule {
    pub fn new(specifier: impl Into<String>) -> Self {
        Self { specifier: specifier.into(), resolved: None }
    }
}

/// A configured post-process command (§3, §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostprocessCommand {
    pub argv: Vec<String>,
}

impl PostprocessCommand {
    pub const SCRIPTED_TOKEN: &'static str = "elm-watch-node";

    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(Self { argv })
        }
    }

    /// Whether the first argv token selects the `elm-watch-node` scripted variant.
    pub fn is_scripted(&self) -> bool {
        self.argv.first().map(|t| t == Self::SCRIPTED_TOKEN).unwrap_or(false)
    }

    /// For the scripted variant, the script path is the second token; the
    /// rest are user args forwarded after `[code, targetName, mode, runMode]`.
    pub fn scripted_script_and_args(&self) -> Option<(&str, &[String])> {
        if !self.is_scripted() {
            return None;
        }
        let rest = &self.argv[1..];
        rest.first().map(|script| (script.as_str(), &rest[1..]))
    }

    /// For the shell variant, the command and its argv (script path elided).
    pub fn shell_command_and_args(&self) -> (&str, &[String]) {
        (&self.argv[0], &self.argv[1..])
    }
}

/// One compile unit: a name, its ordered input modules, an output path, and
/// an optional post-process command (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: TargetName,
    pub inputs: Vec<InputModule>,
    pub output: AbsolutePath,
    pub postprocess: Option<PostprocessCommand>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target `{0}` has no inputs")]
    EmptyInputs(String),
    #[error("target `{0}` output `{1}` does not end in `.js`")]
    OutputNotJs(String, String),
}

impl Target {
    pub fn new(
        name: TargetName,
        inputs: Vec<InputModule>,
        output: AbsolutePath,
        postprocess: Option<PostprocessCommand>,
    ) -> Result<Self, TargetError> {
        if inputs.is_empty() {
            return Err(TargetError::EmptyInputs(name.to_string()));
        }
        if !output.ends_with_extension("js") {
            return Err(TargetError::OutputNotJs(name.to_string(), output.to_string()));
        }
        Ok(Self { name, inputs, output, postprocess })
    }
}
