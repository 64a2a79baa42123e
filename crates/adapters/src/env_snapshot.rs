// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A point-in-time snapshot of the process environment (§2: the supervisor
//! reads `ELM_WATCH_MAX_PARALLEL` and friends once per watcher-event batch
//! rather than trusting a single value cached at startup).

use std::collections::HashMap;

/// Environment variables the supervisor consults, captured together so a
/// single snapshot describes one consistent view (§2 "Env re-poll").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    /// Capture the real process environment.
    pub fn capture() -> Self {
        Self { vars: std::env::vars().collect() }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// `ELM_WATCH_MAX_PARALLEL`, parsed and floored at 1 (§2, §9: "a
    /// non-numeric or non-positive value is treated as unset").
    pub fn max_parallel(&self, default: usize) -> usize {
        self.get("ELM_WATCH_MAX_PARALLEL")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    }

    /// `ELM_WATCH_MAX_PARALLEL_POSTPROCESS`, same parsing rule, for the
    /// scripted postprocess worker pool (§4.3).
    pub fn max_parallel_postprocess(&self, default: usize) -> usize {
        self.get("ELM_WATCH_MAX_PARALLEL_POSTPROCESS")
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
        EnvSnapshot::from_map(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn parses_valid_max_parallel() {
        let env = snapshot(&[("ELM_WATCH_MAX_PARALLEL", "4")]);
        assert_eq!(env.max_parallel(2), 4);
    }

    #[test]
    fn falls_back_to_default_on_non_numeric() {
        let env = snapshot(&[("ELM_WATCH_MAX_PARALLEL", "banana")]);
        assert_eq!(env.max_parallel(2), 2);
    }

    #[test]
    fn falls_back_to_default_on_zero() {
        let env = snapshot(&[("ELM_WATCH_MAX_PARALLEL", "0")]);
        assert_eq!(env.max_parallel(2), 2);
    }

    #[test]
    fn unset_uses_default() {
        let env = snapshot(&[]);
        assert_eq!(env.max_parallel(3), 3);
    }
}
