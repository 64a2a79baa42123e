// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client-side hot-reload decision algorithm (§4.8). The browser runtime
//! itself is out of scope (§1), but the decision rules are the single
//! source of truth the injector's generated JS calls into conceptually —
//! modeled here as pure, directly-testable Rust so the rules themselves
//! (not their JS host) are verified.

use elm_watch_core::CompilationMode;

/// The shape-relevant facts the client compares between an old and new
/// compiled module to decide whether a hot patch is safe (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleShape {
    pub program_type: ProgramType,
    pub debug_metadata: Option<String>,
    pub record_field_mangling: Option<String>,
    pub flags_decoder_signature: String,
    pub init_model_shape: String,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramType {
    Sandbox,
    Element,
    Document,
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadDecision {
    HotPatch,
    HotPatchWithWarnings(Vec<String>),
    FullReload(Vec<String>),
}

/// Compare `old` against `new` under `compilation_mode` and decide whether a
/// hot patch is safe (§4.8, §8 "Hot-reload decision correctness").
pub fn decide(old: &ModuleShape, new: &ModuleShape, compilation_mode: CompilationMode) -> ReloadDecision {
    let mut reasons = Vec::new();

    if old.program_type != new.program_type {
        reasons.push("program type changed".to_string());
    }
    if compilation_mode == CompilationMode::Debug && old.debug_metadata != new.debug_metadata {
        reasons.push("debug metadata changed".to_string());
    }
    if compilation_mode == CompilationMode::Optimize && old.record_field_mangling != new.record_field_mangling {
        reasons.push("record field mangling changed under optimize mode".to_string());
    }
    if old.flags_decoder_signature != new.flags_decoder_signature {
        reasons.push("flags decoder signature changed".to_string());
    }
    if old.init_model_shape != new.init_model_shape {
        reasons.push("init would return a differently-shaped model".to_string());
    }

    if !reasons.is_empty() {
        return ReloadDecision::FullReload(reasons);
    }

    let new_ports: Vec<&String> = new.ports.iter().filter(|p| !old.ports.contains(p)).collect();
    if !new_ports.is_empty() {
        let warnings = new_ports.into_iter().map(|p| format!("new port added: {p}")).collect();
        return ReloadDecision::HotPatchWithWarnings(warnings);
    }

    ReloadDecision::HotPatch
}

/// Consolidate a batch of hot-reload messages that arrived close together
/// into a single decision with all reasons listed (§4.8: "a batch of
/// hot-reload messages that arrive close in time consolidates into a single
/// reload decision with all reasons listed").
pub fn consolidate(decisions: Vec<ReloadDecision>) -> ReloadDecision {
    let mut reload_reasons = Vec::new();
    let mut patch_warnings = Vec::new();

    for decision in decisions {
        match decision {
            ReloadDecision::FullReload(reasons) => reload_reasons.extend(reasons),
            ReloadDecision::HotPatchWithWarnings(warnings) => patch_warnings.extend(warnings),
            ReloadDecision::HotPatch => {}
        }
    }

    if !reload_reasons.is_empty() {
        ReloadDecision::FullReload(reload_reasons)
    } else if !patch_warnings.is_empty() {
        ReloadDecision::HotPatchWithWarnings(patch_warnings)
    } else {
        ReloadDecision::HotPatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_shape() -> ModuleShape {
        ModuleShape {
            program_type: ProgramType::Element,
            debug_metadata: None,
            record_field_mangling: None,
            flags_decoder_signature: "unit".to_string(),
            init_model_shape: "{count:Int}".to_string(),
            ports: vec![],
        }
    }

    #[test]
    fn identical_shapes_hot_patch() {
        let shape = base_shape();
        assert_eq!(decide(&shape, &shape, CompilationMode::Standard), ReloadDecision::HotPatch);
    }

    #[test]
    fn program_type_change_forces_full_reload() {
        let old = base_shape();
        let new = ModuleShape { program_type: ProgramType::Sandbox, ..base_shape() };
        match decide(&old, &new, CompilationMode::Standard) {
            ReloadDecision::FullReload(reasons) => assert!(reasons.iter().any(|r| r.contains("program type"))),
            other => panic!("expected FullReload, got {other:?}"),
        }
    }

    #[test]
    fn debug_metadata_change_only_matters_under_debug_mode() {
        let old = base_shape();
        let new = ModuleShape { debug_metadata: Some("v2".to_string()), ..base_shape() };
        assert_eq!(decide(&old, &new, CompilationMode::Standard), ReloadDecision::HotPatch);
        assert!(matches!(decide(&old, &new, CompilationMode::Debug), ReloadDecision::FullReload(_)));
    }

    #[test]
    fn record_mangling_change_only_matters_under_optimize_mode() {
        let old = base_shape();
        let new = ModuleShape { record_field_mangling: Some("b".to_string()), ..base_shape() };
        assert_eq!(decide(&old, &new, CompilationMode::Standard), ReloadDecision::HotPatch);
        assert!(matches!(decide(&old, &new, CompilationMode::Optimize), ReloadDecision::FullReload(_)));
    }

    #[test]
    fn flags_decoder_change_forces_full_reload() {
        let old = base_shape();
        let new = ModuleShape { flags_decoder_signature: "int".to_string(), ..base_shape() };
        assert!(matches!(decide(&old, &new, CompilationMode::Standard), ReloadDecision::FullReload(_)));
    }

    #[test]
    fn new_port_warns_but_still_patches() {
        let old = base_shape();
        let new = ModuleShape { ports: vec!["log".to_string()], ..base_shape() };
        match decide(&old, &new, CompilationMode::Standard) {
            ReloadDecision::HotPatchWithWarnings(warnings) => assert_eq!(warnings.len(), 1),
            other => panic!("expected HotPatchWithWarnings, got {other:?}"),
        }
    }

    #[test]
    fn consolidate_prefers_full_reload_over_patch_warnings() {
        let decisions = vec![ReloadDecision::HotPatchWithWarnings(vec!["new port".to_string()]), ReloadDecision::FullReload(vec!["program type changed".to_string()])];
        match consolidate(decisions) {
            ReloadDecision::FullReload(reasons) => assert_eq!(reasons, vec!["program type changed".to_string()]),
            other => panic!("expected FullReload, got {other:?}"),
        }
    }

    #[test]
    fn consolidate_merges_multiple_reload_reasons() {
        let decisions = vec![
            ReloadDecision::FullReload(vec!["a".to_string()]),
            ReloadDecision::FullReload(vec!["b".to_string()]),
        ];
        match consolidate(decisions) {
            ReloadDecision::FullReload(reasons) => assert_eq!(reasons, vec!["a".to_string(), "b".to_string()]),
            other => panic!("expected FullReload, got {other:?}"),
        }
    }
}
