// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps a classified file change onto supervisor-level events (§4.6): which
//! targets are affected, or whether the change should be announced as
//! unimported, or trigger a project-wide restart.

use elm_watch_core::{AbsolutePath, FileClassification, TargetName};
use std::collections::HashMap;

/// What the supervisor should do in response to one classified file change
/// (§4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Restart the whole supervisor (config file changed).
    ConfigChanged,
    /// Reinstall dependencies, then rebuild every affected target.
    ManifestChanged,
    /// Rebuild these targets; `unimported` is true when no target's closure
    /// contains the changed file (§4.6: "FYI: not imported by any target").
    ElmSourceChanged { affected_targets: Vec<TargetName>, unimported: bool },
    /// Kill and recreate the scripted-postprocess workers bound to this
    /// script.
    PostprocessScriptChanged,
    Unrelated,
}

/// Per-target watched-file sets, keyed by target name, used to resolve an
/// `ElmSourceChanged` event to the targets it affects (§3 WatchedFile: "the
/// set is derived from the union of the resolver's last known import
/// closure and the config/manifest/script paths").
pub type TargetClosures = HashMap<TargetName, Vec<AbsolutePath>>;

/// Decide the supervisor event for one classified changed path (§4.6).
pub fn classify_event(path: &AbsolutePath, classification: FileClassification, closures: &TargetClosures) -> SupervisorEvent {
    match classification {
        FileClassification::ConfigFile => SupervisorEvent::ConfigChanged,
        FileClassification::ElmManifest => SupervisorEvent::ManifestChanged,
        FileClassification::PostprocessScript => SupervisorEvent::PostprocessScriptChanged,
        FileClassification::ElmSource | FileClassification::DerivedInput => {
            let affected: Vec<TargetName> =
                closures.iter().filter(|(_, closure)| closure.iter().any(|p| p == path)).map(|(name, _)| name.clone()).collect();
            if affected.is_empty() {
                SupervisorEvent::ElmSourceChanged { affected_targets: vec![], unimported: true }
            } else {
                SupervisorEvent::ElmSourceChanged { affected_targets: affected, unimported: false }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_watch_core::test_support::test_target;

    fn path(p: &str) -> AbsolutePath {
        AbsolutePath::new(p).expect("absolute")
    }

    #[test]
    fn config_file_restarts_supervisor() {
        let closures = TargetClosures::new();
        let event = classify_event(&path("/proj/elm-watch.json"), FileClassification::ConfigFile, &closures);
        assert_eq!(event, SupervisorEvent::ConfigChanged);
    }

    #[test]
    fn elm_source_not_in_any_closure_is_announced_unimported() {
        let closures = TargetClosures::new();
        let event = classify_event(&path("/proj/src/Orphan.elm"), FileClassification::ElmSource, &closures);
        assert_eq!(event, SupervisorEvent::ElmSourceChanged { affected_targets: vec![], unimported: true });
    }

    #[test]
    fn elm_source_in_closure_names_the_target() {
        let main_name = test_target("main", "main.js").name.clone();
        let mut closures = TargetClosures::new();
        closures.insert(main_name.clone(), vec![path("/proj/src/Main.elm")]);
        let event = classify_event(&path("/proj/src/Main.elm"), FileClassification::ElmSource, &closures);
        match event {
            SupervisorEvent::ElmSourceChanged { affected_targets, unimported } => {
                assert!(!unimported);
                assert_eq!(affected_targets, vec![main_name]);
            }
            other => panic!("expected ElmSourceChanged, got {other:?}"),
        }
    }
}
