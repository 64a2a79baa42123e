// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project: one absolute root, one config document, a non-empty target map (§3).

use crate::path::AbsolutePath;
use crate::target::{Target, TargetName};
use indexmap::IndexMap;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProjectError {
    #[error("config declares no targets")]
    NoTargets,
}

/// Created at config load, destroyed at config reload; never mutated in
/// place — a reload always rebuilds a fresh `Project` (§3).
#[derive(Debug, Clone)]
pub struct Project {
    pub root: AbsolutePath,
    targets: IndexMap<TargetName, Target>,
}

impl Project {
    pub fn new(root: AbsolutePath, targets: IndexMap<TargetName, Target>) -> Result<Self, ProjectError> {
        if targets.is_empty() {
            return Err(ProjectError::NoTargets);
        }
        Ok(Self { root, targets })
    }

    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn target(&self, name: &TargetName) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn target_names(&self) -> impl Iterator<Item = &TargetName> {
        self.targets.keys()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Substring-match target names against CLI arguments (§6). Returns the
    /// matched names in declaration order plus any argument that matched nothing.
    pub fn match_targets<'a>(&self, needles: &[&'a str]) -> (Vec<&TargetName>, Vec<&'a str>) {
        if needles.is_empty() {
            return (self.targets.keys().collect(), Vec::new());
        }
        let mut matched = Vec::new();
        let mut unknown = Vec::new();
        for needle in needles {
            let before = matched.len();
            for name in self.targets.keys() {
                if name.matches_substring(needle) && !matched.contains(&name) {
                    matched.push(name);
                }
            }
            if matched.len() == before {
                unknown.push(*needle);
            }
        }
        (matched, unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::InputModule;

    fn make_target(name: &str) -> Target {
        Target::new(
            TargetName::new(name).expect("valid"),
            vec![InputModule::new("src/Main.elm")],
            AbsolutePath::new(format!("/out/{name}.js")).expect("absolute"),
            None,
        )
        .expect("valid target")
    }

    #[test]
    fn rejects_empty_target_map() {
        let root = AbsolutePath::new("/project").expect("absolute");
        assert_eq!(Project::new(root, IndexMap::new()), Err(ProjectError::NoTargets));
    }

    #[test]
    fn match_targets_substring() {
        let root = AbsolutePath::new("/project").expect("absolute");
        let mut targets = IndexMap::new();
        let html = make_target("Html");
        let main = make_target("Main");
        targets.insert(html.name.clone(), html);
        targets.insert(main.name.clone(), main);
        let project = Project::new(root, targets).expect("valid project");

        let (matched, unknown) = project.match_targets(&["tml"]);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].as_str(), "Html");
        assert!(unknown.is_empty());

        let (_, unknown) = project.match_targets(&["nope"]);
        assert_eq!(unknown, vec!["nope"]);
    }

    #[test]
    fn empty_needles_matches_everything() {
        let root = AbsolutePath::new("/project").expect("absolute");
        let mut targets = IndexMap::new();
        let main = make_target("Main");
        targets.insert(main.name.clone(), main);
        let project = Project::new(root, targets).expect("valid project");
        let (matched, unknown) = project.match_targets(&[]);
        assert_eq!(matched.len(), 1);
        assert!(unknown.is_empty());
    }
}
