// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `elm-watch.json` loading (§6, §8 scenario 5). Bridges the wire-level
//! `ConfigFile` decode into a validated `elm_watch_core::Project`.

use elm_watch_core::{AbsolutePath, InputModule, PostprocessCommand, Project, ProjectError, Target, TargetError, TargetName, TargetNameError};
use elm_watch_wire::{ConfigDecodeError, ConfigFile};
use indexmap::IndexMap;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "elm-watch.json";

#[derive(Debug, thiserror::Error)]
pub enum LoadConfigError {
    #[error("{CONFIG_FILE_NAME} NOT FOUND\n\nA template you can use as a starting point:\n\n{template}")]
    NotFound { template: String },
    #[error("failed to read {path}: {source}")]
    Read { path: std::path::PathBuf, #[source] source: std::io::Error },
    #[error("{CONFIG_FILE_NAME} is invalid: {0}")]
    Decode(#[from] ConfigDecodeError),
    #[error("invalid target name {name:?}: {source}")]
    InvalidTargetName { name: String, #[source] source: TargetNameError },
    #[error("invalid target {name:?}: {source}")]
    InvalidTarget { name: String, #[source] source: TargetError },
    #[error("{0}")]
    EmptyProject(#[from] ProjectError),
}

/// Load and validate the config document rooted at `project_root` (§3, §6).
/// A missing file is reported with the exact template text §8 scenario 5
/// expects, rather than a generic I/O error.
pub fn load(project_root: &AbsolutePath) -> Result<Project, LoadConfigError> {
    let path = project_root.join_normalized(CONFIG_FILE_NAME);
    let bytes = match std::fs::read(path.as_path()) {
        Ok(bytes) => bytes,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            let template = ConfigFile::template();
            let template = serde_json::to_string_pretty(&template).unwrap_or_default();
            return Err(LoadConfigError::NotFound { template });
        }
        Err(source) => return Err(LoadConfigError::Read { path: path.into_path_buf(), source }),
    };

    let file = ConfigFile::decode(&bytes)?;
    let mut targets = IndexMap::new();
    for (name, target_config) in file.targets {
        let target_name =
            TargetName::new(name.clone()).map_err(|source| LoadConfigError::InvalidTargetName { name: name.clone(), source })?;
        let inputs = target_config.inputs.into_iter().map(InputModule::new).collect();
        let output = project_root.join_normalized(&target_config.output);
        let postprocess = target_config.postprocess.and_then(PostprocessCommand::new);
        let target = Target::new(target_name.clone(), inputs, output, postprocess)
            .map_err(|source| LoadConfigError::InvalidTarget { name, source })?;
        targets.insert(target_name, target);
    }

    Ok(Project::new(project_root.clone(), targets)?)
}

/// Find the project root by walking upward from `start` looking for
/// `elm-watch.json`, falling back to `start` itself so a missing-file error
/// still reports the template at the expected location.
pub fn find_project_root(start: &Path) -> std::io::Result<AbsolutePath> {
    let start = if start.is_absolute() { start.to_path_buf() } else { std::env::current_dir()?.join(start) };
    let mut candidate = start.as_path();
    loop {
        if candidate.join(CONFIG_FILE_NAME).is_file() {
            return AbsolutePath::new(candidate).map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput));
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return AbsolutePath::new(start.as_path()).map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_reports_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        let err = load(&root).unwrap_err();
        match err {
            LoadConfigError::NotFound { template } => {
                assert!(template.contains("\"main\""));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn loads_valid_config_into_project() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        std::fs::write(
            root.join_normalized(CONFIG_FILE_NAME).as_path(),
            br#"{"targets":{"main":{"inputs":["src/Main.elm"],"output":"main.js"}}}"#,
        )
        .expect("write");

        let project = load(&root).expect("loads");
        assert_eq!(project.len(), 1);
        let name = TargetName::new("main").expect("valid");
        assert!(project.target(&name).is_some());
    }

    #[test]
    fn rejects_invalid_target_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = AbsolutePath::new(dir.path()).expect("absolute");
        std::fs::write(
            root.join_normalized(CONFIG_FILE_NAME).as_path(),
            br#"{"targets":{"-bad":{"inputs":["src/Main.elm"],"output":"main.js"}}}"#,
        )
        .expect("write");

        assert!(matches!(load(&root), Err(LoadConfigError::InvalidTargetName { .. })));
    }

    #[test]
    fn find_project_root_walks_upward_to_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), b"{}").expect("write");
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).expect("mkdir");
        let found = find_project_root(&nested).expect("finds root");
        assert_eq!(found.as_path(), dir.path());
    }
}
