// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The live set of paths the watcher classifies against (§4.6). Rebuilt
//! incrementally as each target's resolver closure changes, since
//! `adapters::classify` is a pure function over an explicit path set rather
//! than something that owns the project itself.

use elm_watch_core::TargetName;
use indexmap::IndexMap;
use std::path::PathBuf;

#[derive(Debug, Default)]
pub struct ClassifyState {
    pub config_path: PathBuf,
    manifests: IndexMap<TargetName, PathBuf>,
    elm_sources: IndexMap<TargetName, Vec<PathBuf>>,
    postprocess_scripts: Vec<PathBuf>,
}

impl ClassifyState {
    pub fn new(config_path: PathBuf, postprocess_scripts: Vec<PathBuf>) -> Self {
        Self { config_path, manifests: IndexMap::new(), elm_sources: IndexMap::new(), postprocess_scripts }
    }

    pub fn set_closure(&mut self, target: TargetName, manifest_path: PathBuf, sources: Vec<PathBuf>) {
        self.manifests.insert(target.clone(), manifest_path);
        self.elm_sources.insert(target, sources);
    }

    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        self.manifests.values().cloned().collect()
    }

    pub fn elm_source_paths(&self) -> Vec<PathBuf> {
        self.elm_sources.values().flatten().cloned().collect()
    }

    pub fn postprocess_script_paths(&self) -> Vec<PathBuf> {
        self.postprocess_scripts.clone()
    }
}
