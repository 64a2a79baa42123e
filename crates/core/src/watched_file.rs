// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watched-file classification (§3, §4.6).

use crate::path::AbsolutePath;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileClassification {
    ElmSource,
    ElmManifest,
    ConfigFile,
    PostprocessScript,
    DerivedInput,
}

crate::simple_display! {
    FileClassification {
        ElmSource => "elm-source",
        ElmManifest => "elm-manifest",
        ConfigFile => "config-file",
        PostprocessScript => "postprocess-script",
        DerivedInput => "derived-input",
    }
}

/// One path the supervisor cares about, plus why (§3). The set of these is
/// recomputed after each successful or partial compile from the resolver's
/// import closure union'd with the config/manifest/script paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedFile {
    pub path: AbsolutePath,
    pub classification: FileClassification,
}

impl WatchedFile {
    pub fn new(path: AbsolutePath, classification: FileClassification) -> Self {
        Self { path, classification }
    }
}
