// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use regex::Regex;
use std::sync::OnceLock;

/// One probe/replace pair (§4.2, §9: "document each probe/replace pair with
/// its purpose"). `probe` must match before `replace` is ever applied —
/// absence of a probe match means the compiler's output shape changed and
/// the rewrite cannot proceed safely.
pub struct Anchor {
    pub name: &'static str,
    pub purpose: &'static str,
    pub probe: Regex,
    pub replace: Regex,
    pub replacement: &'static str,
}

fn build_table() -> Vec<Anchor> {
    vec![
        Anchor {
            name: "program_constructor",
            purpose: "tag the exported init function with the program type so the client can detect sandbox/element/document/application changes across a reload",
            probe: Regex::new(r"_Platform_initialize\s*\(").expect("valid regex"),
            replace: Regex::new(r"(_Platform_initialize\s*\()").expect("valid regex"),
            replacement: "/*elm-watch-program-type*/$1",
        },
        Anchor {
            name: "view_registration",
            purpose: "capture a live reference to the view function so hot-patched bindings can be spliced into the running virtual-DOM renderer",
            probe: Regex::new(r"_VirtualDom_virtualize\s*\(").expect("valid regex"),
            replace: Regex::new(r"(_VirtualDom_virtualize\s*\()").expect("valid regex"),
            replacement: "/*elm-watch-view-hook*/$1",
        },
        Anchor {
            name: "debug_metadata_emitter",
            purpose: "expose the serialized debug-metadata blob so the client can detect a debug-mode model shape change and force a full reload",
            probe: Regex::new(r"_Debug_crash\s*\(").expect("valid regex"),
            replace: Regex::new(r"(_Debug_crash\s*\()").expect("valid regex"),
            replacement: "/*elm-watch-debug-metadata*/$1",
        },
    ]
}

/// The fixed table of anchors applied, in order, to every compiled module.
pub fn anchor_table() -> &'static [Anchor] {
    static TABLE: OnceLock<Vec<Anchor>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}
