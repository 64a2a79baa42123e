// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! elm-watch-injector: rewrites the compiler's JS artifact so it can be
//! re-evaluated in a live page and patched incrementally (§4.2). Not a
//! general JS transform — a fixed table of probe/replace regex pairs
//! targeting known anchors in the compiler's output shape.

mod anchors;
mod inject;

pub use anchors::{anchor_table, Anchor};
pub use inject::{InjectError, InjectedModule, Injector};
