// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The WebSocket broker (§4.7): HTTP+WS server, connection table, and the
//! upgrade validation sequence. Takes no dependency on `elm-watch-engine`;
//! the supervisor answers connect-time questions through `TargetLookup` and
//! receives client lifecycle/messages through `BrokerEvent`.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod connection;
mod router;
mod upgrade;

pub use connection::{BrokerEvent, ConnectionTable};
pub use router::{build_router, BrokerState};
pub use upgrade::{validate_connect, TargetConnectState, TargetLookup, ValidatedConnect};
