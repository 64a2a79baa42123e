// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's connection table (§4.7, §5 "Artifact visibility ... totally
//! ordered per target"). Each accepted socket gets one outbound channel;
//! sends are serialized per connection by the channel itself, so a client
//! can never observe messages out of the order the supervisor produced them.

use elm_watch_core::{ConnectionId, TargetName};
use elm_watch_wire::{ClientMessage, ServerMessage};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tokio::sync::mpsc;

/// What the broker reports up to the supervisor about one connection's
/// lifecycle and inbound traffic.
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    Connected { id: ConnectionId, target: TargetName },
    Message { id: ConnectionId, target: TargetName, message: ClientMessage },
    Disconnected { id: ConnectionId, target: TargetName },
}

struct Entry {
    target: TargetName,
    outbound: mpsc::UnboundedSender<ServerMessage>,
}

/// All currently-accepted connections, keyed by `ConnectionId`. Cloneable
/// handle backed by a lock shared across the broker's tasks.
#[derive(Clone)]
pub struct ConnectionTable {
    entries: std::sync::Arc<RwLock<IndexMap<ConnectionId, Entry>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self { entries: std::sync::Arc::new(RwLock::new(IndexMap::new())) }
    }

    /// Register a freshly upgraded connection, returning the receiver half
    /// the connection's write task should drain.
    pub fn register(&self, id: ConnectionId, target: TargetName) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.entries.write().insert(id, Entry { target, outbound: tx });
        rx
    }

    pub fn remove(&self, id: &ConnectionId) {
        self.entries.write().shift_remove(id);
    }

    pub fn send_to(&self, id: &ConnectionId, message: ServerMessage) {
        if let Some(entry) = self.entries.read().get(id) {
            let _ = entry.outbound.send(message);
        }
    }

    /// Broadcast to every connection currently serving `target`, in table
    /// (connect) order (§4.7 scenario 6: "both clients are notified in
    /// target-specific order").
    pub fn broadcast_to_target(&self, target: &TargetName, message: ServerMessage) {
        for entry in self.entries.read().values() {
            if &entry.target == target {
                let _ = entry.outbound.send(message.clone());
            }
        }
    }

    /// Send `message` to every currently-registered connection regardless of
    /// target (§5 "closes all client connections with a terminal status").
    pub fn broadcast_all(&self, message: ServerMessage) {
        for entry in self.entries.read().values() {
            let _ = entry.outbound.send(message.clone());
        }
    }

    /// Drop every connection's outbound sender. Already-queued messages (a
    /// `broadcast_all` sent just before this) are still delivered first —
    /// `mpsc::UnboundedReceiver::recv` drains its buffer before reporting the
    /// channel closed — so each connection's socket loop exits only after
    /// seeing the final message.
    pub fn close_all(&self) {
        self.entries.write().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.entries.read().len()
    }

    pub fn connection_count_for_target(&self, target: &TargetName) -> usize {
        self.entries.read().values().filter(|entry| &entry.target == target).count()
    }
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elm_watch_core::TargetName;

    fn target(name: &str) -> TargetName {
        TargetName::new(name).expect("valid")
    }

    #[test]
    fn broadcast_reaches_only_connections_for_that_target() {
        let table = ConnectionTable::new();
        let main = target("Main");
        let other = target("Other");
        let id_a = ConnectionId::new();
        let id_b = ConnectionId::new();
        let mut rx_a = table.register(id_a, main.clone());
        let mut rx_b = table.register(id_b, other);

        table.broadcast_to_target(&main, ServerMessage::FullReload { reasons: vec!["x".to_string()] });

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn close_all_delivers_the_final_message_before_disconnecting() {
        let table = ConnectionTable::new();
        let id = ConnectionId::new();
        let mut rx = table.register(id, target("Main"));
        table.broadcast_all(ServerMessage::FullReload { reasons: vec!["shutting down".to_string()] });
        table.close_all();
        assert!(rx.try_recv().is_ok(), "buffered message must survive the senders being dropped");
        assert!(rx.try_recv().is_err());
        assert_eq!(table.connection_count(), 0);
    }

    #[test]
    fn remove_drops_the_connection() {
        let table = ConnectionTable::new();
        let id = ConnectionId::new();
        table.register(id.clone(), target("Main"));
        assert_eq!(table.connection_count(), 1);
        table.remove(&id);
        assert_eq!(table.connection_count(), 0);
    }
}
