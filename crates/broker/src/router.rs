// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The broker's axum router (§4.7): one root path, upgraded to a WebSocket,
//! running the validation sequence before the connection is registered.

use crate::connection::{BrokerEvent, ConnectionTable};
use crate::upgrade::{validate_connect, TargetLookup};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{RawQuery, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use elm_watch_core::{ConnectionId, TargetName};
use elm_watch_wire::{ClientMessage, ServerMessage, StatusChanged, UnexpectedErrorKind};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shared state behind every request handler.
pub struct BrokerState {
    pub server_version: String,
    pub connections: ConnectionTable,
    pub lookup: Arc<dyn TargetLookup>,
    pub events: mpsc::UnboundedSender<BrokerEvent>,
}

/// Build the router the supervisor binds and serves (§4.7: "upgrading
/// connections under a single root path"). Any other path still upgrades —
/// step 1 of the validation sequence requires telling a misrouted client
/// `BadUrl` rather than letting axum's router 404 the handshake away.
pub fn build_router(state: Arc<BrokerState>) -> Router {
    Router::new().route("/", get(ws_handler)).fallback(get(bad_url_handler)).with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, RawQuery(query): RawQuery, State(state): State<Arc<BrokerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query.unwrap_or_default(), state))
}

/// Step 1 of the §4.7 validation sequence: any path other than the root
/// still upgrades, gets sent `UnexpectedError{kind:BadUrl}`, and is then
/// kept open until the client closes it (§4.7: "keep the connection open").
async fn bad_url_handler(ws: WebSocketUpgrade, uri: axum::http::Uri, State(_state): State<Arc<BrokerState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_bad_url(socket, uri.to_string()))
}

async fn handle_bad_url(mut socket: WebSocket, path: String) {
    send(
        &mut socket,
        ServerMessage::StatusChanged {
            status: StatusChanged::UnexpectedError(UnexpectedErrorKind::BadUrl { message: format!("unexpected path: {path}") }),
        },
    )
    .await;
    drain_until_closed(&mut socket).await;
}

async fn handle_socket(mut socket: WebSocket, query: String, state: Arc<BrokerState>) {
    let validated = match validate_connect(&query, &state.server_version, state.lookup.as_ref()) {
        Ok(validated) => validated,
        Err(status) => {
            send(&mut socket, ServerMessage::StatusChanged { status }).await;
            // Step 1/2 failures (§4.7): "keep the connection open" rather
            // than closing it, so a well-behaved retrying client can still
            // be told why. There is nothing further to register.
            drain_until_closed(&mut socket).await;
            return;
        }
    };

    let Ok(target_name) = TargetName::new(validated.target_name.clone()) else {
        send(
            &mut socket,
            ServerMessage::StatusChanged {
                status: StatusChanged::UnexpectedError(UnexpectedErrorKind::ParamsDecodeError {
                    message: "targetName failed re-validation".to_string(),
                }),
            },
        )
        .await;
        return;
    };

    let id = ConnectionId::new();
    let mut outbound = state.connections.register(id.clone(), target_name.clone());
    let _ = state.events.send(BrokerEvent::Connected { id: id.clone(), target: target_name.clone() });

    send(&mut socket, ServerMessage::StatusChanged { status: validated.initial_status }).await;

    loop {
        tokio::select! {
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(message) => send(&mut socket, message).await,
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => {
                                let _ = state.events.send(BrokerEvent::Message { id: id.clone(), target: target_name.clone(), message });
                            }
                            Err(err) => {
                                // Broker protocol closure (§8): reply to the
                                // misbehaving client only, stay live.
                                send(&mut socket, ServerMessage::StatusChanged {
                                    status: StatusChanged::UnexpectedError(UnexpectedErrorKind::ParamsDecodeError { message: err.to_string() }),
                                }).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.connections.remove(&id);
    let _ = state.events.send(BrokerEvent::Disconnected { id, target: target_name });
}

async fn send(socket: &mut WebSocket, message: ServerMessage) {
    if let Ok(json) = serde_json::to_string(&message) {
        let _ = socket.send(Message::Text(json)).await;
    }
}

/// A connection rejected before registration still gets read until the
/// client closes it, so the handler doesn't exit before its `StatusChanged`
/// has actually been flushed to a slow client.
async fn drain_until_closed(socket: &mut WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        if matches!(message, Message::Close(_)) {
            break;
        }
    }
}
