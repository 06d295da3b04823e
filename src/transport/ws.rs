// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade handlers for the two endpoints: `/messaging/in/{code}`
//! (visitor devices) and `/messaging/out/{app_id}` (museum displays).
//! Grounded on `transport::ws::handle_ws`'s dual-task select-loop.

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use crate::code::Code;
use crate::protocol::{self, AccessMessage, Message};

use super::AppState;

pub async fn client_ws_handler(
    State(state): State<AppState>,
    Path(auth_code): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_client_ws(socket, state, auth_code))
}

pub async fn app_ws_handler(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_app_ws(socket, state, app_id))
}

async fn handle_client_ws(socket: WebSocket, state: AppState, auth_code: String) {
    let candidate = Code::from_wire(auth_code);
    let (tx, mut rx) = tokio::sync::mpsc::channel(state.router.send_queue_capacity());

    let conn = match state.router.admit_client(&candidate, tx).await {
        Ok(conn) => conn,
        Err(_) => {
            let (mut ws_tx, _) = socket.split();
            let reject = Message::Access(AccessMessage {
                client: String::new(),
                accepted: false,
                reason: Some("expired or invalid".to_owned()),
            });
            if let Ok(text) = protocol::encode(&reject) {
                let _ = ws_tx.send(WsMessage::Text(text.into())).await;
            }
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    loop {
        if conn.is_closed() {
            break;
        }
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(frame) => {
                        match protocol::encode(&frame) {
                            Ok(text) => {
                                if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!(client = %conn.id, err = %e, "encode failure"),
                        }
                    }
                    None => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        match protocol::decode(&text) {
                            Ok(frame) => conn.handle_inbound(frame).await,
                            Err(e) => tracing::warn!(client = %conn.id, err = %e, "decode failure"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    conn.close();
    state.router.remove_client(&conn.id).await;
}

async fn handle_app_ws(socket: WebSocket, state: AppState, app_id: String) {
    let (tx, mut rx) = tokio::sync::mpsc::channel(state.router.send_queue_capacity());
    let conn = state.router.admit_app(app_id.clone(), tx).await;

    let (mut ws_tx, mut ws_rx) = socket.split();
    loop {
        if conn.is_closed() {
            break;
        }
        tokio::select! {
            msg = rx.recv() => {
                match msg {
                    Some(frame) => {
                        match protocol::encode(&frame) {
                            Ok(text) => {
                                if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => tracing::warn!(app = %app_id, err = %e, "encode failure"),
                        }
                    }
                    None => break,
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        match protocol::decode(&text) {
                            Ok(frame) => conn.handle_inbound(frame).await,
                            Err(e) => tracing::warn!(app = %app_id, err = %e, "decode failure"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    conn.close();
    state.router.remove_app(&app_id).await;
}
