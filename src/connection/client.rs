// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ClientConn`: the visitor device's side of a connection. Grounded on
//! `transport::ws::handle_ws`'s select-loop shape, with the bridge's
//! per-client channel replaced by a registry-held handle into the router.

use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::code::Code;
use crate::protocol::{AccessMessage, HeartbeatAppMessage, Identifiable, Message};
use crate::router::Router;

use super::CloseGuard;

pub struct ClientConn {
    pub id: String,
    pub auth_code: Code,
    bound_app: RwLock<Option<String>>,
    tx: mpsc::Sender<Message>,
    close: CloseGuard,
    router: Weak<Router>,
}

impl ClientConn {
    pub fn new(id: String, auth_code: Code, tx: mpsc::Sender<Message>, router: Weak<Router>) -> Arc<Self> {
        Arc::new(Self { id, auth_code, bound_app: RwLock::new(None), tx, close: CloseGuard::default(), router })
    }

    pub async fn bound_app(&self) -> Option<String> {
        self.bound_app.read().await.clone()
    }

    fn router(&self) -> Option<Arc<Router>> {
        self.router.upgrade()
    }

    pub async fn enqueue(&self, msg: Message) {
        if self.close.is_closed() {
            return;
        }
        super::enqueue(&self.tx, msg).await;
    }

    /// Idempotent; the second and later calls are no-ops. Does not touch
    /// the registry — callers remove this connection separately.
    pub fn close(&self) {
        self.close.close_once();
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_closed()
    }

    /// Dispatch one inbound frame from the visitor device. The whitelist is
    /// strict: anything outside `Connect`/`Lifecycle`/`ApplicationClient`
    /// closes the connection with a negative access reply.
    pub async fn handle_inbound(self: &Arc<Self>, msg: Message) {
        let Some(router) = self.router() else { return };
        match msg {
            Message::Connect(ref connect) => {
                let app_id = connect.app.clone();
                self.forward_to_app(&router, &app_id, msg).await;
            }
            Message::Lifecycle(_) | Message::ApplicationClient(_) => {
                let Some(app_id) = self.bound_app().await else {
                    warn!(client = %self.id, kind = msg.kind(), "frame before app bound");
                    return;
                };
                self.forward_to_app(&router, &app_id, msg).await;
            }
            other => {
                warn!(client = %self.id, kind = other.kind(), "forbidden client frame");
                self.reject_and_close("forbidden message kind").await;
            }
        }
    }

    async fn forward_to_app(&self, router: &Arc<Router>, app_id: &str, msg: Message) {
        match router.app(app_id).await {
            Some(app) => app.deliver_from_client(&self.id, msg).await,
            None => self.enqueue(Message::HeartbeatApp(HeartbeatAppMessage { up: false })).await,
        }
    }

    async fn reject_and_close(&self, reason: &str) {
        self.enqueue(Message::Access(AccessMessage {
            client: self.id.clone(),
            accepted: false,
            reason: Some(reason.to_owned()),
        }))
        .await;
        self.close();
    }

    /// Evict this client because its held code no longer passes auth
    /// (auto-rotation or a lock-driven code change outran it).
    pub async fn evict(self: &Arc<Self>) {
        self.enqueue(Message::Access(AccessMessage {
            client: self.id.clone(),
            accepted: false,
            reason: Some("code rotated".to_owned()),
        }))
        .await;
        self.close();
    }

    /// Dispatch one outbound frame the router is delivering from `from_app`
    /// (the bound application, or the app the client just tried to reach).
    pub async fn deliver_from_app(self: &Arc<Self>, from_app: &str, mut msg: Message) {
        match &msg {
            Message::Access(access) if access.accepted => {
                *self.bound_app.write().await = Some(from_app.to_owned());
            }
            Message::Access(access) if !access.accepted => {
                msg.set_client_id(None);
                self.enqueue(msg).await;
                self.close();
                return;
            }
            _ => {
                if self.bound_app().await.is_none() {
                    return;
                }
            }
        }
        msg.set_client_id(None);
        self.enqueue(msg).await;
    }
}
