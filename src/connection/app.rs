// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AppConn`: the museum display's side of a connection. The application is
//! trusted (it runs under the controller), so inbound handling here claims
//! specific kinds and logs-and-drops anything it doesn't recognize rather
//! than closing the socket on a forbidden frame the way `ClientConn` does.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::auth::Lock;
use crate::protocol::{AccessMessage, HeartbeatClientMessage, Identifiable, Message};
use crate::router::Router;

use super::CloseGuard;

pub struct AppConn {
    pub app_id: String,
    clients: RwLock<HashSet<String>>,
    tx: mpsc::Sender<Message>,
    close: CloseGuard,
    router: Weak<Router>,
}

impl AppConn {
    pub fn new(app_id: String, tx: mpsc::Sender<Message>, router: Weak<Router>) -> Arc<Self> {
        Arc::new(Self { app_id, clients: RwLock::new(HashSet::new()), tx, close: CloseGuard::default(), router })
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

    pub fn close(&self) {
        self.close.close_once();
    }

    pub fn is_closed(&self) -> bool {
        self.close.is_closed()
    }

    pub async fn client_ids(&self) -> Vec<String> {
        self.clients.read().await.iter().cloned().collect()
    }

    /// Drop `client_id` from this app's membership and tell it so with a
    /// negative per-client heartbeat — used both on client disconnect and
    /// on an explicit `Access{accepted:false}`.
    pub async fn remove_client(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
        self.enqueue(Message::HeartbeatClient(HeartbeatClientMessage {
            up: false,
            clients: vec![client_id.to_owned()],
        }))
        .await;
    }

    /// Dispatch one inbound frame from the application.
    pub async fn handle_inbound(self: &Arc<Self>, msg: Message) {
        let Some(router) = self.router() else { return };
        match msg {
            Message::Access(access) => {
                let client_id = access.client.clone();
                if access.accepted {
                    self.clients.write().await.insert(client_id.clone());
                } else {
                    self.clients.write().await.remove(&client_id);
                    self.enqueue(Message::HeartbeatClient(HeartbeatClientMessage {
                        up: false,
                        clients: vec![client_id.clone()],
                    }))
                    .await;
                }
                if let Some(client) = router.client(&client_id).await {
                    client.deliver_from_app(&self.app_id, Message::Access(access)).await;
                }
            }
            Message::DisplaySettings(settings) => {
                if let Some(lock) = settings.lock {
                    router.auth().set_lock(lock).await;
                }
                if let Some(end_time) = settings.end_time {
                    if let Err(e) = router
                        .controller()
                        .patch_current_experience(serde_json::json!({ "end_time": end_time }))
                        .await
                    {
                        warn!(app = %self.app_id, err = %e, "failed to push end_time");
                    }
                }
            }
            Message::Interaction(interaction) => {
                if let Err(e) = router
                    .controller()
                    .patch_current_experience(serde_json::json!({ "last_interaction": interaction.at }))
                    .await
                {
                    warn!(app = %self.app_id, err = %e, "failed to push last_interaction");
                }
            }
            other => {
                if let Some(target) = other.client_id().map(str::to_owned) {
                    let in_self = self.clients.read().await.contains(&target);
                    let in_router = router.client(&target).await.is_some();
                    if !in_self || !in_router {
                        self.enqueue(Message::HeartbeatClient(HeartbeatClientMessage {
                            up: false,
                            clients: vec![target],
                        }))
                        .await;
                        return;
                    }
                    if let Some(client) = router.client(&target).await {
                        client.deliver_from_app(&self.app_id, other).await;
                    }
                } else {
                    warn!(app = %self.app_id, kind = other.kind(), "unhandled message kind");
                }
            }
        }
    }

    /// Dispatch one outbound frame the router is delivering from
    /// `client_id`. Applies the `Connect` admission short-circuit: under a
    /// shared-capacity lock, a client carrying a valid code is auto-admitted
    /// rather than waiting on this app's own `Access` decision.
    pub async fn deliver_from_client(self: &Arc<Self>, client_id: &str, mut msg: Message) {
        if matches!(msg, Message::Connect(_)) {
            let lock = match self.router() {
                Some(router) => router.auth().lock_state().await,
                None => Lock::Open,
            };
            if matches!(lock, Lock::Capacity(_)) {
                self.clients.write().await.insert(client_id.to_owned());
                self.enqueue(Message::Access(AccessMessage {
                    client: client_id.to_owned(),
                    accepted: true,
                    reason: None,
                }))
                .await;
            }
        }
        msg.set_client_id(Some(client_id.to_owned()));
        self.enqueue(msg).await;
    }
}
