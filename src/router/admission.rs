// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection admission and removal. A client is admitted either against
//! `current_code` directly, or against `next_code` — which additionally
//! triggers exactly one `advance()` so the code it used becomes current
//! before the connection is registered (the "first-use rotation").

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::code::Code;
use crate::connection::{AppConn, ClientConn};
use crate::protocol::Message;

use super::Router;

/// Why an admission attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    InvalidCode,
}

impl Router {
    /// Register a new application connection. Duplicate app ids overwrite:
    /// the newcomer wins, and the displaced connection is left to notice
    /// its own send queue has been orphaned and close on its own.
    pub async fn admit_app(self: &Arc<Self>, app_id: String, tx: mpsc::Sender<Message>) -> Arc<AppConn> {
        let conn = AppConn::new(app_id.clone(), tx, Arc::downgrade(self));
        self.apps.write().await.insert(app_id, Arc::clone(&conn));
        conn
    }

    pub async fn remove_app(&self, app_id: &str) {
        self.apps.write().await.remove(app_id);
    }

    /// Verify `candidate` against `current_code` or `next_code`, assign a
    /// fresh id, and register the client. On a `next_code` hit, advances the
    /// auth manager before returning so the admitted code is now current.
    pub async fn admit_client(
        self: &Arc<Self>,
        candidate: &Code,
        tx: mpsc::Sender<Message>,
    ) -> Result<Arc<ClientConn>, AdmissionError> {
        if self.auth.check(candidate).await {
            return Ok(self.register_client(candidate.clone(), tx).await);
        }
        if self.auth.check_next(candidate).await {
            self.auth.advance().await;
            return Ok(self.register_client(candidate.clone(), tx).await);
        }
        Err(AdmissionError::InvalidCode)
    }

    async fn register_client(self: &Arc<Self>, auth_code: Code, tx: mpsc::Sender<Message>) -> Arc<ClientConn> {
        let id = Uuid::new_v4().to_string();
        let conn = ClientConn::new(id.clone(), auth_code, tx, Arc::downgrade(self));
        self.clients.write().await.insert(id, Arc::clone(&conn));
        conn
    }

    /// Remove `client_id` from the registry. If it was bound to a still-
    /// connected app, that app is told so it can drop it and emit a
    /// negative per-client heartbeat.
    pub async fn remove_client(&self, client_id: &str) {
        let removed = self.clients.write().await.remove(client_id);
        let Some(client) = removed else { return };
        if let Some(app_id) = client.bound_app().await {
            if let Some(app) = self.app(&app_id).await {
                app.remove_client(client_id).await;
            }
        }
    }
}
