// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connection registry: `apps`/`clients` maps plus the admission,
//! removal, heartbeat, and rotation-eviction behavior built on top of them.
//!
//! Grounded on `state::MuxState`'s `RwLock<HashMap<...>>` registry shape.
//! Connections hold a [`Weak`] back-pointer into the router rather than an
//! owning one, avoiding the reference cycle a router-owns-connections /
//! connection-owns-router pair would create.

pub mod admission;
pub mod heartbeat;

pub use admission::AdmissionError;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::auth::AuthManager;
use crate::connection::{AppConn, ClientConn};
use crate::controller::ControllerClient;

pub struct Router {
    apps: RwLock<HashMap<String, Arc<AppConn>>>,
    clients: RwLock<HashMap<String, Arc<ClientConn>>>,
    auth: Arc<AuthManager>,
    controller: Arc<ControllerClient>,
    send_queue_capacity: usize,
}

impl Router {
    pub fn new(auth: Arc<AuthManager>, controller: Arc<ControllerClient>, send_queue_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            apps: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
            auth,
            controller,
            send_queue_capacity,
        })
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn controller(&self) -> &Arc<ControllerClient> {
        &self.controller
    }

    pub fn send_queue_capacity(&self) -> usize {
        self.send_queue_capacity
    }

    pub async fn app(&self, app_id: &str) -> Option<Arc<AppConn>> {
        self.apps.read().await.get(app_id).cloned()
    }

    pub async fn client(&self, client_id: &str) -> Option<Arc<ClientConn>> {
        self.clients.read().await.get(client_id).cloned()
    }

    pub async fn app_snapshot(&self) -> Vec<Arc<AppConn>> {
        self.apps.read().await.values().cloned().collect()
    }

    pub async fn client_snapshot(&self) -> Vec<Arc<ClientConn>> {
        self.clients.read().await.values().cloned().collect()
    }
}
