// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ftbroker: rotating-code admission and websocket message routing for a
//! museum installation's visitor devices and display applications.

pub mod auth;
pub mod code;
pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod router;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthManager;
use crate::config::BrokerConfig;
use crate::controller::ControllerClient;
use crate::router::heartbeat::{run_eviction_listener, run_heartbeat_ticker};
use crate::router::Router;
use crate::transport::build_router;

/// Run the broker until shutdown.
pub async fn run(config: BrokerConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let controller = ControllerClient::new(config.controller_url.clone());
    let auth = AuthManager::spawn(
        config.base_url.clone(),
        ControllerClient::new(config.controller_url.clone()),
        config.auth_timeout(),
        shutdown.clone(),
    )
    .await;
    let router = Router::new(auth, Arc::new(controller), config.send_queue_capacity);

    tokio::spawn(run_heartbeat_ticker(Arc::clone(&router), shutdown.clone()));
    tokio::spawn(run_eviction_listener(Arc::clone(&router), shutdown.clone()));

    tracing::info!("ftbroker listening on {addr}");
    let app = build_router(router);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
