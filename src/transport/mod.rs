// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport, grounded on `transport::mod`'s
//! route-table-plus-middleware-layer shape.

pub mod auth;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::middleware;
use axum::routing::get;
use axum::Router as AxumRouter;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::router::Router;

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
}

pub fn build_router(router: Arc<Router>) -> AxumRouter {
    let state = AppState { router };
    AxumRouter::new()
        .route("/api/healthz", get(http::healthz))
        .route("/messaging/in/{auth_code}", get(ws::client_ws_handler))
        .route("/messaging/out/{app_id}", get(ws::app_ws_handler))
        .route("/api/experiences", get(http::get_experiences))
        .route("/api/collections", get(http::get_collections))
        .route("/api/current", get(http::get_current).put(http::put_current).patch(http::patch_current))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
