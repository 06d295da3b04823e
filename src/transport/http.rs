// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handlers for the admission-controlled HTTP surface: thin proxies to the
//! controller, plus the one stateful endpoint (`PUT /current`) that can
//! reopen the lock on an experience switch.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::Lock;
use crate::error::BrokerError;

use super::AppState;

/// Liveness probe body. Never carries a code — only counts and lock state.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app_count: usize,
    pub client_count: usize,
    pub lock: Lock,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let app_count = state.router.app_snapshot().await.len();
    let client_count = state.router.client_snapshot().await.len();
    let lock = state.router.auth().lock_state().await;
    Json(HealthResponse { status: "running", app_count, client_count, lock })
}

pub async fn get_experiences(State(state): State<AppState>) -> Response {
    proxy_get(state.router.controller().get_experiences().await)
}

pub async fn get_collections(State(state): State<AppState>) -> Response {
    proxy_get(state.router.controller().get_collections().await)
}

pub async fn get_current(State(state): State<AppState>) -> Response {
    proxy_get(state.router.controller().get_current().await)
}

fn proxy_get(result: anyhow::Result<serde_json::Value>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => BrokerError::Upstream(e.to_string()).to_http_response().into_response(),
    }
}

/// Set the current experience. Forbidden while `lock = Closed`; if the
/// target experience differs from the one currently showing, the lock is
/// force-reopened first (observed controller behavior, not a clean design —
/// see DESIGN.md).
pub async fn put_current(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Response {
    if matches!(state.router.auth().lock_state().await, Lock::Closed) {
        return BrokerError::Access { reason: "locked".to_owned() }.to_http_response().into_response();
    }

    if let Some(target_id) = body.get("id").and_then(|v| v.as_str()) {
        if let Ok(current) = state.router.controller().get_current().await {
            let current_id = current.get("id").and_then(|v| v.as_str());
            if current_id != Some(target_id) {
                tracing::warn!(target_id, "experience switch force-reopens the lock");
                state.router.auth().set_lock(Lock::Open).await;
            }
        }
    }

    match state.router.controller().put_current(body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => BrokerError::Upstream(e.to_string()).to_http_response().into_response(),
    }
}

pub async fn patch_current(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Response {
    match state.router.controller().patch_current_experience(body).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => BrokerError::Upstream(e.to_string()).to_http_response().into_response(),
    }
}
