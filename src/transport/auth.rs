// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `X-AUTH-CODE` guard for the admission-controlled HTTP surface. Accepts
//! either the header or a same-named cookie; both `current_code` and
//! `next_code` pass, and a `next_code` hit triggers `advance()` before the
//! request is served (the same first-use rotation rule the websocket
//! admission path applies), grounded on `transport::auth::validate_bearer`'s
//! shape.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::code::Code;
use crate::error::BrokerError;

use super::AppState;

const HEADER_NAME: &str = "x-auth-code";
const COOKIE_NAME: &str = "X-AUTH-CODE";

fn extract_candidate(req: &Request) -> Option<Code> {
    if let Some(value) = req.headers().get(HEADER_NAME).and_then(|v| v.to_str().ok()) {
        return Some(Code::from_wire(value.to_owned()));
    }
    let cookie_header = req.headers().get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == COOKIE_NAME).then(|| Code::from_wire(value.to_owned()))
    })
}

/// Axum middleware enforcing the `X-AUTH-CODE` guard. Exempt: `/api/healthz`
/// and the two websocket upgrade routes, which authenticate themselves.
pub async fn auth_layer(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path == "/api/healthz" || path.starts_with("/messaging/") {
        return next.run(req).await;
    }

    let Some(candidate) = extract_candidate(&req) else {
        return BrokerError::Access { reason: "missing auth code".to_owned() }.to_http_response().into_response();
    };

    if state.router.auth().check(&candidate).await {
        return next.run(req).await;
    }
    if state.router.auth().check_next(&candidate).await {
        state.router.auth().advance().await;
        return next.run(req).await;
    }

    BrokerError::Access { reason: "expired or invalid".to_owned() }.to_http_response().into_response()
}
