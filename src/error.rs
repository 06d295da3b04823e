// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Error taxonomy for the broker, mapped to HTTP status codes for the
/// transport layer to surface directly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BrokerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("access denied: {reason}")]
    Access { reason: String },
    #[error("unhandled message kind: {0}")]
    UnhandledKind(String),
    #[error("controller upstream error: {0}")]
    Upstream(String),
}

impl BrokerError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Transport(_) => 502,
            Self::Protocol(_) => 400,
            Self::Access { .. } => 401,
            Self::UnhandledKind(_) => 400,
            Self::Upstream(_) => 502,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TRANSPORT_ERROR",
            Self::Protocol(_) => "PROTOCOL_ERROR",
            Self::Access { .. } => "ACCESS_DENIED",
            Self::UnhandledKind(_) => "UNHANDLED_KIND",
            Self::Upstream(_) => "UPSTREAM_ERROR",
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: self.to_string() }
    }

    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse { error: self.to_error_body() }))
    }
}

/// Top-level error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body with machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}
