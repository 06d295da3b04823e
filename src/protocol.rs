// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged-union wire protocol shared by client and application sockets,
//! grounded on `state::MuxEvent`'s `#[serde(tag = "type")]` external-tagging
//! style.

use serde::{Deserialize, Serialize};

use crate::auth::Lock;

/// A single wire message. Unknown `"type"` values fail to deserialize,
/// surfaced by the caller as a protocol error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
    Connect(ConnectMessage),
    Access(AccessMessage),
    Lifecycle(LifecycleMessage),
    DisplaySettings(DisplaySettingsMessage),
    Interaction(InteractionMessage),
    #[serde(rename = "app-app")]
    ApplicationApp(ApplicationAppMessage),
    #[serde(rename = "app-client")]
    ApplicationClient(ApplicationClientMessage),
    #[serde(rename = "heartbeat-client")]
    HeartbeatClient(HeartbeatClientMessage),
    #[serde(rename = "heartbeat-app")]
    HeartbeatApp(HeartbeatAppMessage),
    Error(ErrorMessage),
}

impl Message {
    /// Human-readable kind name, for logging unhandled/forbidden messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Access(_) => "access",
            Self::Lifecycle(_) => "lifecycle",
            Self::DisplaySettings(_) => "display-settings",
            Self::Interaction(_) => "interaction",
            Self::ApplicationApp(_) => "app-app",
            Self::ApplicationClient(_) => "app-client",
            Self::HeartbeatClient(_) => "heartbeat-client",
            Self::HeartbeatApp(_) => "heartbeat-app",
            Self::Error(_) => "error",
        }
    }
}

/// Messages that can carry a `client` identifier the router rewrites as it
/// crosses the app/client boundary. Modeled as a trait rather than a shared
/// base struct since Rust enum variants don't share fields.
pub trait Identifiable {
    fn client_id(&self) -> Option<&str>;
    fn set_client_id(&mut self, id: Option<String>);
}

impl Identifiable for Message {
    fn client_id(&self) -> Option<&str> {
        match self {
            Self::Connect(m) => m.client.as_deref(),
            Self::Access(m) => Some(&m.client),
            Self::Lifecycle(m) => m.client.as_deref(),
            Self::ApplicationClient(m) => m.client.as_deref(),
            Self::HeartbeatApp(_) | Self::HeartbeatClient(_) => None,
            _ => None,
        }
    }

    fn set_client_id(&mut self, id: Option<String>) {
        match self {
            Self::Connect(m) => m.client = id,
            Self::Access(m) => m.client = id.unwrap_or_default(),
            Self::Lifecycle(m) => m.client = id,
            Self::ApplicationClient(m) => m.client = id,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectMessage {
    pub app: String,
    /// Stamped in by the router as it forwards this frame to the app's
    /// socket; always empty on the wire coming from a visitor device.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessMessage {
    pub client: String,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettingsMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<Lock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionMessage {
    pub at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAppMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationClientMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatClientMessage {
    pub up: bool,
    pub clients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAppMessage {
    pub up: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

/// Decode a wire message, mapping unknown/malformed JSON to a protocol error.
pub fn decode(text: &str) -> Result<Message, crate::error::BrokerError> {
    serde_json::from_str(text)
        .map_err(|e| crate::error::BrokerError::Protocol(format!("decode: {e}")))
}

/// Encode a wire message. Only fails on non-serializable payloads, which
/// cannot happen for the closed message set above; kept fallible for the
/// `ApplicationAppMessage`/`ApplicationClientMessage` free-form payload.
pub fn encode(msg: &Message) -> Result<String, crate::error::BrokerError> {
    serde_json::to_string(msg).map_err(|e| crate::error::BrokerError::Protocol(format!("encode: {e}")))
}
