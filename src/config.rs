// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the ftbroker service.
#[derive(Debug, Clone, clap::Parser)]
pub struct BrokerConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "FT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 4000, env = "FT_PORT")]
    pub port: u16,

    /// User-facing base URL, used to build the placard QR target.
    #[arg(long, default_value = "http://localhost:3000", env = "FT_BASE_URL")]
    pub base_url: String,

    /// Controller API base URL.
    #[arg(long, default_value = "http://localhost:8000", env = "FT_CONTROLLER_URL")]
    pub controller_url: String,

    /// Cache/data directory (reserved for the REST-proxy cache layer; unused by the core).
    #[arg(long, env = "FT_API_DATA_PATH")]
    pub data_path: Option<std::path::PathBuf>,

    /// Log level name.
    #[arg(long, default_value = "info", env = "FT_LOG_LEVEL")]
    pub log_level: String,

    /// Auto-cycle seconds for the auth-code manager.
    #[arg(long, default_value_t = 900, env = "FT_AUTH_TIMEOUT")]
    pub auth_timeout_secs: u64,

    /// Bounded per-connection send-queue capacity.
    #[arg(long, default_value_t = 64, env = "FT_SEND_QUEUE_CAPACITY")]
    pub send_queue_capacity: usize,
}

impl BrokerConfig {
    pub fn auth_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auth_timeout_secs)
    }
}
