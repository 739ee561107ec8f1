//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use chatternet_shared::constants::{DEFAULT_HTTP_PORT, PRESENCE_STALENESS_SECS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the SQLite database.
    /// Env: `DB_PATH`
    /// Default: `./chatternet.db`
    pub db_path: PathBuf,

    /// Maximum heartbeat age (seconds) under which a user reads as online.
    /// Env: `PRESENCE_STALENESS_SECS`
    /// Default: `15`
    pub presence_staleness_secs: i64,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Chatternet Node"`
    pub instance_name: String,

    /// Whether to seed the demo contact into the directory at startup.
    /// Env: `DEMO_SEED` (true/false)
    /// Default: `false`
    pub demo_seed: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            db_path: PathBuf::from("./chatternet.db"),
            presence_staleness_secs: PRESENCE_STALENESS_SECS,
            instance_name: "Chatternet Node".to_string(),
            demo_seed: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(val) = std::env::var("PRESENCE_STALENESS_SECS") {
            if let Ok(secs) = val.parse::<i64>() {
                config.presence_staleness_secs = secs;
            } else {
                tracing::warn!(value = %val, "Invalid PRESENCE_STALENESS_SECS, using default");
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Ok(val) = std::env::var("DEMO_SEED") {
            config.demo_seed = val == "true" || val == "1";
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
