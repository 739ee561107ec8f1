//! # chatternet-server
//!
//! HTTP API server for the Chatternet messaging core.
//!
//! This binary provides:
//! - **Thread directory**: find-or-create of the unique thread per user pair
//! - **Message log**: append-only, ordered, cursor-paginated per thread
//! - **Presence**: heartbeat recording with pull-computed online status
//! - **Notification policy**: channel/DND gating into per-user inboxes
//!
//! Identity is external: the fronting identity layer injects the session
//! principal as a request header (see [`auth`]).

mod api;
mod auth;
mod config;
mod error;
mod notify;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chatternet_shared::constants::DEMO_CONTACT_HANDLE;
use chatternet_shared::types::{User, UserId};
use chatternet_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatternet_server=debug")),
        )
        .init();

    info!("Starting Chatternet server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the datastore
    // -----------------------------------------------------------------------
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = Database::open_at(&config.db_path)?;

    if config.demo_seed {
        seed_demo_contact(&db)?;
    }

    let app_state = AppState {
        db: Arc::new(Mutex::new(db)),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

/// Make sure the demo contact exists in the directory so the client's demo
/// mode has a real peer to resolve threads against.
fn seed_demo_contact(db: &Database) -> anyhow::Result<()> {
    let id = UserId::from(DEMO_CONTACT_HANDLE);
    if !db.user_exists(&id)? {
        db.upsert_user(&User {
            id,
            handle: DEMO_CONTACT_HANDLE.to_string(),
            display_name: "Echo Bot".to_string(),
            avatar_ref: None,
            created_at: Utc::now(),
        })?;
        info!(handle = DEMO_CONTACT_HANDLE, "seeded demo contact");
    }
    Ok(())
}
