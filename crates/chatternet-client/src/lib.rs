//! Chatternet client library: the HTTP API client, the local conversation
//! mirror, cross-surface sync, the presence heartbeat, and the demo-mode
//! responder.  Surfaces (desktop shells, TUIs, test harnesses) embed this
//! crate and render the mirror's snapshots.

pub mod api;
pub mod error;
pub mod heartbeat;
pub mod mirror;
pub mod responder;
pub mod sync;

pub use api::ApiClient;
pub use error::{ClientError, Result};
pub use heartbeat::HeartbeatTask;
pub use mirror::{ConversationMirror, MirrorMessage, ThreadMirror};
pub use responder::DemoResponder;
pub use sync::{ChangeMarker, SyncBus, CHANGE_MESSAGE, CHANGE_VIEWED};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the default tracing subscriber for a client surface.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("chatternet_client=debug,chatternet_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
