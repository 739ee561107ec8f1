/// Application name
pub const APP_NAME: &str = "Chatternet";

/// Maximum message body length in characters
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// A user is online while their last heartbeat is at most this old
pub const PRESENCE_STALENESS_SECS: i64 = 15;

/// Client heartbeat emission interval in seconds
pub const HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Delay before the demo contact's canned reply, in milliseconds
pub const DEMO_REPLY_DELAY_MS: u64 = 300;

/// Handle of the built-in demo contact
pub const DEMO_CONTACT_HANDLE: &str = "echo-bot";

/// Default page size for thread history
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Maximum page size for thread history
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Step applied when the wall clock would run backwards within a thread
pub const TIMESTAMP_CLAMP_STEP_MS: i64 = 1;
