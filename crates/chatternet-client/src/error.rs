use thiserror::Error;

/// Errors produced by the client library.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level HTTP failure (unreachable server, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("Server rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    /// Local cache store failure.
    #[error("Store error: {0}")]
    Store(#[from] chatternet_store::StoreError),

    /// Snapshot (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No conversation is currently open.
    #[error("No active conversation")]
    NoActiveThread,

    /// Internal invariant failure (poisoned lock).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
