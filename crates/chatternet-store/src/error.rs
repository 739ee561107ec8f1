use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error (the datastore-unavailable / transient case).
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A thread cannot be resolved between a user and themselves.
    #[error("Cannot open a thread with yourself")]
    SelfThread,

    /// A participant is absent from the directory.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// The caller is not a participant of the thread.
    #[error("Not a participant of this thread")]
    NotParticipant,

    /// Message body is empty after trimming.
    #[error("Message text must not be empty")]
    EmptyMessage,

    /// Message body exceeds the length bound.
    #[error("Message too long: {len} characters (max {max})")]
    MessageTooLong { len: usize, max: usize },

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// JSON (de)serialization of a stored blob failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// UUID parsing error.
    #[error("UUID error: {0}")]
    Uuid(#[from] uuid::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
