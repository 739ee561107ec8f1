//! # chatternet-store
//!
//! SQLite persistence for the Chatternet messaging core.  The crate exposes a
//! synchronous [`Database`] handle that wraps a `rusqlite::Connection` and
//! provides typed helpers for every table.
//!
//! The same crate backs two database layouts:
//! - the server's source-of-truth store (directory, threads, messages,
//!   presence, notification preferences and records);
//! - the client's durable conversation-mirror cache plus the sync journal
//!   that cross-surface sync is built on.

pub mod database;
pub mod messages;
pub mod migrations;
pub mod mirror;
pub mod notifications;
pub mod prefs;
pub mod presence;
pub mod threads;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
