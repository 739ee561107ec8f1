//! v001 -- Initial schema creation.
//!
//! Server tables: `users`, `threads`, `messages`, `presence`,
//! `notification_prefs`, `notifications`.
//! Client-cache tables: `thread_mirrors`, `sync_journal`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (directory mirror; owned by the identity provider)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- opaque stable id
    handle       TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    avatar_ref   TEXT,
    created_at   TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Threads: at most one per unordered user pair.
-- The pair is canonicalized (user_lo < user_hi) so a single unique
-- index enforces the invariant even under concurrent creation.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS threads (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_lo    TEXT NOT NULL,
    user_hi    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    UNIQUE (user_lo, user_hi),
    CHECK (user_lo < user_hi),
    FOREIGN KEY (user_lo) REFERENCES users(id),
    FOREIGN KEY (user_hi) REFERENCES users(id)
);

-- ----------------------------------------------------------------
-- Messages: append-only, keyed by (thread_id, id) where id is a
-- per-thread monotonic sequence.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    thread_id  TEXT NOT NULL,
    id         INTEGER NOT NULL,
    sender_id  TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (thread_id, id),
    FOREIGN KEY (thread_id) REFERENCES threads(id)
);

-- ----------------------------------------------------------------
-- Presence: one heartbeat row per user; online is computed at read
-- time and never materialized.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS presence (
    user_id      TEXT PRIMARY KEY NOT NULL,
    last_seen_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Notification preferences: JSON blob per user.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notification_prefs (
    user_id TEXT PRIMARY KEY NOT NULL,
    json    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Notification records (the recipient's inbox)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    user_id    TEXT NOT NULL,
    body       TEXT NOT NULL,
    sound      INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notifications_user
    ON notifications(user_id, created_at DESC);

-- ----------------------------------------------------------------
-- Client cache: one mirror snapshot per peer conversation
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS thread_mirrors (
    peer_id    TEXT PRIMARY KEY NOT NULL,
    json       TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Client cache: durable change markers for cross-surface sync
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS sync_journal (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    peer_id    TEXT NOT NULL,
    kind       TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
