//! Client-side durable cache: one mirror snapshot per peer conversation,
//! plus the change journal that cross-surface sync re-derives from.
//!
//! Snapshots are opaque JSON here; the client crate owns their shape.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chatternet_shared::types::UserId;

use crate::database::Database;
use crate::error::Result;

/// A durable change marker written by whichever surface mutated shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRow {
    pub seq: i64,
    pub peer_id: UserId,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Write (or replace) the mirror snapshot for a peer.  Last write wins.
    pub fn save_mirror(&self, peer: &UserId, json: &str, updated_at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO thread_mirrors (peer_id, json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(peer_id) DO UPDATE SET
                 json = excluded.json,
                 updated_at = excluded.updated_at",
            params![peer.as_str(), json, updated_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Load the snapshot for a peer, if one exists.
    pub fn load_mirror(&self, peer: &UserId) -> Result<Option<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT json FROM thread_mirrors WHERE peer_id = ?1")?;

        let mut rows = stmt.query_map(params![peer.as_str()], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Load every snapshot, most recently updated first.
    pub fn load_all_mirrors(&self) -> Result<Vec<(UserId, String)>> {
        let mut stmt = self.conn().prepare(
            "SELECT peer_id, json FROM thread_mirrors ORDER BY updated_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (peer, json) = row?;
            out.push((UserId::new(peer), json));
        }
        Ok(out)
    }

    /// Remove the snapshot for a peer (used when rebuilding from the server).
    pub fn delete_mirror(&self, peer: &UserId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM thread_mirrors WHERE peer_id = ?1",
            params![peer.as_str()],
        )?;
        Ok(affected > 0)
    }

    /// Append a change marker, returning its journal sequence number.
    pub fn append_change(&self, peer: &UserId, kind: &str, now: DateTime<Utc>) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO sync_journal (peer_id, kind, created_at)
             VALUES (?1, ?2, ?3)",
            params![peer.as_str(), kind, now.to_rfc3339()],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// All change markers after `seq`, in order.
    pub fn changes_since(&self, seq: i64) -> Result<Vec<ChangeRow>> {
        let mut stmt = self.conn().prepare(
            "SELECT seq, peer_id, kind, created_at
             FROM sync_journal
             WHERE seq > ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![seq], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (seq, peer, kind, created) = row?;
            out.push(ChangeRow {
                seq,
                peer_id: UserId::new(peer),
                kind,
                created_at: DateTime::parse_from_rfc3339(&created)?.with_timezone(&Utc),
            });
        }
        Ok(out)
    }

    /// Sequence number of the newest change marker (0 when the journal is
    /// empty).
    pub fn latest_change_seq(&self) -> Result<i64> {
        let seq = self.conn().query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM sync_journal",
            [],
            |row| row.get(0),
        )?;
        Ok(seq)
    }
}
