//! Presence heartbeats.
//!
//! Online-ness is pull-computed from the staleness formula at read time;
//! nothing is materialized and no background sweeper exists.

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use chatternet_shared::types::{User, UserId};

use crate::database::Database;
use crate::error::Result;
use crate::users::row_to_user;

impl Database {
    /// Record a heartbeat: `last_seen_at = now`.  Idempotent upsert.
    pub fn record_heartbeat(&self, user: &UserId, now: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO presence (user_id, last_seen_at)
             VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET last_seen_at = excluded.last_seen_at",
            params![user.as_str(), now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Last heartbeat timestamp for a user, if any.
    pub fn last_seen(&self, user: &UserId) -> Result<Option<DateTime<Utc>>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT last_seen_at FROM presence WHERE user_id = ?1")?;

        let mut rows = stmt.query_map(params![user.as_str()], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(row) => {
                let ts = DateTime::parse_from_rfc3339(&row?)?.with_timezone(&Utc);
                Ok(Some(ts))
            }
            None => Ok(None),
        }
    }

    /// Whether a user's last heartbeat is within the staleness threshold.
    pub fn is_online(&self, user: &UserId, now: DateTime<Utc>, staleness_secs: i64) -> Result<bool> {
        match self.last_seen(user)? {
            Some(last) => Ok(now - last <= Duration::seconds(staleness_secs)),
            None => Ok(false),
        }
    }

    /// Directory listing joined with computed presence.
    pub fn list_with_presence(
        &self,
        now: DateTime<Utc>,
        staleness_secs: i64,
    ) -> Result<Vec<(User, bool)>> {
        let mut stmt = self.conn().prepare(
            "SELECT u.id, u.handle, u.display_name, u.avatar_ref, u.created_at, p.last_seen_at
             FROM users u
             LEFT JOIN presence p ON p.user_id = u.id
             ORDER BY u.handle ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            let user = row_to_user(row)?;
            let last_seen: Option<String> = row.get(5)?;
            Ok((user, last_seen))
        })?;

        let cutoff = now - Duration::seconds(staleness_secs);
        let mut out = Vec::new();
        for row in rows {
            let (user, last_seen) = row?;
            let online = match last_seen {
                Some(ts) => DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc) >= cutoff,
                None => false,
            };
            out.push((user, online));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::{open_test_db, seed_user};

    #[test]
    fn heartbeat_flips_user_online() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice").id;

        let now = Utc::now();
        assert!(!db.is_online(&alice, now, 15).unwrap());

        db.record_heartbeat(&alice, now).unwrap();
        assert!(db.is_online(&alice, now, 15).unwrap());
    }

    #[test]
    fn stale_heartbeat_reads_offline() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice").id;

        let now = Utc::now();
        db.record_heartbeat(&alice, now - Duration::seconds(16))
            .unwrap();
        assert!(!db.is_online(&alice, now, 15).unwrap());

        // Exactly at the threshold still counts as online.
        db.record_heartbeat(&alice, now - Duration::seconds(15))
            .unwrap();
        assert!(db.is_online(&alice, now, 15).unwrap());
    }

    #[test]
    fn heartbeat_is_an_idempotent_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice").id;

        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(5);
        db.record_heartbeat(&alice, t1).unwrap();
        db.record_heartbeat(&alice, t2).unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM presence", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(db.last_seen(&alice).unwrap().unwrap(), t2);
    }

    #[test]
    fn listing_joins_directory_and_presence() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice").id;
        seed_user(&db, "u2", "bob");

        let now = Utc::now();
        db.record_heartbeat(&alice, now).unwrap();

        let listing = db.list_with_presence(now, 15).unwrap();
        assert_eq!(listing.len(), 2);
        let by_handle: Vec<(&str, bool)> = listing
            .iter()
            .map(|(u, online)| (u.handle.as_str(), *online))
            .collect();
        assert_eq!(by_handle, vec![("alice", true), ("bob", false)]);
    }
}
