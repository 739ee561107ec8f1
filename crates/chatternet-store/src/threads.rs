//! Thread directory: find-or-create of the unique thread per user pair.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chatternet_shared::types::{Thread, ThreadId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Resolve the unique thread for an unordered user pair, creating it on
    /// first contact.
    ///
    /// Race-safe by construction: the pair is canonicalized into
    /// `(user_lo, user_hi)` and inserted with `ON CONFLICT DO NOTHING`
    /// against the unique index, then the single surviving row is read back.
    /// Concurrent callers for the same pair all observe the same thread id.
    pub fn resolve_thread(&self, a: &UserId, b: &UserId) -> Result<Thread> {
        if a == b {
            return Err(StoreError::SelfThread);
        }
        if !self.user_exists(a)? {
            return Err(StoreError::UnknownUser(a.to_string()));
        }
        if !self.user_exists(b)? {
            return Err(StoreError::UnknownUser(b.to_string()));
        }

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };

        let candidate_id = ThreadId::new();
        self.conn().execute(
            "INSERT INTO threads (id, user_lo, user_hi, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_lo, user_hi) DO NOTHING",
            params![
                candidate_id.to_string(),
                lo.as_str(),
                hi.as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        let thread = self.conn().query_row(
            "SELECT id, user_lo, user_hi, created_at
             FROM threads
             WHERE user_lo = ?1 AND user_hi = ?2",
            params![lo.as_str(), hi.as_str()],
            row_to_thread,
        )?;

        if thread.id == candidate_id {
            tracing::info!(thread = %thread.id, lo = %lo, hi = %hi, "created thread");
        }

        Ok(thread)
    }

    /// Fetch a single thread by id.
    pub fn get_thread(&self, id: ThreadId) -> Result<Thread> {
        self.conn()
            .query_row(
                "SELECT id, user_lo, user_hi, created_at
                 FROM threads
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_thread,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List every thread a user participates in, newest first.
    pub fn list_threads_for_user(&self, user: &UserId) -> Result<Vec<Thread>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_lo, user_hi, created_at
             FROM threads
             WHERE user_lo = ?1 OR user_hi = ?1
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![user.as_str()], row_to_thread)?;

        let mut threads = Vec::new();
        for row in rows {
            threads.push(row?);
        }
        Ok(threads)
    }
}

/// Map a `rusqlite::Row` to a [`Thread`].
fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<Thread> {
    let id_str: String = row.get(0)?;
    let user_lo: String = row.get(1)?;
    let user_hi: String = row.get(2)?;
    let created_str: String = row.get(3)?;

    let id = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Thread {
        id: ThreadId(id),
        user_lo: UserId::new(user_lo),
        user_hi: UserId::new(user_hi),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::{open_test_db, seed_user};

    #[test]
    fn resolve_is_idempotent_and_order_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice");
        let bob = seed_user(&db, "u2", "bob");

        let t1 = db.resolve_thread(&alice.id, &bob.id).unwrap();
        let t2 = db.resolve_thread(&bob.id, &alice.id).unwrap();
        assert_eq!(t1.id, t2.id);

        // Exactly one row exists afterwards.
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM threads", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn repeated_resolution_yields_one_row_per_pair() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice");
        let bob = seed_user(&db, "u2", "bob");
        let carol = seed_user(&db, "u3", "carol");

        let ab = db.resolve_thread(&alice.id, &bob.id).unwrap();
        for _ in 0..10 {
            assert_eq!(db.resolve_thread(&alice.id, &bob.id).unwrap().id, ab.id);
        }
        let ac = db.resolve_thread(&alice.id, &carol.id).unwrap();
        assert_ne!(ab.id, ac.id);

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM threads", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn concurrent_resolution_converges_on_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice").id;
        let bob = seed_user(&db, "u2", "bob").id;
        let path = db.path().unwrap();
        drop(db);

        // Independent connections racing the same pair, as separate server
        // workers would.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let path = path.clone();
            let (a, b) = (alice.clone(), bob.clone());
            handles.push(std::thread::spawn(move || {
                let db = Database::open_at(&path).unwrap();
                (0..25)
                    .map(|_| db.resolve_thread(&a, &b).unwrap().id)
                    .collect::<Vec<_>>()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.extend(handle.join().unwrap());
        }
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| *id == ids[0]));

        let db = Database::open_at(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM threads", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn self_thread_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice");

        assert!(matches!(
            db.resolve_thread(&alice.id, &alice.id),
            Err(StoreError::SelfThread)
        ));
    }

    #[test]
    fn unknown_participant_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice");

        let err = db
            .resolve_thread(&alice.id, &UserId::from("ghost"))
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownUser(ref id) if id == "ghost"));
    }

    #[test]
    fn list_threads_for_user_sees_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);
        let alice = seed_user(&db, "u1", "alice");
        let bob = seed_user(&db, "u2", "bob");
        let carol = seed_user(&db, "u3", "carol");

        db.resolve_thread(&alice.id, &bob.id).unwrap();
        db.resolve_thread(&carol.id, &alice.id).unwrap();

        assert_eq!(db.list_threads_for_user(&alice.id).unwrap().len(), 2);
        assert_eq!(db.list_threads_for_user(&bob.id).unwrap().len(), 1);
    }
}
