//! The recipient-facing notification inbox.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chatternet_shared::protocol::NotificationRecord;
use chatternet_shared::types::UserId;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Insert a notification record.
    pub fn insert_notification(&self, record: &NotificationRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notifications (id, user_id, body, sound, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.user_id.as_str(),
                record.body,
                record.sound as i64,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List a user's notifications, newest first.
    pub fn list_notifications(&self, user: &UserId, limit: u32) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_id, body, sound, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user.as_str(), limit], row_to_notification)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Number of stored notifications for a user.
    pub fn count_notifications(&self, user: &UserId) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1",
            params![user.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRecord> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let body: String = row.get(2)?;
    let sound: i64 = row.get(3)?;
    let created_str: String = row.get(4)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(NotificationRecord {
        id,
        user_id: UserId::new(user_id),
        body,
        sound: sound != 0,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::tests::open_test_db;

    fn record(user: &str, body: &str, at: DateTime<Utc>) -> NotificationRecord {
        NotificationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: UserId::from(user),
            body: body.to_string(),
            sound: false,
            created_at: at,
        }
    }

    #[test]
    fn inbox_lists_newest_first_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let now = Utc::now();
        db.insert_notification(&record("u1", "first", now)).unwrap();
        db.insert_notification(&record("u1", "second", now + chrono::Duration::seconds(1)))
            .unwrap();
        db.insert_notification(&record("u2", "other", now)).unwrap();

        let inbox = db.list_notifications(&UserId::from("u1"), 50).unwrap();
        let bodies: Vec<_> = inbox.iter().map(|n| n.body.as_str()).collect();
        assert_eq!(bodies, vec!["second", "first"]);
        assert_eq!(db.count_notifications(&UserId::from("u2")).unwrap(), 1);
    }
}
