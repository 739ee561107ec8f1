//! Per-user notification preferences, stored as one JSON row each.

use rusqlite::params;

use chatternet_shared::prefs::NotificationPreferences;
use chatternet_shared::types::UserId;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Read a user's notification preferences, falling back to the defaults
    /// when they have never saved any.
    pub fn get_notification_prefs(&self, user: &UserId) -> Result<NotificationPreferences> {
        let mut stmt = self
            .conn()
            .prepare("SELECT json FROM notification_prefs WHERE user_id = ?1")?;

        let mut rows = stmt.query_map(params![user.as_str()], |row| row.get::<_, String>(0))?;

        match rows.next() {
            Some(row) => Ok(serde_json::from_str(&row?)?),
            None => Ok(NotificationPreferences::default()),
        }
    }

    /// Replace a user's notification preferences.
    pub fn put_notification_prefs(
        &self,
        user: &UserId,
        prefs: &NotificationPreferences,
    ) -> Result<()> {
        let json = serde_json::to_string(prefs)?;
        self.conn().execute(
            "INSERT INTO notification_prefs (user_id, json)
             VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET json = excluded.json",
            params![user.as_str(), json],
        )?;
        Ok(())
    }
}
