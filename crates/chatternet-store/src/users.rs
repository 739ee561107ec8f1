//! Directory operations for [`User`] records.
//!
//! The directory is owned by the identity provider; this side only mirrors
//! it.  `upsert_user` exists for provisioning and tests, everything else is
//! read-only.

use chrono::{DateTime, Utc};
use rusqlite::params;

use chatternet_shared::types::{User, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

impl Database {
    /// Insert or update a directory entry.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, handle, display_name, avatar_ref, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 handle = excluded.handle,
                 display_name = excluded.display_name,
                 avatar_ref = excluded.avatar_ref",
            params![
                user.id.as_str(),
                user.handle,
                user.display_name,
                user.avatar_ref,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single user by id.
    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, handle, display_name, avatar_ref, created_at
                 FROM users WHERE id = ?1",
                params![id.as_str()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Look a user up by their unique handle.
    pub fn find_user_by_handle(&self, handle: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, handle, display_name, avatar_ref, created_at
                 FROM users WHERE handle = ?1",
                params![handle],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Whether a user id exists in the directory.
    pub fn user_exists(&self, id: &UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all users, ordered by handle.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, handle, display_name, avatar_ref, created_at
             FROM users
             ORDER BY handle ASC",
        )?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }
}

/// Map a `rusqlite::Row` to a [`User`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let handle: String = row.get(1)?;
    let display_name: String = row.get(2)?;
    let avatar_ref: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id: UserId::new(id),
        handle,
        display_name,
        avatar_ref,
        created_at,
    })
}
