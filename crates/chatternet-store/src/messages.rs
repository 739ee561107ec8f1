//! Append-only message log with per-thread monotonic ordering.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, TransactionBehavior};

use chatternet_shared::constants::{MAX_MESSAGE_CHARS, TIMESTAMP_CLAMP_STEP_MS};
use chatternet_shared::types::{Message, ThreadId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};

/// One page of thread history.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<i64>,
}

impl Database {
    /// Append a message to a thread.
    ///
    /// Sequence number and timestamp are assigned inside a single immediate
    /// transaction, so ordering within a thread is serialized at the
    /// datastore level.  The timestamp is clamped non-decreasing: if the wall
    /// clock reads earlier than the last message, `last + 1ms` is used.
    pub fn append_message(
        &mut self,
        thread_id: ThreadId,
        sender: &UserId,
        text: &str,
    ) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyMessage);
        }
        let len = text.chars().count();
        if len > MAX_MESSAGE_CHARS {
            return Err(StoreError::MessageTooLong {
                len,
                max: MAX_MESSAGE_CHARS,
            });
        }

        let thread = self.get_thread(thread_id)?;
        if !thread.has_participant(sender) {
            return Err(StoreError::NotParticipant);
        }

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (next_id, last_ts): (i64, Option<String>) = tx.query_row(
            "SELECT COALESCE(MAX(id), 0) + 1, MAX(created_at)
             FROM messages WHERE thread_id = ?1",
            params![thread_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut created_at = Utc::now();
        if let Some(last) = last_ts {
            let last: DateTime<Utc> = DateTime::parse_from_rfc3339(&last)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(StoreError::ChronoParse)?;
            if created_at < last {
                created_at = last + Duration::milliseconds(TIMESTAMP_CLAMP_STEP_MS);
            }
        }

        tx.execute(
            "INSERT INTO messages (thread_id, id, sender_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                thread_id.to_string(),
                next_id,
                sender.as_str(),
                text,
                created_at.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        tracing::debug!(thread = %thread_id, id = next_id, sender = %sender, "message appended");

        Ok(Message {
            thread_id,
            id: next_id,
            sender_id: sender.clone(),
            text: text.to_string(),
            created_at,
        })
    }

    /// Fetch one page of a thread's history in ascending `(created_at, id)`
    /// order (equivalently ascending `id`).
    ///
    /// `cursor` is the id of the last message of the previous page.  Because
    /// the log is append-only, earlier pages never change under concurrent
    /// appends.
    pub fn thread_history(
        &self,
        thread_id: ThreadId,
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<HistoryPage> {
        // Distinguish "no messages" from "no such thread".
        self.get_thread(thread_id)?;

        let mut stmt = self.conn().prepare(
            "SELECT thread_id, id, sender_id, body, created_at
             FROM messages
             WHERE thread_id = ?1 AND id > ?2
             ORDER BY id ASC
             LIMIT ?3",
        )?;

        let rows = stmt.query_map(
            params![thread_id.to_string(), cursor.unwrap_or(0), limit],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }

        let next_cursor = if messages.len() == limit as usize {
            messages.last().map(|m| m.id)
        } else {
            None
        };

        Ok(HistoryPage {
            messages,
            next_cursor,
        })
    }
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let thread_id_str: String = row.get(0)?;
    let id: i64 = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let body: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let thread_id = uuid::Uuid::parse_str(&thread_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        thread_id: ThreadId(thread_id),
        id,
        sender_id: UserId::new(sender_id),
        text: body,
        created_at,
    })
}
