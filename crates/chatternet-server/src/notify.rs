//! Notification policy dispatch.
//!
//! Runs after a message row has committed.  Loads the recipient's
//! preferences, evaluates the channel and DND gates, and inserts an inbox
//! record when both pass.  Dispatch failures are logged and swallowed: the
//! message is already stored and a lost notification must never roll it back
//! or fail the triggering append.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use chatternet_shared::prefs::NotificationDecision;
use chatternet_shared::protocol::NotificationRecord;
use chatternet_shared::types::{Message, UserId};
use chatternet_store::{Database, StoreError};

/// Notify `recipient` about a freshly stored message.  Never fails.
pub fn dispatch(db: &Database, recipient: &UserId, message: &Message) {
    if let Err(e) = dispatch_at(db, recipient, message, Utc::now()) {
        warn!(
            recipient = %recipient,
            thread = %message.thread_id,
            error = %e,
            "notification dispatch failed; message delivery is unaffected"
        );
    }
}

/// Gate evaluation at an explicit instant (separated out for tests).
pub fn dispatch_at(
    db: &Database,
    recipient: &UserId,
    message: &Message,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let prefs = db.get_notification_prefs(recipient)?;

    match prefs.evaluate(now) {
        NotificationDecision::Suppress => {
            debug!(recipient = %recipient, "notification suppressed by preferences");
            Ok(())
        }
        NotificationDecision::Notify { sound } => {
            let sender = db.get_user(&message.sender_id);
            let body = match sender {
                Ok(u) => format!("New message from {}.", u.display_name),
                Err(_) => "New message received.".to_string(),
            };

            db.insert_notification(&NotificationRecord {
                id: Uuid::new_v4().to_string(),
                user_id: recipient.clone(),
                body,
                sound,
                created_at: now,
            })?;

            debug!(recipient = %recipient, sound, "notification recorded");
            Ok(())
        }
    }
}
