//! Request/response bodies for the HTTP API, shared by server and client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Message, ThreadId, User, UserId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveThreadRequest {
    pub peer_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveThreadResponse {
    pub thread_id: ThreadId,
}

/// Send a message into an existing thread, or to a peer directly (the
/// thread is then resolved first, creating it on first contact).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<ThreadId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<UserId>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub thread_id: ThreadId,
    pub message_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    /// Pass back as `cursor` to fetch the next page; `None` at the end.
    pub next_cursor: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: UserId,
    pub online: bool,
}

/// Directory listing joined with computed presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithPresence {
    #[serde(flatten)]
    pub user: User,
    pub online: bool,
}

/// A stored in-app notification record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: UserId,
    pub body: String,
    /// Whether an audible cue should fire on the active surface.
    pub sound: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_request_omits_absent_fields() {
        let req = SendMessageRequest {
            thread_id: None,
            peer_id: Some(UserId::from("bob")),
            text: "hi".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("threadId").is_none());
        assert_eq!(json["peerId"], "bob");
    }

    #[test]
    fn history_query_defaults_to_empty() {
        let q: HistoryQuery = serde_json::from_str("{}").unwrap();
        assert!(q.cursor.is_none());
        assert!(q.limit.is_none());
    }
}
