use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity = opaque stable id issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ThreadId(pub Uuid);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directory entry.  Owned by the identity provider; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    /// Unique short handle used for lookups (`findUserByHandle`).
    pub handle: String,
    pub display_name: String,
    /// Opaque reference to the avatar image, if any.
    pub avatar_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The unique conversation channel between exactly two users.
///
/// The participant pair is stored canonically ordered (`user_lo < user_hi`)
/// so that a single unique index enforces "at most one thread per pair".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: ThreadId,
    pub user_lo: UserId,
    pub user_hi: UserId,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    /// Whether the given user participates in this thread.
    pub fn has_participant(&self, user: &UserId) -> bool {
        &self.user_lo == user || &self.user_hi == user
    }

    /// The other participant, or `None` when `user` is not in the thread.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.user_lo == user {
            Some(&self.user_hi)
        } else if &self.user_hi == user {
            Some(&self.user_lo)
        } else {
            None
        }
    }
}

/// A single immutable chat message.
///
/// `id` is a per-thread monotonic sequence number; within a thread messages
/// are totally ordered by `(created_at, id)`, and `created_at` never
/// decreases, so ordering by `id` alone yields the same order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub thread_id: ThreadId,
    pub id: i64,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(a: &str, b: &str) -> Thread {
        Thread {
            id: ThreadId::new(),
            user_lo: UserId::from(a),
            user_hi: UserId::from(b),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn peer_of_returns_other_participant() {
        let t = thread("alice", "bob");
        assert_eq!(t.peer_of(&UserId::from("alice")), Some(&UserId::from("bob")));
        assert_eq!(t.peer_of(&UserId::from("bob")), Some(&UserId::from("alice")));
        assert_eq!(t.peer_of(&UserId::from("mallory")), None);
    }

    #[test]
    fn user_id_serializes_transparently() {
        let id = UserId::from("u-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u-42\"");
    }
}
