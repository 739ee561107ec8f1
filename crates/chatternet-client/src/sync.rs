//! Cross-surface sync.
//!
//! Every surface that mutates shared local state writes a durable change
//! marker to the sync journal and broadcasts it; every subscribed surface
//! (including the writer) re-derives its in-memory mirror from the durable
//! store on each notification.  Eventually consistent, last snapshot written
//! wins; no surface is authoritative.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use chatternet_shared::types::UserId;
use chatternet_store::Database;

use crate::error::{ClientError, Result};

/// Marker kind: a message was appended to a conversation.
pub const CHANGE_MESSAGE: &str = "message";
/// Marker kind: a conversation was viewed (unread reset).
pub const CHANGE_VIEWED: &str = "viewed";

/// A change notification delivered to every surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeMarker {
    pub seq: i64,
    pub peer_id: UserId,
    pub kind: String,
}

/// Shared bus carrying change markers between surfaces of the same user.
#[derive(Clone)]
pub struct SyncBus {
    db: Arc<Mutex<Database>>,
    tx: broadcast::Sender<ChangeMarker>,
}

impl SyncBus {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { db, tx }
    }

    /// Durably record a change and notify every subscriber.
    pub fn publish(&self, peer: &UserId, kind: &str) -> Result<ChangeMarker> {
        let seq = {
            let db = self
                .db
                .lock()
                .map_err(|_| ClientError::Internal("lock poisoned".into()))?;
            db.append_change(peer, kind, Utc::now())?
        };

        let marker = ChangeMarker {
            seq,
            peer_id: peer.clone(),
            kind: kind.to_string(),
        };

        debug!(seq, peer = %marker.peer_id, kind = %marker.kind, "change published");

        // Send fails only when no surface is subscribed; the journal row is
        // already durable, so late subscribers can still catch up.
        let _ = self.tx.send(marker.clone());

        Ok(marker)
    }

    /// Subscribe this surface to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeMarker> {
        self.tx.subscribe()
    }

    /// Durable markers newer than `seq`, for surfaces catching up after a
    /// missed broadcast.
    pub fn changes_since(&self, seq: i64) -> Result<Vec<ChangeMarker>> {
        let db = self
            .db
            .lock()
            .map_err(|_| ClientError::Internal("lock poisoned".into()))?;
        let rows = db.changes_since(seq)?;
        Ok(rows
            .into_iter()
            .map(|row| ChangeMarker {
                seq: row.seq,
                peer_id: row.peer_id,
                kind: row.kind,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(dir: &tempfile::TempDir) -> SyncBus {
        let db = Database::open_at(&dir.path().join("cache.db")).unwrap();
        SyncBus::new(Arc::new(Mutex::new(db)))
    }

    #[tokio::test]
    async fn publish_reaches_all_subscribers_including_the_writer() {
        let dir = tempfile::tempdir().unwrap();
        let bus = bus(&dir);

        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        let marker = bus.publish(&UserId::from("bob"), CHANGE_MESSAGE).unwrap();

        assert_eq!(rx_a.recv().await.unwrap(), marker);
        assert_eq!(rx_b.recv().await.unwrap(), marker);
    }

    #[tokio::test]
    async fn late_subscribers_catch_up_from_the_journal() {
        let dir = tempfile::tempdir().unwrap();
        let bus = bus(&dir);

        let first = bus.publish(&UserId::from("bob"), CHANGE_MESSAGE).unwrap();
        bus.publish(&UserId::from("bob"), CHANGE_VIEWED).unwrap();

        let missed = bus.changes_since(first.seq).unwrap();
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].kind, CHANGE_VIEWED);
    }
}
