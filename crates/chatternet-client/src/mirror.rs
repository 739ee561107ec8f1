//! Local Conversation Mirror.
//!
//! A denormalized, eventually-consistent projection of server thread state
//! plus purely local bookkeeping (unread counters, optimistic not-yet-
//! confirmed messages).  The durable snapshot in the cache database is the
//! shared truth between surfaces; the in-memory map here is re-derived from
//! it on every change notification.  The server is always authoritative: a
//! snapshot can be fully rebuilt from a history fetch at any time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatternet_shared::constants::DEFAULT_HISTORY_LIMIT;
use chatternet_shared::protocol::SendMessageResponse;
use chatternet_shared::types::{Message, ThreadId, UserId};
use chatternet_store::Database;

use crate::api::ApiClient;
use crate::error::{ClientError, Result};
use crate::responder::DemoResponder;
use crate::sync::{ChangeMarker, SyncBus, CHANGE_MESSAGE, CHANGE_VIEWED};

/// One locally mirrored message.  `id` is `None` while the message is an
/// optimistic local entry the server has not confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MirrorMessage {
    pub id: Option<i64>,
    pub sender_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub pending: bool,
}

impl MirrorMessage {
    fn confirmed(message: &Message) -> Self {
        Self {
            id: Some(message.id),
            sender_id: message.sender_id.clone(),
            text: message.text.clone(),
            created_at: message.created_at,
            pending: false,
        }
    }
}

/// The cached view of one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMirror {
    /// Server thread id, once known.
    pub thread_id: Option<ThreadId>,
    pub with_user_id: UserId,
    pub messages: Vec<MirrorMessage>,
    pub unread_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl ThreadMirror {
    fn empty(peer: &UserId) -> Self {
        Self {
            thread_id: None,
            with_user_id: peer.clone(),
            messages: Vec::new(),
            unread_count: 0,
            updated_at: Utc::now(),
        }
    }
}

/// One surface's view over the shared conversation cache.
pub struct ConversationMirror {
    api: ApiClient,
    db: Arc<Mutex<Database>>,
    bus: SyncBus,
    responder: DemoResponder,
    cache: HashMap<UserId, ThreadMirror>,
    active: Option<UserId>,
}

impl ConversationMirror {
    /// Build a mirror over the shared cache database, loading every stored
    /// snapshot.
    pub fn new(
        api: ApiClient,
        db: Arc<Mutex<Database>>,
        bus: SyncBus,
        responder: DemoResponder,
    ) -> Result<Self> {
        let mut cache = HashMap::new();
        {
            let guard = lock(&db)?;
            for (peer, json) in guard.load_all_mirrors()? {
                let mirror: ThreadMirror = serde_json::from_str(&json)?;
                cache.insert(peer, mirror);
            }
        }

        Ok(Self {
            api,
            db,
            bus,
            responder,
            cache,
            active: None,
        })
    }

    /// The peer whose conversation is currently on screen, if any.
    pub fn active_peer(&self) -> Option<&UserId> {
        self.active.as_ref()
    }

    /// The cached view of one conversation.
    pub fn conversation(&self, peer: &UserId) -> Option<&ThreadMirror> {
        self.cache.get(peer)
    }

    /// All cached conversations, most recently updated first.
    pub fn conversations(&self) -> Vec<&ThreadMirror> {
        let mut all: Vec<&ThreadMirror> = self.cache.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }

    /// Open the conversation with a peer: ensure a mirror exists, mark it
    /// active and reset its unread count.  This is the only action that
    /// resets unread.
    pub fn open(&mut self, peer: &UserId) -> Result<&ThreadMirror> {
        let mut mirror = match self.cache.remove(peer) {
            Some(m) => m,
            None => self
                .load_snapshot(peer)?
                .unwrap_or_else(|| ThreadMirror::empty(peer)),
        };
        mirror.unread_count = 0;
        mirror.updated_at = Utc::now();

        self.persist(&mirror)?;
        self.cache.insert(peer.clone(), mirror);
        self.active = Some(peer.clone());
        self.bus.publish(peer, CHANGE_VIEWED)?;

        self.cache
            .get(peer)
            .ok_or_else(|| ClientError::Internal("mirror vanished after insert".into()))
    }

    /// Tear the active view down.  Any not-yet-committed mark-as-read for a
    /// future `open` is thereby abandoned; an already-dispatched send is
    /// never cancelled.
    pub fn close_active(&mut self) {
        self.active = None;
    }

    /// Send a message to the active peer.
    ///
    /// The optimistic entry is visible (and durable) before the network
    /// round trip; on confirmation it is reconciled with the server-assigned
    /// id and timestamp.  On failure it stays, flagged pending, and is not
    /// retried here.
    pub async fn send(&mut self, text: &str) -> Result<MirrorMessage> {
        let peer = self.active.clone().ok_or(ClientError::NoActiveThread)?;

        let optimistic = MirrorMessage {
            id: None,
            sender_id: self.api.user_id().clone(),
            text: text.to_string(),
            created_at: Utc::now(),
            pending: true,
        };

        {
            let mirror = self.entry_mut(&peer);
            mirror.messages.push(optimistic.clone());
            mirror.updated_at = Utc::now();
            let snapshot = mirror.clone();
            self.persist(&snapshot)?;
        }
        self.bus.publish(&peer, CHANGE_MESSAGE)?;

        // Demo mode: the canned reply is scheduled off the local send so it
        // also works fully offline.
        if self.responder.applies_to(&peer) {
            schedule_demo_reply(
                Arc::clone(&self.db),
                self.bus.clone(),
                peer.clone(),
                self.responder.canned_reply(text),
                self.responder.delay(),
                // Sending requires the thread to be open, so the reply lands
                // in the active conversation and never counts as unread.
                false,
            );
        }

        match self.api.send_message(&peer, text).await {
            Ok(resp) => self.confirm_send(&peer, text, &resp),
            Err(e) => {
                warn!(peer = %peer, error = %e, "send failed; optimistic entry kept pending");
                Err(e)
            }
        }
    }

    /// Reconcile the optimistic entry with the server-assigned id and
    /// timestamp.
    ///
    /// Works on a freshly loaded snapshot, not the in-memory one: while the
    /// send round trip was in flight another writer (a demo reply task) may
    /// have appended to the stored snapshot, and persisting the stale
    /// in-memory copy would discard that.
    fn confirm_send(
        &mut self,
        peer: &UserId,
        text: &str,
        resp: &SendMessageResponse,
    ) -> Result<MirrorMessage> {
        let mut mirror = self
            .load_snapshot(peer)?
            .unwrap_or_else(|| ThreadMirror::empty(peer));
        mirror.thread_id = Some(resp.thread_id);

        let entry = mirror
            .messages
            .iter_mut()
            .rev()
            .find(|m| m.pending && m.text == text)
            .ok_or_else(|| ClientError::Internal("optimistic entry vanished".into()))?;
        entry.id = Some(resp.message_id);
        entry.created_at = resp.created_at;
        entry.pending = false;
        let confirmed = entry.clone();

        mirror.updated_at = Utc::now();
        self.persist(&mirror)?;
        self.cache.insert(peer.clone(), mirror);
        self.bus.publish(peer, CHANGE_MESSAGE)?;
        Ok(confirmed)
    }

    /// Apply an inbound message (from a push or poll).  Increments the
    /// unread count unless the sender's conversation is the active one.
    pub fn receive(&mut self, message: &Message, from: &UserId) -> Result<()> {
        let is_active = self.active.as_ref() == Some(from);

        let mirror = self.entry_mut(from);
        mirror.thread_id = Some(message.thread_id);
        mirror.messages.push(MirrorMessage::confirmed(message));
        if !is_active {
            mirror.unread_count += 1;
        }
        mirror.updated_at = Utc::now();
        let snapshot = mirror.clone();

        self.persist(&snapshot)?;
        self.bus.publish(from, CHANGE_MESSAGE)?;
        Ok(())
    }

    /// Discard the local snapshot for a peer and rebuild it from a full
    /// server history fetch.  Unread count is local bookkeeping and is
    /// preserved.
    pub async fn rebuild(&mut self, peer: &UserId) -> Result<&ThreadMirror> {
        let thread_id = self.api.resolve_thread(peer).await?;
        let history = self.api.full_history(thread_id, DEFAULT_HISTORY_LIMIT).await?;

        let unread = self.cache.get(peer).map(|m| m.unread_count).unwrap_or(0);
        let mirror = ThreadMirror {
            thread_id: Some(thread_id),
            with_user_id: peer.clone(),
            messages: history.iter().map(MirrorMessage::confirmed).collect(),
            unread_count: unread,
            updated_at: Utc::now(),
        };

        self.persist(&mirror)?;
        self.cache.insert(peer.clone(), mirror);
        self.bus.publish(peer, CHANGE_MESSAGE)?;

        debug!(peer = %peer, thread = %thread_id, "mirror rebuilt from server history");

        self.cache
            .get(peer)
            .ok_or_else(|| ClientError::Internal("mirror vanished after insert".into()))
    }

    /// Re-derive one conversation's in-memory view from the durable store.
    /// Surfaces call this for every marker their sync subscription delivers.
    pub fn apply_change(&mut self, marker: &ChangeMarker) -> Result<()> {
        match self.load_snapshot(&marker.peer_id)? {
            Some(mirror) => {
                self.cache.insert(marker.peer_id.clone(), mirror);
            }
            None => {
                self.cache.remove(&marker.peer_id);
            }
        }
        Ok(())
    }

    fn entry_mut(&mut self, peer: &UserId) -> &mut ThreadMirror {
        self.cache
            .entry(peer.clone())
            .or_insert_with(|| ThreadMirror::empty(peer))
    }

    fn load_snapshot(&self, peer: &UserId) -> Result<Option<ThreadMirror>> {
        let guard = lock(&self.db)?;
        match guard.load_mirror(peer)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn persist(&self, mirror: &ThreadMirror) -> Result<()> {
        let json = serde_json::to_string(mirror)?;
        let guard = lock(&self.db)?;
        guard.save_mirror(&mirror.with_user_id, &json, mirror.updated_at)?;
        Ok(())
    }
}

fn lock(db: &Arc<Mutex<Database>>) -> Result<std::sync::MutexGuard<'_, Database>> {
    db.lock()
        .map_err(|_| ClientError::Internal("lock poisoned".into()))
}

/// Deliver the demo contact's canned reply after the configured delay.
fn schedule_demo_reply(
    db: Arc<Mutex<Database>>,
    bus: SyncBus,
    peer: UserId,
    text: String,
    delay: std::time::Duration,
    counts_as_unread: bool,
) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = deliver_local(&db, &bus, &peer, &text, counts_as_unread) {
            warn!(peer = %peer, error = %e, "demo reply delivery failed");
        }
    });
}

fn deliver_local(
    db: &Arc<Mutex<Database>>,
    bus: &SyncBus,
    peer: &UserId,
    text: &str,
    counts_as_unread: bool,
) -> Result<()> {
    {
        let guard = lock(db)?;
        let mut mirror = match guard.load_mirror(peer)? {
            Some(json) => serde_json::from_str(&json)?,
            None => ThreadMirror::empty(peer),
        };
        mirror.messages.push(MirrorMessage {
            id: None,
            sender_id: peer.clone(),
            text: text.to_string(),
            created_at: Utc::now(),
            pending: false,
        });
        if counts_as_unread {
            mirror.unread_count += 1;
        }
        mirror.updated_at = Utc::now();
        let json = serde_json::to_string(&mirror)?;
        guard.save_mirror(peer, &json, mirror.updated_at)?;
    }
    bus.publish(peer, CHANGE_MESSAGE)?;
    Ok(())
}
