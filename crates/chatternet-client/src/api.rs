//! Typed HTTP client for the Chatternet server API.
//!
//! Every call carries the session principal header and an overall timeout;
//! a timed-out call is reported as a failure and is never retried here
//! (heartbeats retry implicitly on their next scheduled tick, sends are the
//! caller's decision).

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use chatternet_shared::prefs::NotificationPreferences;
use chatternet_shared::protocol::{
    HistoryResponse, NotificationRecord, PresenceEntry, ResolveThreadRequest,
    ResolveThreadResponse, SendMessageRequest, SendMessageResponse, UserWithPresence,
};
use chatternet_shared::types::{Message, ThreadId, UserId};

use crate::error::{ClientError, Result};

/// Default end-to-end timeout for a single API call.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Header carrying the caller's opaque user id (matched by the server).
const PRINCIPAL_HEADER: &str = "x-user-id";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    user_id: UserId,
}

impl ApiClient {
    /// Build a client against a configured, validated endpoint.
    pub fn new(base_url: impl Into<String>, user_id: UserId) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        })
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(PRINCIPAL_HEADER, self.user_id.as_str())
    }

    async fn expect_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json().await?);
        }

        let message = match resp.json::<serde_json::Value>().await {
            Ok(body) => body["error"].as_str().unwrap_or("unknown error").to_string(),
            Err(_) => StatusCode::canonical_reason(&status).unwrap_or("unknown error").to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Resolve (or lazily create) the thread with a peer.
    pub async fn resolve_thread(&self, peer: &UserId) -> Result<ThreadId> {
        let resp = self
            .request(Method::POST, "/api/threads/resolve")
            .json(&ResolveThreadRequest {
                peer_id: peer.clone(),
            })
            .send()
            .await?;
        let body: ResolveThreadResponse = Self::expect_json(resp).await?;
        Ok(body.thread_id)
    }

    /// Ask the server to persist a message to a peer.
    pub async fn send_message(&self, peer: &UserId, text: &str) -> Result<SendMessageResponse> {
        let resp = self
            .request(Method::POST, "/api/messages")
            .json(&SendMessageRequest {
                thread_id: None,
                peer_id: Some(peer.clone()),
                text: text.to_string(),
            })
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// Fetch one page of thread history.
    pub async fn thread_history(
        &self,
        thread_id: ThreadId,
        cursor: Option<i64>,
        limit: u32,
    ) -> Result<HistoryResponse> {
        let mut req = self
            .request(Method::GET, &format!("/api/threads/{thread_id}/messages"))
            .query(&[("limit", limit.to_string())]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor.to_string())]);
        }
        Self::expect_json(req.send().await?).await
    }

    /// Fetch a thread's entire history, following cursors.
    pub async fn full_history(&self, thread_id: ThreadId, page_size: u32) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        let mut cursor = None;
        loop {
            let page = self.thread_history(thread_id, cursor, page_size).await?;
            messages.extend(page.messages);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(messages)
    }

    /// Record a presence heartbeat.
    pub async fn heartbeat(&self) -> Result<()> {
        let resp = self.request(Method::POST, "/api/heartbeat").send().await?;
        let _: serde_json::Value = Self::expect_json(resp).await?;
        Ok(())
    }

    /// Presence of every directory user.
    pub async fn presence(&self) -> Result<Vec<PresenceEntry>> {
        let resp = self.request(Method::GET, "/api/presence").send().await?;
        Self::expect_json(resp).await
    }

    /// Directory listing joined with presence.
    pub async fn list_users(&self) -> Result<Vec<UserWithPresence>> {
        let resp = self.request(Method::GET, "/api/users").send().await?;
        Self::expect_json(resp).await
    }

    /// Read the caller's notification preferences.
    pub async fn notification_prefs(&self) -> Result<NotificationPreferences> {
        let resp = self
            .request(Method::GET, "/api/settings/notifications")
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// Replace the caller's notification preferences.
    pub async fn update_notification_prefs(
        &self,
        prefs: &NotificationPreferences,
    ) -> Result<NotificationPreferences> {
        let resp = self
            .request(Method::PUT, "/api/settings/notifications")
            .json(prefs)
            .send()
            .await?;
        Self::expect_json(resp).await
    }

    /// The caller's notification inbox, newest first.
    pub async fn notifications(&self) -> Result<Vec<NotificationRecord>> {
        let resp = self.request(Method::GET, "/api/notifications").send().await?;
        Self::expect_json(resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_normalized() {
        let api = ApiClient::new("http://localhost:8080/", UserId::from("u1")).unwrap();
        assert_eq!(api.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Nothing listens on port 1.
        let api = ApiClient::new("http://127.0.0.1:1", UserId::from("u1")).unwrap();
        let err = api.heartbeat().await.unwrap_err();
        assert!(matches!(err, ClientError::Http(_)));
    }
}
