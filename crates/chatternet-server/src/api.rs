use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use chatternet_shared::constants::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use chatternet_shared::prefs::NotificationPreferences;
use chatternet_shared::protocol::{
    HistoryQuery, HistoryResponse, NotificationRecord, OkResponse, PresenceEntry,
    ResolveThreadRequest, ResolveThreadResponse, SendMessageRequest, SendMessageResponse,
    UserWithPresence,
};
use chatternet_shared::types::{Thread, ThreadId};
use chatternet_store::Database;

use crate::auth::Principal;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::notify;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/users", get(list_users))
        .route("/api/presence", get(presence))
        .route("/api/heartbeat", post(heartbeat))
        .route("/api/threads/resolve", post(resolve_thread))
        .route("/api/threads/:id/messages", get(thread_history))
        .route("/api/messages", post(send_message))
        .route(
            "/api/settings/notifications",
            get(get_notification_prefs).put(put_notification_prefs),
        )
        .route("/api/notifications", get(list_notifications))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_users(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Vec<UserWithPresence>>, ApiError> {
    let db = state.db.lock().await;
    let listing = db.list_with_presence(Utc::now(), state.config.presence_staleness_secs)?;
    Ok(Json(
        listing
            .into_iter()
            .map(|(user, online)| UserWithPresence { user, online })
            .collect(),
    ))
}

async fn presence(
    State(state): State<AppState>,
    _principal: Principal,
) -> Result<Json<Vec<PresenceEntry>>, ApiError> {
    let db = state.db.lock().await;
    let listing = db.list_with_presence(Utc::now(), state.config.presence_staleness_secs)?;
    Ok(Json(
        listing
            .into_iter()
            .map(|(user, online)| PresenceEntry {
                user_id: user.id,
                online,
            })
            .collect(),
    ))
}

async fn heartbeat(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<OkResponse>, ApiError> {
    let db = state.db.lock().await;
    db.record_heartbeat(&principal.0, Utc::now())?;
    Ok(Json(OkResponse { ok: true }))
}

async fn resolve_thread(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<ResolveThreadRequest>,
) -> Result<Json<ResolveThreadResponse>, ApiError> {
    let db = state.db.lock().await;
    let thread = db.resolve_thread(&principal.0, &req.peer_id)?;
    Ok(Json(ResolveThreadResponse {
        thread_id: thread.id,
    }))
}

async fn send_message(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let mut db = state.db.lock().await;

    let thread: Thread = match (req.thread_id, req.peer_id) {
        (Some(thread_id), _) => db.get_thread(thread_id)?,
        (None, Some(ref peer)) => db.resolve_thread(&principal.0, peer)?,
        (None, None) => {
            return Err(ApiError::BadRequest("threadId or peerId required".into()));
        }
    };

    if !thread.has_participant(&principal.0) {
        return Err(ApiError::Forbidden(
            "Not a participant of this thread".into(),
        ));
    }

    let message = db.append_message(thread.id, &principal.0, &req.text)?;

    // Alerting is decoupled from delivery: dispatch never fails the append.
    if let Some(recipient) = thread.peer_of(&principal.0) {
        notify::dispatch(&db, recipient, &message);
    }

    info!(thread = %thread.id, id = message.id, "message stored");

    Ok(Json(SendMessageResponse {
        thread_id: thread.id,
        message_id: message.id,
        created_at: message.created_at,
    }))
}

async fn thread_history(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let thread_id = ThreadId(id);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let db = state.db.lock().await;

    let thread = db.get_thread(thread_id)?;
    if !thread.has_participant(&principal.0) {
        return Err(ApiError::Forbidden(
            "Not a participant of this thread".into(),
        ));
    }

    let page = db.thread_history(thread_id, query.cursor, limit)?;
    Ok(Json(HistoryResponse {
        messages: page.messages,
        next_cursor: page.next_cursor,
    }))
}

async fn get_notification_prefs(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.get_notification_prefs(&principal.0)?))
}

async fn put_notification_prefs(
    State(state): State<AppState>,
    principal: Principal,
    Json(prefs): Json<NotificationPreferences>,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let db = state.db.lock().await;
    db.put_notification_prefs(&principal.0, &prefs)?;
    Ok(Json(prefs))
}

async fn list_notifications(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
    let db = state.db.lock().await;
    Ok(Json(db.list_notifications(&principal.0, 100)?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use chatternet_shared::types::{User, UserId};

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        for (id, handle) in [("u1", "alice"), ("u2", "bob")] {
            db.upsert_user(&User {
                id: UserId::from(id),
                handle: handle.to_string(),
                display_name: handle.to_string(),
                avatar_ref: None,
                created_at: Utc::now(),
            })
            .unwrap();
        }
        AppState {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(ServerConfig::default()),
        }
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_is_public() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, body) = call(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_rejects_missing_principal() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, _) = call(&app, request("POST", "/api/heartbeat", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn first_contact_creates_thread_message_and_notification() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        // A sends "hello" to B by peer id; no thread exists yet.
        let (status, body) = call(
            &app,
            request(
                "POST",
                "/api/messages",
                Some("u1"),
                Some(json!({ "peerId": "u2", "text": "hello" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messageId"], 1);
        let thread_id = body["threadId"].as_str().unwrap().to_string();

        // Both participants resolve to the same thread.
        let (status, body) = call(
            &app,
            request(
                "POST",
                "/api/threads/resolve",
                Some("u2"),
                Some(json!({ "peerId": "u1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["threadId"], thread_id.as_str());

        // History shows the single message with id 1.
        let (status, body) = call(
            &app,
            request(
                "GET",
                &format!("/api/threads/{thread_id}/messages"),
                Some("u2"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["text"], "hello");
        assert!(body["nextCursor"].is_null());

        // B's inbox has the notification.
        let (status, body) =
            call(&app, request("GET", "/api/notifications", Some("u2"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn validation_errors_map_to_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/api/messages",
                Some("u1"),
                Some(json!({ "peerId": "u2", "text": "   " })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/api/threads/resolve",
                Some("u1"),
                Some(json!({ "peerId": "u1" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_peer_and_thread_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, _) = call(
            &app,
            request(
                "POST",
                "/api/threads/resolve",
                Some("u1"),
                Some(json!({ "peerId": "ghost" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let missing = Uuid::new_v4();
        let (status, _) = call(
            &app,
            request(
                "GET",
                &format!("/api/threads/{missing}/messages"),
                Some("u1"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn outsiders_cannot_read_history() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state
            .db
            .lock()
            .await
            .upsert_user(&User {
                id: UserId::from("u3"),
                handle: "mallory".into(),
                display_name: "mallory".into(),
                avatar_ref: None,
                created_at: Utc::now(),
            })
            .unwrap();
        let app = build_router(state);

        let (_, body) = call(
            &app,
            request(
                "POST",
                "/api/threads/resolve",
                Some("u1"),
                Some(json!({ "peerId": "u2" })),
            ),
        )
        .await;
        let thread_id = body["threadId"].as_str().unwrap().to_string();

        let (status, _) = call(
            &app,
            request(
                "GET",
                &format!("/api/threads/{thread_id}/messages"),
                Some("u3"),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn heartbeat_flips_presence() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let (status, _) = call(&app, request("POST", "/api/heartbeat", Some("u1"), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, request("GET", "/api/presence", Some("u2"), None)).await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        let online: Vec<(&str, bool)> = entries
            .iter()
            .map(|e| (e["userId"].as_str().unwrap(), e["online"].as_bool().unwrap()))
            .collect();
        assert!(online.contains(&("u1", true)));
        assert!(online.contains(&("u2", false)));
    }

    #[tokio::test]
    async fn preference_round_trip_over_the_api() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(&dir));

        let prefs = json!({
            "channels": { "inApp": true, "sound": true, "email": false },
            "dnd": { "enabled": true, "startMinute": 1320, "endMinute": 480 }
        });
        let (status, body) = call(
            &app,
            request(
                "PUT",
                "/api/settings/notifications",
                Some("u1"),
                Some(prefs.clone()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, prefs);

        let (status, body) = call(
            &app,
            request("GET", "/api/settings/notifications", Some("u1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, prefs);
    }
}
