use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use chatternet_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Cannot open a thread with yourself")]
    SelfThread,

    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Message text must not be empty")]
    EmptyMessage,

    #[error("Message too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("Thread not found")]
    ThreadNotFound,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Datastore unavailable: {0}")]
    TransientStore(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SelfThread => ApiError::SelfThread,
            StoreError::UnknownUser(id) => ApiError::UnknownUser(id),
            StoreError::EmptyMessage => ApiError::EmptyMessage,
            StoreError::MessageTooLong { len, max } => ApiError::TooLong { len, max },
            StoreError::NotParticipant => {
                ApiError::Forbidden("Not a participant of this thread".into())
            }
            // The only lookups these routes surface are thread lookups.
            StoreError::NotFound => ApiError::ThreadNotFound,
            StoreError::Sqlite(e) => ApiError::TransientStore(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::SelfThread | ApiError::EmptyMessage | ApiError::TooLong { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::UnknownUser(_) | ApiError::ThreadNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::TransientStore(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Datastore unavailable".to_string())
            }
            ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_the_right_variants() {
        assert!(matches!(
            ApiError::from(StoreError::SelfThread),
            ApiError::SelfThread
        ));
        assert!(matches!(
            ApiError::from(StoreError::NotFound),
            ApiError::ThreadNotFound
        ));
        assert!(matches!(
            ApiError::from(StoreError::NotParticipant),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(StoreError::MessageTooLong { len: 5000, max: 4000 }),
            ApiError::TooLong { len: 5000, max: 4000 }
        ));
    }
}
