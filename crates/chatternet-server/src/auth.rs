//! Session principal extraction.
//!
//! Registration/login live in an external identity provider; by the time a
//! request reaches this service the fronting identity layer has resolved the
//! session and injected the stable user id as the `x-user-id` header.
//! Requests without it are rejected before any component runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use chatternet_shared::types::UserId;

use crate::error::ApiError;

/// Header carrying the caller's opaque user id.
pub const PRINCIPAL_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Principal(UserId::from(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<Principal, ApiError> {
        let (mut parts, _) = req.into_parts();
        Principal::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_header_is_unauthenticated() {
        let req = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(req).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn blank_header_is_unauthenticated() {
        let req = Request::builder()
            .header(PRINCIPAL_HEADER, "   ")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(req).await,
            Err(ApiError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn header_yields_principal() {
        let req = Request::builder()
            .header(PRINCIPAL_HEADER, "u-42")
            .body(())
            .unwrap();
        let principal = extract(req).await.unwrap();
        assert_eq!(principal.0, UserId::from("u-42"));
    }
}
