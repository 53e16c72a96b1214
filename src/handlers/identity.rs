//! Gated endpoints reporting who the gate let through.
//!
//! # Endpoints
//!
//! - `GET /verify` - Empty `200`, plus `X-Forwarded-User` for Basic-auth users.
//!   Meant for reverse proxies doing forward auth (nginx `auth_request`,
//!   Traefik `forwardAuth`): a `401` from here is passed back to the client.
//! - `GET /whoami` - JSON `{user, reason}`

use axum::Json;
use axum::extract::Extension;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::gate::{AuthReason, AuthenticatedUser};
use crate::models::WhoAmIResponse;

/// Header carrying the authenticated user name on `/verify`.
pub const FORWARDED_USER_HEADER: HeaderName = HeaderName::from_static("x-forwarded-user");

/// Forward-auth endpoint.
pub async fn verify(user: Option<Extension<AuthenticatedUser>>) -> Response {
    let Some(Extension(AuthenticatedUser(name))) = user else {
        return StatusCode::OK.into_response();
    };

    match HeaderValue::from_str(&name) {
        Ok(value) => (StatusCode::OK, [(FORWARDED_USER_HEADER, value)]).into_response(),
        Err(_) => {
            warn!(user = %name, "User name is not a valid header value, omitting it");
            StatusCode::OK.into_response()
        }
    }
}

pub async fn whoami(
    Extension(reason): Extension<AuthReason>,
    user: Option<Extension<AuthenticatedUser>>,
) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        user: user.map(|Extension(AuthenticatedUser(name))| name),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_verify_sets_forwarded_user() {
        let response = verify(Some(Extension(AuthenticatedUser("alice".to_string())))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[FORWARDED_USER_HEADER], "alice");
    }

    #[tokio::test]
    async fn test_verify_without_user() {
        let response = verify(None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(FORWARDED_USER_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_whoami_exception() {
        let Json(response) = whoami(Extension(AuthReason::Exception), None).await;
        assert_eq!(response.user, None);
        assert_eq!(response.reason, AuthReason::Exception);
    }
}
