//! # Authentication
//!
//! Two independent layers:
//!
//! 1. **Service token** ([`auth_middleware`]): when `AUTH_TOKEN` is set,
//!    every `/v1` request must carry `Authorization: Bearer <token>`. The
//!    login frontend holds this token; end users never see it.
//!
//! 2. **Caller identity** ([`CallerIdentity`]): the frontend forwards the
//!    authenticated user's id in `X-User-Id`. The extractor resolves it
//!    through the identity store; a missing, malformed or unknown id is a
//!    401.
//!
//! Role changes additionally require `X-Admin-Token`, checked by the
//! identity store.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use snug_core::{User, UserId};
use snug_state::{secret_matches, StateError};

use crate::error::{AppError, ErrorBody, ErrorDetail};
use crate::state::AppState;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the shared admin token.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// The user on whose behalf a request runs.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user: User,
}

impl CallerIdentity {
    /// The caller's id.
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing X-User-Id header".into()))?;
        let id = raw
            .trim()
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| AppError::Unauthorized("malformed X-User-Id header".into()))?;

        match state.identity.resolve_user(id).await {
            Ok(user) => Ok(Self { user }),
            Err(StateError::NotFound(_)) => {
                tracing::warn!(user_id = %id, "unknown caller");
                Err(AppError::Unauthorized("unknown user".into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// The `X-Admin-Token` value, if present.
pub fn admin_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(ADMIN_TOKEN_HEADER).and_then(|v| v.to_str().ok())
}

// ── Service Token ───────────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Require the service bearer token when one is configured.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let expected = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected else {
        return next.run(request).await;
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(provided) if secret_matches(provided, &expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!("authentication failed: invalid bearer token");
            unauthorized_response("invalid bearer token")
        }
        None => {
            tracing::warn!("authentication failed: missing bearer token");
            unauthorized_response("missing bearer token")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
