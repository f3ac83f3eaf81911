//! # Users API
//!
//! ## Endpoints
//!
//! - `GET /v1/users/me`: the authenticated caller
//! - `PATCH /v1/users/:id/role`: change a user's system role (requires `X-Admin-Token`)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, patch};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snug_core::{User, UserId, UserRole};
use utoipa::ToSchema;

use crate::auth::{admin_token, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// A user as returned by the API. The credential hash is never exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    /// "user" or "admin".
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.get(),
            email: user.email,
            name: user.name,
            role: user.role.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

/// Request to change a user's system role.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    /// "user" or "admin".
    pub role: String,
}

impl Validate for SetRoleRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank(&self.role, "role")
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/users/me", get(get_me))
        .route("/v1/users/:id/role", patch(set_role))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /v1/users/me: The authenticated caller.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "Caller's user record", body = UserResponse),
        (status = 401, description = "Missing or unknown caller", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn get_me(caller: CallerIdentity) -> Json<UserResponse> {
    Json(caller.user.into())
}

/// PATCH /v1/users/:id/role: Change a user's system role.
#[utoipa::path(
    patch,
    path = "/v1/users/{id}/role",
    params(("id" = i64, Path, description = "User ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserResponse),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody),
        (status = 422, description = "Unknown role", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
async fn set_role(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Result<Json<SetRoleRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let role: UserRole = req.role.trim().parse()?;
    let user = state
        .identity
        .set_role(admin_token(&headers), UserId::new(id), role)
        .await?;
    Ok(Json(user.into()))
}
