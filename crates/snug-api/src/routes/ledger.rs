//! # Ledger State API
//!
//! One opaque text document per company, shared by every active member.
//! Each write bumps the version by one; a company that has never been
//! written reads back as an empty snapshot with every field `null`.
//!
//! ## Endpoints
//!
//! - `GET /v1/companies/:id/ledger-state`: read the current document
//! - `PUT /v1/companies/:id/ledger-state`: replace the document

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snug_core::{CompanyId, LedgerSnapshot, LedgerWriteReceipt};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// The current ledger document of a company.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerStateResponse {
    pub company_id: i64,
    pub content: Option<String>,
    pub version: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
    /// User who made the last write.
    pub updated_by: Option<i64>,
}

impl From<LedgerSnapshot> for LedgerStateResponse {
    fn from(snapshot: LedgerSnapshot) -> Self {
        Self {
            company_id: snapshot.company_id.get(),
            content: snapshot.content,
            version: snapshot.version,
            updated_at: snapshot.updated_at,
            updated_by: snapshot.updated_by.map(|u| u.get()),
        }
    }
}

/// Request to replace the ledger document.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WriteLedgerStateRequest {
    /// Opaque serialized ledger. Stored as given.
    pub content: String,
}

/// Outcome of a write.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LedgerWriteResponse {
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<LedgerWriteReceipt> for LedgerWriteResponse {
    fn from(receipt: LedgerWriteReceipt) -> Self {
        Self {
            version: receipt.version,
            updated_at: receipt.updated_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the ledger state router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/companies/:id/ledger-state",
        get(read_ledger_state).put(write_ledger_state),
    )
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /v1/companies/:id/ledger-state: Read the company's ledger document.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}/ledger-state",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Current document, or an empty snapshot", body = LedgerStateResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    tag = "ledger"
)]
async fn read_ledger_state(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<LedgerStateResponse>, AppError> {
    let snapshot = state.ledger.read(CompanyId::new(id), caller.id()).await?;
    Ok(Json(snapshot.into()))
}

/// PUT /v1/companies/:id/ledger-state: Replace the company's ledger document.
#[utoipa::path(
    put,
    path = "/v1/companies/{id}/ledger-state",
    params(("id" = i64, Path, description = "Company ID")),
    request_body = WriteLedgerStateRequest,
    responses(
        (status = 200, description = "Document stored", body = LedgerWriteResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    tag = "ledger"
)]
async fn write_ledger_state(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<WriteLedgerStateRequest>, JsonRejection>,
) -> Result<Json<LedgerWriteResponse>, AppError> {
    let req = extract_json(body)?;
    let receipt = state
        .ledger
        .write(CompanyId::new(id), caller.id(), &req.content)
        .await?;
    Ok(Json(receipt.into()))
}
