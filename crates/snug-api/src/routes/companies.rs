//! # Company Directory API
//!
//! Company lifecycle and membership rosters. Every company-scoped endpoint
//! answers 404 for an unknown company before it checks the caller's
//! membership, and 403 with a uniform body when the membership is missing,
//! inactive or lacks the required role.
//!
//! ## Endpoints
//!
//! - `GET /v1/companies`: companies the caller is an active member of
//! - `POST /v1/companies`: create a company; the caller becomes OWNER
//! - `GET /v1/companies/:id`: get company
//! - `PUT /v1/companies/:id`: update company (OWNER or ADMIN)
//! - `DELETE /v1/companies/:id`: delete company with its ledger state and memberships (OWNER or ADMIN)
//! - `GET /v1/companies/:id/members`: membership roster
//! - `GET /v1/companies/:id/membership`: the caller's own active membership

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snug_core::{
    AccountingStandard, Company, CompanyId, CompanyProfile, CompanyUpdate, Membership, NewCompany,
};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Address and accounting metadata shared by create and update.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CompanyMetadata {
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
    /// First day of the fiscal year (`MM-DD` or `YYYY-MM-DD`).
    pub fiscal_year_start: Option<String>,
    /// Last day of the fiscal year.
    pub fiscal_year_end: Option<String>,
    /// "K2" or "K3".
    pub accounting_standard: Option<String>,
}

impl CompanyMetadata {
    fn into_profile(self) -> Result<CompanyProfile, AppError> {
        let accounting_standard = match self.accounting_standard.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<AccountingStandard>()?),
        };
        Ok(CompanyProfile {
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            country: self.country,
            vat_number: self.vat_number,
            fiscal_year_start: self.fiscal_year_start,
            fiscal_year_end: self.fiscal_year_end,
            accounting_standard,
        })
    }
}

/// Request to create a company.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    pub name: String,
    /// Externally issued business identifier. Globally unique.
    pub organization_number: String,
    #[serde(flatten)]
    pub metadata: CompanyMetadata,
}

impl Validate for CreateCompanyRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank(&self.name, "name")?;
        require_non_blank(&self.organization_number, "organization_number")
    }
}

/// Request to replace a company's name and metadata.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCompanyRequest {
    pub name: String,
    /// Omit to keep the current number.
    pub organization_number: Option<String>,
    #[serde(flatten)]
    pub metadata: CompanyMetadata,
}

impl Validate for UpdateCompanyRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank(&self.name, "name")?;
        if let Some(ref number) = self.organization_number {
            require_non_blank(number, "organization_number")?;
        }
        Ok(())
    }
}

/// A company as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompanyResponse {
    pub company_id: i64,
    pub name: String,
    pub organization_number: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
    pub fiscal_year_start: Option<String>,
    pub fiscal_year_end: Option<String>,
    pub accounting_standard: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Company> for CompanyResponse {
    fn from(company: Company) -> Self {
        let profile = company.profile;
        Self {
            company_id: company.id.get(),
            name: company.name,
            organization_number: company.organization_number.map(String::from),
            address: profile.address,
            postal_code: profile.postal_code,
            city: profile.city,
            country: profile.country,
            vat_number: profile.vat_number,
            fiscal_year_start: profile.fiscal_year_start,
            fiscal_year_end: profile.fiscal_year_end,
            accounting_standard: profile.accounting_standard.map(|s| s.as_str().to_string()),
            created_at: company.created_at,
        }
    }
}

/// One entry of a company's membership roster.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MembershipResponse {
    pub company_id: i64,
    pub user_id: i64,
    /// "OWNER", "ADMIN" or "MEMBER".
    pub role: String,
    /// "ACTIVE" or "REMOVED".
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Membership> for MembershipResponse {
    fn from(m: Membership) -> Self {
        Self {
            company_id: m.company_id.get(),
            user_id: m.user_id.get(),
            role: m.role.as_str().to_string(),
            status: m.status.as_str().to_string(),
            created_at: m.created_at,
        }
    }
}

/// Acknowledgement of a deletion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub ok: bool,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the companies router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/companies", get(list_companies).post(create_company))
        .route(
            "/v1/companies/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
        .route("/v1/companies/:id/members", get(list_members))
        .route("/v1/companies/:id/membership", get(my_membership))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /v1/companies: Companies the caller belongs to.
#[utoipa::path(
    get,
    path = "/v1/companies",
    responses(
        (status = 200, description = "Companies with an active membership", body = Vec<CompanyResponse>),
        (status = 401, description = "Missing or unknown caller", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn list_companies(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<CompanyResponse>>, AppError> {
    let companies = state.directory.list(caller.id()).await?;
    Ok(Json(companies.into_iter().map(CompanyResponse::from).collect()))
}

/// POST /v1/companies: Create a company owned by the caller.
#[utoipa::path(
    post,
    path = "/v1/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CompanyResponse),
        (status = 409, description = "Organization number already registered", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn create_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CompanyResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let new = NewCompany::new(&req.name, &req.organization_number, req.metadata.into_profile()?)?;
    let company = state.directory.create(new, caller.id()).await?;
    Ok((StatusCode::CREATED, Json(company.into())))
}

/// GET /v1/companies/:id: Get one company.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company found", body = CompanyResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn get_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<CompanyResponse>, AppError> {
    let company = state.directory.get(CompanyId::new(id), caller.id()).await?;
    Ok(Json(company.into()))
}

/// PUT /v1/companies/:id: Replace a company's name and metadata.
#[utoipa::path(
    put,
    path = "/v1/companies/{id}",
    params(("id" = i64, Path, description = "Company ID")),
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = CompanyResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
        (status = 409, description = "Organization number taken by another company", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn update_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<UpdateCompanyRequest>, JsonRejection>,
) -> Result<Json<CompanyResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let update = CompanyUpdate::new(
        &req.name,
        req.organization_number.as_deref(),
        req.metadata.into_profile()?,
    )?;
    let company = state
        .directory
        .update(CompanyId::new(id), caller.id(), update)
        .await?;
    Ok(Json(company.into()))
}

/// DELETE /v1/companies/:id: Delete a company and everything it owns.
#[utoipa::path(
    delete,
    path = "/v1/companies/{id}",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company deleted", body = DeletedResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn delete_company(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.directory.delete(CompanyId::new(id), caller.id()).await?;
    Ok(Json(DeletedResponse { ok: true }))
}

/// GET /v1/companies/:id/members: Membership roster, removed members included.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}/members",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Membership roster", body = Vec<MembershipResponse>),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn list_members(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MembershipResponse>>, AppError> {
    let members = state
        .memberships
        .list_for_company(CompanyId::new(id), caller.id())
        .await?;
    Ok(Json(members.into_iter().map(MembershipResponse::from).collect()))
}

/// GET /v1/companies/:id/membership: The caller's own active membership.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}/membership",
    params(("id" = i64, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Caller's membership", body = MembershipResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Company not found", body = crate::error::ErrorBody),
    ),
    tag = "companies"
)]
async fn my_membership(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<MembershipResponse>, AppError> {
    let membership = state.guard.check_access(CompanyId::new(id), caller.id()).await?;
    Ok(Json(membership.into()))
}
