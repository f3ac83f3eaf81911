//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Snug Ledger API",
        description = "Multi-tenant bookkeeping backend: companies, memberships, the shared ledger state document, customers and products.",
        license(name = "BUSL-1.1")
    ),
    paths(
        // Users
        crate::routes::users::get_me,
        crate::routes::users::set_role,
        // Companies
        crate::routes::companies::list_companies,
        crate::routes::companies::create_company,
        crate::routes::companies::get_company,
        crate::routes::companies::update_company,
        crate::routes::companies::delete_company,
        crate::routes::companies::list_members,
        crate::routes::companies::my_membership,
        // Ledger state
        crate::routes::ledger::read_ledger_state,
        crate::routes::ledger::write_ledger_state,
        // Records
        crate::routes::records::list_customers,
        crate::routes::records::create_customer,
        crate::routes::records::update_customer,
        crate::routes::records::delete_customer,
        crate::routes::records::list_products,
        crate::routes::records::create_product,
        crate::routes::records::update_product,
        crate::routes::records::delete_product,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // User DTOs
        crate::routes::users::UserResponse,
        crate::routes::users::SetRoleRequest,
        // Company DTOs
        crate::routes::companies::CompanyMetadata,
        crate::routes::companies::CreateCompanyRequest,
        crate::routes::companies::UpdateCompanyRequest,
        crate::routes::companies::CompanyResponse,
        crate::routes::companies::MembershipResponse,
        crate::routes::companies::DeletedResponse,
        // Ledger DTOs
        crate::routes::ledger::LedgerStateResponse,
        crate::routes::ledger::WriteLedgerStateRequest,
        crate::routes::ledger::LedgerWriteResponse,
        // Record DTOs
        crate::routes::records::CustomerRequest,
        crate::routes::records::CustomerResponse,
        crate::routes::records::ProductRequest,
        crate::routes::records::ProductResponse,
    )),
    tags(
        (name = "users", description = "Caller identity and system roles"),
        (name = "companies", description = "Company directory and membership rosters"),
        (name = "ledger", description = "Per-company ledger state document"),
        (name = "records", description = "Customers and products"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/v1/users/me",
            "/v1/users/{id}/role",
            "/v1/companies",
            "/v1/companies/{id}",
            "/v1/companies/{id}/members",
            "/v1/companies/{id}/membership",
            "/v1/companies/{id}/ledger-state",
            "/v1/customers",
            "/v1/customers/{id}",
            "/v1/products",
            "/v1/products/{id}",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "missing {expected}");
        }
    }
}
