//! # Customer & Product Records API
//!
//! Billing records owned by the creating user and optionally shared with a
//! company. A record is visible to its owner and, when company-scoped, to
//! every active member of that company.
//!
//! ## Endpoints
//!
//! - `GET /v1/customers?company_id=`: list customers
//! - `POST /v1/customers`: create customer
//! - `PUT /v1/customers/:id`: replace customer
//! - `DELETE /v1/customers/:id`: delete customer
//! - `GET /v1/products?company_id=`: list products
//! - `POST /v1/products`: create product
//! - `PUT /v1/products/:id`: replace product
//! - `DELETE /v1/products/:id`: delete product

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snug_core::{CompanyId, Customer, CustomerDraft, CustomerId, CustomerKind, Product, ProductDraft, ProductId};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, require_non_blank, Validate};
use crate::routes::companies::DeletedResponse;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Optional company filter for list endpoints.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScopeQuery {
    /// Only records shared with this company. Omit for the caller's own records.
    pub company_id: Option<i64>,
}

/// Request body for creating or replacing a customer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerRequest {
    /// "private" or "company".
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub organization_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    /// Company to share the customer with. Ignored on update.
    pub company_id: Option<i64>,
}

impl Validate for CustomerRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank(&self.name, "name")?;
        require_non_blank(&self.address, "address")?;
        require_non_blank(&self.postal_code, "postal_code")?;
        require_non_blank(&self.city, "city")?;
        require_non_blank(&self.country, "country")
    }
}

impl CustomerRequest {
    fn into_parts(self) -> Result<(Option<CompanyId>, CustomerDraft), AppError> {
        let kind: CustomerKind = self.kind.trim().parse()?;
        let draft = CustomerDraft {
            kind,
            name: self.name,
            organization_number: self.organization_number,
            email: self.email,
            phone: self.phone,
            address: self.address,
            postal_code: self.postal_code,
            city: self.city,
            country: self.country,
        };
        Ok((self.company_id.map(CompanyId::new), draft))
    }
}

/// A customer as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    pub id: i64,
    pub user_id: i64,
    pub company_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub organization_number: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        let f = c.fields;
        Self {
            id: c.id.get(),
            user_id: c.user_id.get(),
            company_id: c.company_id.map(|id| id.get()),
            kind: f.kind.as_str().to_string(),
            name: f.name,
            organization_number: f.organization_number,
            email: f.email,
            phone: f.phone,
            address: f.address,
            postal_code: f.postal_code,
            city: f.city,
            country: f.country,
            created_at: c.created_at,
        }
    }
}

/// Request body for creating or replacing a product.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    /// Whether `price` already includes VAT.
    #[serde(default)]
    pub includes_vat: bool,
    /// VAT rate in percent.
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    /// Unit label, e.g. "st" or "tim".
    pub unit: Option<String>,
    /// Company to share the product with. Ignored on update.
    pub company_id: Option<i64>,
}

fn default_vat_rate() -> f64 {
    25.0
}

impl Validate for ProductRequest {
    fn validate(&self) -> Result<(), String> {
        require_non_blank(&self.name, "name")
    }
}

impl ProductRequest {
    fn into_parts(self) -> (Option<CompanyId>, ProductDraft) {
        let draft = ProductDraft {
            name: self.name,
            description: self.description,
            price: self.price,
            includes_vat: self.includes_vat,
            vat_rate: self.vat_rate,
            unit: self.unit,
        };
        (self.company_id.map(CompanyId::new), draft)
    }
}

/// A product as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub user_id: i64,
    pub company_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub includes_vat: bool,
    pub vat_rate: f64,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        let f = p.fields;
        Self {
            id: p.id.get(),
            user_id: p.user_id.get(),
            company_id: p.company_id.map(|id| id.get()),
            name: f.name,
            description: f.description,
            price: f.price,
            includes_vat: f.includes_vat,
            vat_rate: f.vat_rate,
            unit: f.unit,
            created_at: p.created_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the customers and products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/customers", get(list_customers).post(create_customer))
        .route("/v1/customers/:id", put(update_customer).delete(delete_customer))
        .route("/v1/products", get(list_products).post(create_product))
        .route("/v1/products/:id", put(update_product).delete(delete_product))
}

// ── Customer Handlers ───────────────────────────────────────────────

/// GET /v1/customers: List customers, oldest first.
#[utoipa::path(
    get,
    path = "/v1/customers",
    params(ScopeQuery),
    responses(
        (status = 200, description = "Customers in scope", body = Vec<CustomerResponse>),
        (status = 403, description = "Not a member of the requested company", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn list_customers(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let customers = state
        .records
        .list_customers(caller.id(), scope.company_id.map(CompanyId::new))
        .await?;
    Ok(Json(customers.into_iter().map(CustomerResponse::from).collect()))
}

/// POST /v1/customers: Create a customer.
#[utoipa::path(
    post,
    path = "/v1/customers",
    request_body = CustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = CustomerResponse),
        (status = 403, description = "Not a member of the given company", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn create_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CustomerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    let (company, draft) = extract_validated_json(body)?.into_parts()?;
    let customer = state.records.create_customer(caller.id(), company, draft).await?;
    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// PUT /v1/customers/:id: Replace a customer's fields.
#[utoipa::path(
    put,
    path = "/v1/customers/{id}",
    params(("id" = i64, Path, description = "Customer ID")),
    request_body = CustomerRequest,
    responses(
        (status = 200, description = "Customer updated", body = CustomerResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Customer not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn update_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<CustomerRequest>, JsonRejection>,
) -> Result<Json<CustomerResponse>, AppError> {
    let (_, draft) = extract_validated_json(body)?.into_parts()?;
    let customer = state
        .records
        .update_customer(caller.id(), CustomerId::new(id), draft)
        .await?;
    Ok(Json(customer.into()))
}

/// DELETE /v1/customers/:id: Delete a customer.
#[utoipa::path(
    delete,
    path = "/v1/customers/{id}",
    params(("id" = i64, Path, description = "Customer ID")),
    responses(
        (status = 200, description = "Customer deleted", body = DeletedResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Customer not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn delete_customer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.records.delete_customer(caller.id(), CustomerId::new(id)).await?;
    Ok(Json(DeletedResponse { ok: true }))
}

// ── Product Handlers ────────────────────────────────────────────────

/// GET /v1/products: List products, oldest first.
#[utoipa::path(
    get,
    path = "/v1/products",
    params(ScopeQuery),
    responses(
        (status = 200, description = "Products in scope", body = Vec<ProductResponse>),
        (status = 403, description = "Not a member of the requested company", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn list_products(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<ProductResponse>>, AppError> {
    let products = state
        .records
        .list_products(caller.id(), scope.company_id.map(CompanyId::new))
        .await?;
    Ok(Json(products.into_iter().map(ProductResponse::from).collect()))
}

/// POST /v1/products: Create a product.
#[utoipa::path(
    post,
    path = "/v1/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 403, description = "Not a member of the given company", body = crate::error::ErrorBody),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn create_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let (company, draft) = extract_validated_json(body)?.into_parts();
    let product = state.records.create_product(caller.id(), company, draft).await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /v1/products/:id: Replace a product's fields.
#[utoipa::path(
    put,
    path = "/v1/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn update_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, AppError> {
    let (_, draft) = extract_validated_json(body)?.into_parts();
    let product = state
        .records
        .update_product(caller.id(), ProductId::new(id), draft)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /v1/products/:id: Delete a product.
#[utoipa::path(
    delete,
    path = "/v1/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = DeletedResponse),
        (status = 403, description = "Access denied", body = crate::error::ErrorBody),
        (status = 404, description = "Product not found", body = crate::error::ErrorBody),
    ),
    tag = "records"
)]
async fn delete_product(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    state.records.delete_product(caller.id(), ProductId::new(id)).await?;
    Ok(Json(DeletedResponse { ok: true }))
}
