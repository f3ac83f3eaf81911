//! Company persistence operations on the `companies` table.
//!
//! Organization-number uniqueness is enforced by the
//! `uq_companies_organization_number` constraint; a violation surfaces as
//! [`StateError::Conflict`].

use chrono::{DateTime, Utc};
use snug_core::{AccountingStandard, Company, CompanyId, CompanyProfile, CompanyUpdate, NewCompany, OrganizationNumber, UserId};
use sqlx::PgConnection;

use crate::error::StateError;

const COLUMNS: &str = "c.id, c.name, c.organization_number, c.address, c.postal_code, c.city, c.country, \
                       c.vat_number, c.fiscal_year_start, c.fiscal_year_end, c.accounting_standard, c.created_at";

/// Fetch a company by id.
pub async fn get_by_id(conn: &mut PgConnection, id: CompanyId) -> Result<Option<Company>, StateError> {
    let row = sqlx::query_as::<_, CompanyRow>(&format!("SELECT {COLUMNS} FROM companies c WHERE c.id = $1"))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(CompanyRow::into_company).transpose()
}

/// Find the company holding an organization number.
pub async fn id_by_organization_number(
    conn: &mut PgConnection,
    number: &OrganizationNumber,
) -> Result<Option<CompanyId>, StateError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM companies WHERE organization_number = $1")
        .bind(number.as_str())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(id.map(CompanyId::new))
}

/// Insert a company row.
pub async fn insert(conn: &mut PgConnection, new: &NewCompany, now: DateTime<Utc>) -> Result<Company, StateError> {
    let p = &new.profile;
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "INSERT INTO companies AS c (name, organization_number, address, postal_code, city, country,
                                     vat_number, fiscal_year_start, fiscal_year_end, accounting_standard, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {COLUMNS}"
    ))
    .bind(&new.name)
    .bind(new.organization_number.as_str())
    .bind(&p.address)
    .bind(&p.postal_code)
    .bind(&p.city)
    .bind(&p.country)
    .bind(&p.vat_number)
    .bind(&p.fiscal_year_start)
    .bind(&p.fiscal_year_end)
    .bind(p.accounting_standard.map(|s| s.as_str()))
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        StateError::unique_or(e, || {
            format!("organization number {} is already registered", new.organization_number)
        })
    })?;

    row.into_company()
}

/// Replace a company's mutable fields. `None` keeps the organization number.
pub async fn update(
    conn: &mut PgConnection,
    id: CompanyId,
    update: &CompanyUpdate,
) -> Result<Option<Company>, StateError> {
    let p = &update.profile;
    let row = sqlx::query_as::<_, CompanyRow>(&format!(
        "UPDATE companies AS c
         SET name = $2,
             organization_number = COALESCE($3, c.organization_number),
             address = $4, postal_code = $5, city = $6, country = $7,
             vat_number = $8, fiscal_year_start = $9, fiscal_year_end = $10,
             accounting_standard = $11
         WHERE c.id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id.get())
    .bind(&update.name)
    .bind(update.organization_number.as_ref().map(|n| n.as_str()))
    .bind(&p.address)
    .bind(&p.postal_code)
    .bind(&p.city)
    .bind(&p.country)
    .bind(&p.vat_number)
    .bind(&p.fiscal_year_start)
    .bind(&p.fiscal_year_end)
    .bind(p.accounting_standard.map(|s| s.as_str()))
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| StateError::unique_or(e, || "organization number is already registered".to_string()))?;

    row.map(CompanyRow::into_company).transpose()
}

/// Delete a company row. Memberships and the ledger state must be gone.
pub async fn delete(conn: &mut PgConnection, id: CompanyId) -> Result<bool, StateError> {
    let result = sqlx::query("DELETE FROM companies WHERE id = $1")
        .bind(id.get())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Companies in which `user` holds an ACTIVE membership.
pub async fn list_for_member(conn: &mut PgConnection, user: UserId) -> Result<Vec<Company>, StateError> {
    let rows = sqlx::query_as::<_, CompanyRow>(&format!(
        "SELECT {COLUMNS}
         FROM companies c
         JOIN company_members m ON m.company_id = c.id
         WHERE m.user_id = $1 AND m.status = 'ACTIVE'
         ORDER BY c.id"
    ))
    .bind(user.get())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(CompanyRow::into_company).collect()
}

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: i64,
    name: String,
    organization_number: Option<String>,
    address: Option<String>,
    postal_code: Option<String>,
    city: Option<String>,
    country: Option<String>,
    vat_number: Option<String>,
    fiscal_year_start: Option<String>,
    fiscal_year_end: Option<String>,
    accounting_standard: Option<String>,
    created_at: DateTime<Utc>,
}

impl CompanyRow {
    fn into_company(self) -> Result<Company, StateError> {
        let id = self.id;
        let integrity = |e: snug_core::ValidationError| StateError::Integrity(format!("company {id}: {e}"));

        // Legacy rows may carry a blank number; treat it as absent.
        let organization_number = self
            .organization_number
            .filter(|n| !n.trim().is_empty())
            .map(OrganizationNumber::new)
            .transpose()
            .map_err(integrity)?;
        let accounting_standard = self
            .accounting_standard
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<AccountingStandard>())
            .transpose()
            .map_err(integrity)?;

        Ok(Company {
            id: CompanyId::new(id),
            name: self.name,
            organization_number,
            profile: CompanyProfile {
                address: self.address,
                postal_code: self.postal_code,
                city: self.city,
                country: self.country,
                vat_number: self.vat_number,
                fiscal_year_start: self.fiscal_year_start,
                fiscal_year_end: self.fiscal_year_end,
                accounting_standard,
            },
            created_at: self.created_at,
        })
    }
}
