//! Customer persistence operations on the `customers` table.

use chrono::{DateTime, Utc};
use snug_core::{CompanyId, Customer, CustomerDraft, CustomerId, CustomerKind, UserId};
use sqlx::PgConnection;

use crate::error::StateError;
use crate::records::RecordScope;

const COLUMNS: &str = "id, user_id, company_id, type, name, organization_number, email, phone, \
                       address, postal_code, city, country, created_at";

/// Insert a customer owned by `owner`.
pub async fn insert(
    conn: &mut PgConnection,
    owner: UserId,
    company: Option<CompanyId>,
    fields: &CustomerDraft,
    now: DateTime<Utc>,
) -> Result<Customer, StateError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "INSERT INTO customers (user_id, company_id, type, name, organization_number, email, phone,
                                address, postal_code, city, country, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
         RETURNING {COLUMNS}"
    ))
    .bind(owner.get())
    .bind(company.map(|c| c.get()))
    .bind(fields.kind.as_str())
    .bind(&fields.name)
    .bind(&fields.organization_number)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(&fields.postal_code)
    .bind(&fields.city)
    .bind(&fields.country)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    row.into_customer()
}

/// Fetch a customer by id.
pub async fn get(conn: &mut PgConnection, id: CustomerId) -> Result<Option<Customer>, StateError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!("SELECT {COLUMNS} FROM customers WHERE id = $1"))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(CustomerRow::into_customer).transpose()
}

/// Customers within `scope`, oldest first.
pub async fn list(conn: &mut PgConnection, scope: RecordScope) -> Result<Vec<Customer>, StateError> {
    let (column, key) = scope.filter();
    let rows = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {COLUMNS} FROM customers WHERE {column} = $1 ORDER BY created_at, id"
    ))
    .bind(key)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(CustomerRow::into_customer).collect()
}

/// Replace a customer's fields. Owner and company scope are immutable.
pub async fn update(
    conn: &mut PgConnection,
    id: CustomerId,
    fields: &CustomerDraft,
) -> Result<Option<Customer>, StateError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "UPDATE customers
         SET type = $2, name = $3, organization_number = $4, email = $5, phone = $6,
             address = $7, postal_code = $8, city = $9, country = $10
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id.get())
    .bind(fields.kind.as_str())
    .bind(&fields.name)
    .bind(&fields.organization_number)
    .bind(&fields.email)
    .bind(&fields.phone)
    .bind(&fields.address)
    .bind(&fields.postal_code)
    .bind(&fields.city)
    .bind(&fields.country)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(CustomerRow::into_customer).transpose()
}

/// Delete a customer. Returns whether a row existed.
pub async fn delete(conn: &mut PgConnection, id: CustomerId) -> Result<bool, StateError> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id.get())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    user_id: i64,
    company_id: Option<i64>,
    #[sqlx(rename = "type")]
    kind: String,
    name: String,
    organization_number: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: String,
    postal_code: String,
    city: String,
    country: String,
    created_at: DateTime<Utc>,
}

impl CustomerRow {
    fn into_customer(self) -> Result<Customer, StateError> {
        let kind = self
            .kind
            .parse::<CustomerKind>()
            .map_err(|e| StateError::Integrity(format!("customer {}: {e}", self.id)))?;
        Ok(Customer {
            id: CustomerId::new(self.id),
            user_id: UserId::new(self.user_id),
            company_id: self.company_id.map(CompanyId::new),
            fields: CustomerDraft {
                kind,
                name: self.name,
                organization_number: self.organization_number,
                email: self.email,
                phone: self.phone,
                address: self.address,
                postal_code: self.postal_code,
                city: self.city,
                country: self.country,
            },
            created_at: self.created_at,
        })
    }
}
