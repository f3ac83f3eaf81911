//! Product persistence operations on the `products` table.

use chrono::{DateTime, Utc};
use snug_core::{CompanyId, Product, ProductDraft, ProductId, UserId};
use sqlx::PgConnection;

use crate::error::StateError;
use crate::records::RecordScope;

const COLUMNS: &str = "id, user_id, company_id, name, description, price, includes_vat, vat_rate, unit, created_at";

/// Insert a product owned by `owner`.
pub async fn insert(
    conn: &mut PgConnection,
    owner: UserId,
    company: Option<CompanyId>,
    fields: &ProductDraft,
    now: DateTime<Utc>,
) -> Result<Product, StateError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "INSERT INTO products (user_id, company_id, name, description, price, includes_vat, vat_rate, unit, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {COLUMNS}"
    ))
    .bind(owner.get())
    .bind(company.map(|c| c.get()))
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.price)
    .bind(fields.includes_vat)
    .bind(fields.vat_rate)
    .bind(&fields.unit)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into_product())
}

/// Fetch a product by id.
pub async fn get(conn: &mut PgConnection, id: ProductId) -> Result<Option<Product>, StateError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {COLUMNS} FROM products WHERE id = $1"))
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(ProductRow::into_product))
}

/// Products within `scope`, oldest first.
pub async fn list(conn: &mut PgConnection, scope: RecordScope) -> Result<Vec<Product>, StateError> {
    let (column, key) = scope.filter();
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {COLUMNS} FROM products WHERE {column} = $1 ORDER BY created_at, id"
    ))
    .bind(key)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(ProductRow::into_product).collect())
}

/// Replace a product's fields.
pub async fn update(conn: &mut PgConnection, id: ProductId, fields: &ProductDraft) -> Result<Option<Product>, StateError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "UPDATE products
         SET name = $2, description = $3, price = $4, includes_vat = $5, vat_rate = $6, unit = $7
         WHERE id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id.get())
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(fields.price)
    .bind(fields.includes_vat)
    .bind(fields.vat_rate)
    .bind(&fields.unit)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(ProductRow::into_product))
}

/// Delete a product. Returns whether a row existed.
pub async fn delete(conn: &mut PgConnection, id: ProductId) -> Result<bool, StateError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id.get())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    user_id: i64,
    company_id: Option<i64>,
    name: String,
    description: Option<String>,
    price: f64,
    includes_vat: bool,
    vat_rate: f64,
    unit: Option<String>,
    created_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Product {
        Product {
            id: ProductId::new(self.id),
            user_id: UserId::new(self.user_id),
            company_id: self.company_id.map(CompanyId::new),
            fields: ProductDraft {
                name: self.name,
                description: self.description,
                price: self.price,
                includes_vat: self.includes_vat,
                vat_rate: self.vat_rate,
                unit: self.unit,
            },
            created_at: self.created_at,
        }
    }
}
