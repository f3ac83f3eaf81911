//! Ledger-state persistence on the `company_ledger_states` table.
//!
//! The write path is one statement: an upsert keyed on `company_id` that
//! computes the next version inside the database. Two concurrent writers
//! therefore serialize on the row lock and produce consecutive versions;
//! the later one's content wins.

use chrono::{DateTime, Utc};
use snug_core::{CompanyId, LedgerState, UserId};
use sqlx::PgConnection;

use crate::error::StateError;

/// Fetch the ledger state of a company.
pub async fn get(conn: &mut PgConnection, company: CompanyId) -> Result<Option<LedgerState>, StateError> {
    let row = sqlx::query_as::<_, LedgerRow>(
        "SELECT company_id, content, version, updated_by_user_id, updated_at
         FROM company_ledger_states
         WHERE company_id = $1",
    )
    .bind(company.get())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(LedgerRow::into_state))
}

/// Create the row at version 1 or bump an existing row's version by one.
pub async fn upsert(
    conn: &mut PgConnection,
    company: CompanyId,
    content: &str,
    writer: UserId,
    now: DateTime<Utc>,
) -> Result<LedgerState, StateError> {
    let row = sqlx::query_as::<_, LedgerRow>(
        "INSERT INTO company_ledger_states (company_id, content, version, updated_by_user_id, updated_at)
         VALUES ($1, $2, 1, $3, $4)
         ON CONFLICT (company_id) DO UPDATE
         SET content = EXCLUDED.content,
             version = COALESCE(company_ledger_states.version, 0) + 1,
             updated_by_user_id = EXCLUDED.updated_by_user_id,
             updated_at = EXCLUDED.updated_at
         RETURNING company_id, content, version, updated_by_user_id, updated_at",
    )
    .bind(company.get())
    .bind(content)
    .bind(writer.get())
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into_state())
}

/// Delete the ledger state of a company. Returns whether a row existed.
pub async fn delete(conn: &mut PgConnection, company: CompanyId) -> Result<bool, StateError> {
    let result = sqlx::query("DELETE FROM company_ledger_states WHERE company_id = $1")
        .bind(company.get())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    company_id: i64,
    content: String,
    version: i64,
    updated_by_user_id: Option<i64>,
    updated_at: Option<DateTime<Utc>>,
}

impl LedgerRow {
    fn into_state(self) -> LedgerState {
        LedgerState {
            company_id: CompanyId::new(self.company_id),
            content: self.content,
            version: self.version,
            updated_by: self.updated_by_user_id.map(UserId::new),
            updated_at: self.updated_at,
        }
    }
}
