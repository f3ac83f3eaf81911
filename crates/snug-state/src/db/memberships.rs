//! Membership persistence operations on the `company_members` table.
//!
//! At most one row exists per (company, user) pair, enforced by
//! `uq_company_members_company_user`.

use chrono::{DateTime, Utc};
use snug_core::{CompanyId, Membership, MembershipRole, MembershipStatus, UserId};
use sqlx::PgConnection;

use crate::error::StateError;

/// Fetch the membership of `user` in `company`, whatever its status.
pub async fn get(conn: &mut PgConnection, company: CompanyId, user: UserId) -> Result<Option<Membership>, StateError> {
    let row = sqlx::query_as::<_, MembershipRow>(
        "SELECT company_id, user_id, role, status, created_at
         FROM company_members
         WHERE company_id = $1 AND user_id = $2",
    )
    .bind(company.get())
    .bind(user.get())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(MembershipRow::into_membership).transpose()
}

/// Insert a membership row.
pub async fn insert(conn: &mut PgConnection, membership: &Membership) -> Result<Membership, StateError> {
    let row = sqlx::query_as::<_, MembershipRow>(
        "INSERT INTO company_members (company_id, user_id, role, status, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING company_id, user_id, role, status, created_at",
    )
    .bind(membership.company_id.get())
    .bind(membership.user_id.get())
    .bind(membership.role.as_str())
    .bind(membership.status.as_str())
    .bind(membership.created_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        StateError::unique_or(e, || {
            format!(
                "user {} is already a member of company {}",
                membership.user_id, membership.company_id
            )
        })
    })?;

    row.into_membership()
}

/// Every membership of a company, oldest first.
pub async fn list_for_company(conn: &mut PgConnection, company: CompanyId) -> Result<Vec<Membership>, StateError> {
    let rows = sqlx::query_as::<_, MembershipRow>(
        "SELECT company_id, user_id, role, status, created_at
         FROM company_members
         WHERE company_id = $1
         ORDER BY created_at, id",
    )
    .bind(company.get())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(MembershipRow::into_membership).collect()
}

/// Delete every membership of a company. Returns the number removed.
pub async fn delete_for_company(conn: &mut PgConnection, company: CompanyId) -> Result<u64, StateError> {
    let result = sqlx::query("DELETE FROM company_members WHERE company_id = $1")
        .bind(company.get())
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    company_id: i64,
    user_id: i64,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl MembershipRow {
    fn into_membership(self) -> Result<Membership, StateError> {
        let integrity = |e: snug_core::ValidationError| {
            StateError::Integrity(format!("membership ({}, {}): {e}", self.company_id, self.user_id))
        };
        let role = self.role.parse::<MembershipRole>().map_err(integrity)?;
        let status = self.status.parse::<MembershipStatus>().map_err(integrity)?;
        Ok(Membership {
            company_id: CompanyId::new(self.company_id),
            user_id: UserId::new(self.user_id),
            role,
            status,
            created_at: self.created_at,
        })
    }
}
