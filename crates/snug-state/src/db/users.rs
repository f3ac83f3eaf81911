//! User persistence operations on the `users` table.

use chrono::{DateTime, Utc};
use snug_core::{NewUser, User, UserId, UserRole};
use sqlx::PgConnection;

use crate::error::StateError;

/// Fetch a user by id.
pub async fn get_by_id(conn: &mut PgConnection, id: UserId) -> Result<Option<User>, StateError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, email, credential_hash, role, name, created_at FROM users WHERE id = $1",
    )
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(UserRow::into_user).transpose()
}

/// Insert a new user with the `user` role.
pub async fn insert(conn: &mut PgConnection, new: &NewUser, now: DateTime<Utc>) -> Result<User, StateError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (email, credential_hash, role, name, created_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, email, credential_hash, role, name, created_at",
    )
    .bind(&new.email)
    .bind(&new.credential_hash)
    .bind(UserRole::User.as_str())
    .bind(&new.name)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| StateError::unique_or(e, || format!("email {} is already registered", new.email)))?;

    row.into_user()
}

/// Change a user's system role. Returns `None` if the user does not exist.
pub async fn set_role(conn: &mut PgConnection, id: UserId, role: UserRole) -> Result<Option<User>, StateError> {
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET role = $1 WHERE id = $2
         RETURNING id, email, credential_hash, role, name, created_at",
    )
    .bind(role.as_str())
    .bind(id.get())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(UserRow::into_user).transpose()
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    credential_hash: String,
    role: String,
    name: Option<String>,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, StateError> {
        let role = self
            .role
            .parse::<UserRole>()
            .map_err(|e| StateError::Integrity(format!("user {}: {e}", self.id)))?;
        Ok(User {
            id: UserId::new(self.id),
            email: self.email,
            credential_hash: self.credential_hash,
            role,
            name: self.name,
            created_at: self.created_at,
        })
    }
}
