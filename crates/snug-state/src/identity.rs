//! # Identity Store
//!
//! User records. Login and password hashing are handled by the external
//! identity service, which registers users here with an opaque credential
//! hash. The only mutation after registration is the system role, and it
//! requires the shared admin token.

use chrono::Utc;
use snug_core::{NewUser, User, UserId, UserRole};
use subtle::ConstantTimeEq;

use crate::error::StateError;
use crate::storage::Backend;

/// Compare a presented secret against the configured one in constant time.
pub fn secret_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Dummy comparison to keep timing constant regardless of length match.
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// User lookup and administration.
#[derive(Clone)]
pub struct IdentityStore {
    backend: Backend,
    admin_token: Option<String>,
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("backend", &self.backend.kind())
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl IdentityStore {
    /// Create a store. Without an admin token, role changes are refused.
    pub fn new(backend: Backend, admin_token: Option<String>) -> Self {
        Self { backend, admin_token }
    }

    /// Look up a user by id.
    pub async fn resolve_user(&self, id: UserId) -> Result<User, StateError> {
        let mut tx = self.backend.begin().await?;
        tx.user(id)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("user {id}")))
    }

    /// Register a user with the `user` role.
    pub async fn register(&self, new: NewUser) -> Result<User, StateError> {
        let mut tx = self.backend.begin().await?;
        let user = tx.insert_user(&new, Utc::now()).await?;
        tx.commit().await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Change a user's system role.
    ///
    /// Fails with [`StateError::Unauthorized`] unless `presented` matches
    /// the configured admin token.
    pub async fn set_role(&self, presented: Option<&str>, id: UserId, role: UserRole) -> Result<User, StateError> {
        let authorized = match (&self.admin_token, presented) {
            (Some(expected), Some(presented)) => secret_matches(presented, expected),
            _ => false,
        };
        if !authorized {
            tracing::warn!(user_id = %id, "role change refused: bad admin token");
            return Err(StateError::Unauthorized);
        }

        let mut tx = self.backend.begin().await?;
        let user = tx
            .set_user_role(id, role)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("user {id}")))?;
        tx.commit().await?;
        tracing::info!(user_id = %id, %role, "user role changed");
        Ok(user)
    }
}
