//! # Service Errors
//!
//! One error type for every service in this crate. The variants follow the
//! taxonomy clients see: validation, conflict, access denied, not found,
//! unauthorized. Storage failures are carried separately so the API layer
//! can log them and answer with a redacted 500.

use snug_core::{AccessDenied, ValidationError};
use thiserror::Error;

/// Error returned by the storage layer and the services built on it.
#[derive(Error, Debug)]
pub enum StateError {
    /// Input failed domain validation. Never retried.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A uniqueness rule was violated (organization number, duplicate
    /// membership, duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's membership does not permit the operation.
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    /// A referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A shared-secret check failed.
    #[error("unauthorized")]
    Unauthorized,

    /// Stored data violates an invariant (unknown enum string, dangling
    /// reference).
    #[error("integrity error: {0}")]
    Integrity(String),

    /// The schema runner refused to proceed.
    #[error("schema error: {0}")]
    Schema(String),

    /// Database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StateError {
    /// Map a unique-constraint violation to [`StateError::Conflict`],
    /// passing every other database error through.
    pub(crate) fn unique_or(err: sqlx::Error, conflict: impl FnOnce() -> String) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(conflict()),
            _ => Self::Database(err),
        }
    }

    /// Whether the error stems from infrastructure rather than the request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Integrity(_) | Self::Schema(_) | Self::Database(_))
    }
}
