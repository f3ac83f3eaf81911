//! # Users
//!
//! User records as the identity store exposes them. Password handling
//! lives with the identity service; this crate only carries the opaque
//! credential hash it stores.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::company::{optional_text, required_text};
use crate::error::ValidationError;
use crate::identity::UserId;

/// System-wide role of a user (not to be confused with membership roles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular account.
    User,
    /// Operator account.
    Admin,
}

impl UserRole {
    /// Return the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::InvalidUserRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user record.
///
/// `Debug` redacts the credential hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Login email, unique.
    pub email: String,
    /// Opaque credential hash produced by the identity service.
    #[serde(skip_serializing)]
    pub credential_hash: String,
    /// System role.
    pub role: UserRole,
    /// Display name.
    pub name: Option<String>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("credential_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("name", &self.name)
            .finish()
    }
}

/// A validated registration.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Normalized (trimmed, lower-cased) email.
    pub email: String,
    /// Opaque credential hash.
    pub credential_hash: String,
    /// Display name.
    pub name: Option<String>,
}

impl NewUser {
    /// Validate a registration. New users always get [`UserRole::User`].
    pub fn new(email: &str, credential_hash: &str, name: Option<&str>) -> Result<Self, ValidationError> {
        let email = required_text(email, "email", 255)?.to_lowercase();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(ValidationError::InvalidEmail(email)),
        }
        Ok(Self {
            email,
            credential_hash: required_text(credential_hash, "credential_hash", 255)?,
            name: optional_text(name, "name", 255)?,
        })
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("credential_hash", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let user = NewUser::new(" Anna@Example.SE ", "$2b$12$hash", Some("Anna")).unwrap();
        assert_eq!(user.email, "anna@example.se");
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(matches!(
            NewUser::new("not-an-email", "h", None),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            NewUser::new("@example.se", "h", None),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn debug_redacts_credential_hash() {
        let user = NewUser::new("a@b.se", "super-secret-hash", None).unwrap();
        let dbg = format!("{user:?}");
        assert!(!dbg.contains("super-secret-hash"));
        assert!(dbg.contains("[REDACTED]"));
    }

    #[test]
    fn user_role_parses_lowercase_only() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert!("ADMIN".parse::<UserRole>().is_err());
    }
}
