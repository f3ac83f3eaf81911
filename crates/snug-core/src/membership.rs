//! # Company Membership
//!
//! A membership binds a user to a company with a role and a status. It is
//! the only basis for authorization on company-scoped operations.
//!
//! Roles and statuses are stored as upper-case strings (`OWNER`, `ACTIVE`)
//! in the database. Parsing goes through [`std::str::FromStr`] so that an
//! unknown value read back from storage is an error instead of a silently
//! accepted string.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{CompanyId, UserId};

/// Role of a member within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipRole {
    /// Created the company. Full administrative rights.
    Owner,
    /// Administrative rights granted by an owner.
    Admin,
    /// May read and write the ledger state; no directory administration.
    Member,
}

impl MembershipRole {
    /// Return the storage representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Admin => "ADMIN",
            Self::Member => "MEMBER",
        }
    }

    /// Whether this role may administer the company record.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

impl FromStr for MembershipRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(Self::Owner),
            "ADMIN" => Ok(Self::Admin),
            "MEMBER" => Ok(Self::Member),
            other => Err(ValidationError::InvalidMembershipRole(other.to_string())),
        }
    }
}

impl std::fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    /// The membership grants access.
    Active,
    /// The member was removed; the row is kept but grants nothing.
    Removed,
}

impl MembershipStatus {
    /// Return the storage representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Removed => "REMOVED",
        }
    }
}

impl FromStr for MembershipStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "REMOVED" => Ok(Self::Removed),
            other => Err(ValidationError::InvalidMembershipStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (company, user) binding. At most one exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Company the user belongs to.
    pub company_id: CompanyId,
    /// The member.
    pub user_id: UserId,
    /// Role within the company.
    pub role: MembershipRole,
    /// Whether the membership currently grants access.
    pub status: MembershipStatus,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// The OWNER/ACTIVE membership seeded when a company is created.
    pub fn owner(company_id: CompanyId, user_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            company_id,
            user_id,
            role: MembershipRole::Owner,
            status: MembershipStatus::Active,
            created_at,
        }
    }

    /// Whether the membership currently grants access.
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}
