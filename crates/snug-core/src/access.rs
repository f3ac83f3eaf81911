//! # Access Decisions
//!
//! The pure half of the access guard. Given whatever membership row the
//! storage layer found for a (company, user) pair, decide whether the
//! caller may proceed at the requested level.
//!
//! ```text
//! None                          → AccessDenied(NoMembership)
//! Some(status = REMOVED)        → AccessDenied(Inactive)
//! Some(ACTIVE, MEMBER) @ Admin  → AccessDenied(InsufficientRole)
//! Some(ACTIVE, _)      @ Member → Ok(membership)
//! Some(ACTIVE, OWNER|ADMIN)     → Ok(membership)
//! ```

use crate::error::{AccessDenied, DenialReason};
use crate::membership::Membership;

/// The privilege an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    /// Any active member (ledger read/write, company read).
    Member,
    /// Active OWNER or ADMIN (company update/delete).
    Admin,
}

/// Decide whether `membership` satisfies `level`.
pub fn authorize(membership: Option<Membership>, level: AccessLevel) -> Result<Membership, AccessDenied> {
    let membership = membership.ok_or(AccessDenied::new(DenialReason::NoMembership))?;
    if !membership.is_active() {
        return Err(AccessDenied::new(DenialReason::Inactive));
    }
    if level == AccessLevel::Admin && !membership.role.is_admin() {
        return Err(AccessDenied::new(DenialReason::InsufficientRole));
    }
    Ok(membership)
}
