//! # Membership Registry
//!
//! Maps (company, user) pairs to a role and status. The registry has no
//! invite or role-change operations: the only writes are the OWNER seed at
//! company creation and the bulk removal at company deletion, and both run
//! inside the directory's transaction.

use chrono::{DateTime, Utc};
use snug_core::{AccessLevel, CompanyId, Membership, UserId};

use crate::error::StateError;
use crate::guard;
use crate::storage::{Backend, Tx};

/// Insert the OWNER/ACTIVE membership of a freshly created company.
///
/// A pre-existing row for the pair is a [`StateError::Conflict`]; the
/// caller's transaction then rolls back.
pub(crate) async fn create_owner_membership(
    tx: &mut Tx,
    company: CompanyId,
    user: UserId,
    now: DateTime<Utc>,
) -> Result<Membership, StateError> {
    tx.insert_membership(&Membership::owner(company, user, now)).await
}

/// Delete every membership of `company`. Runs before the company row delete.
pub(crate) async fn remove_all_for_company(tx: &mut Tx, company: CompanyId) -> Result<u64, StateError> {
    tx.delete_memberships_for_company(company).await
}

/// Read access to the member roster.
#[derive(Debug, Clone)]
pub struct MembershipRegistry {
    backend: Backend,
}

impl MembershipRegistry {
    /// Create a registry over `backend`.
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// List every membership of `company`, removed ones included.
    ///
    /// The caller must be an active member.
    pub async fn list_for_company(&self, company: CompanyId, caller: UserId) -> Result<Vec<Membership>, StateError> {
        let mut tx = self.backend.begin().await?;
        if tx.company(company).await?.is_none() {
            return Err(StateError::NotFound(format!("company {company}")));
        }
        guard::require(&mut tx, company, caller, AccessLevel::Member).await?;
        tx.memberships_for_company(company).await
    }
}
