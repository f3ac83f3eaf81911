//! # Access Guard
//!
//! Resolves the caller's membership and applies [`snug_core::authorize`].
//! Every call re-reads membership state; nothing is cached.
//!
//! Refusals carry a [`snug_core::DenialReason`] that is logged at debug level
//! here and then hidden: callers only ever see the uniform
//! [`StateError::AccessDenied`].
//!
//! The services authorize inside their own transaction through `require`.
//! [`AccessGuard`] is the standalone form for callers that hold no
//! transaction; the API uses it to report the caller's own membership.

use snug_core::{authorize, AccessLevel, CompanyId, Membership, UserId};

use crate::error::StateError;
use crate::storage::{Backend, Tx};

/// Read-only authorization over the membership registry.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    backend: Backend,
}

impl AccessGuard {
    /// Create a guard over `backend`.
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Require an ACTIVE membership of `user` in `company`.
    ///
    /// An unknown company is [`StateError::NotFound`], checked before the
    /// membership.
    pub async fn check_access(&self, company: CompanyId, user: UserId) -> Result<Membership, StateError> {
        self.check(company, user, AccessLevel::Member).await
    }

    /// Require an ACTIVE OWNER or ADMIN membership of `user` in `company`.
    pub async fn check_admin(&self, company: CompanyId, user: UserId) -> Result<Membership, StateError> {
        self.check(company, user, AccessLevel::Admin).await
    }

    async fn check(&self, company: CompanyId, user: UserId, level: AccessLevel) -> Result<Membership, StateError> {
        let mut tx = self.backend.begin().await?;
        if tx.company(company).await?.is_none() {
            return Err(StateError::NotFound(format!("company {company}")));
        }
        require(&mut tx, company, user, level).await
    }
}

/// Authorize inside an open transaction.
pub(crate) async fn require(
    tx: &mut Tx,
    company: CompanyId,
    user: UserId,
    level: AccessLevel,
) -> Result<Membership, StateError> {
    let membership = tx.membership(company, user).await?;
    authorize(membership, level).map_err(|denied| {
        tracing::debug!(
            company_id = %company,
            user_id = %user,
            ?level,
            reason = denied.reason().as_str(),
            "access refused"
        );
        StateError::from(denied)
    })
}
