//! # Company Directory
//!
//! Company records keyed by a globally unique organization number.
//!
//! Creation and deletion are all-or-nothing:
//!
//! ```text
//! create: validate → uniqueness pre-check → insert company → seed OWNER → commit
//! delete: exists? → check_admin → delete ledger state → delete memberships
//!         → delete company → commit
//! ```
//!
//! The uniqueness pre-check gives a friendly [`StateError::Conflict`]; the
//! database constraint still backs it when two creations race.

use chrono::Utc;
use snug_core::{AccessLevel, Company, CompanyId, CompanyUpdate, NewCompany, UserId};

use crate::error::StateError;
use crate::guard;
use crate::membership;
use crate::storage::Backend;

/// Company records and their lifecycle.
#[derive(Debug, Clone)]
pub struct CompanyDirectory {
    backend: Backend,
}

impl CompanyDirectory {
    /// Create a directory over `backend`.
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Create a company with `creator` as its OWNER.
    pub async fn create(&self, new: NewCompany, creator: UserId) -> Result<Company, StateError> {
        let mut tx = self.backend.begin().await?;
        if tx
            .company_id_by_organization_number(&new.organization_number)
            .await?
            .is_some()
        {
            return Err(StateError::Conflict(format!(
                "organization number {} is already registered",
                new.organization_number
            )));
        }

        let now = Utc::now();
        let company = tx.insert_company(&new, now).await?;
        membership::create_owner_membership(&mut tx, company.id, creator, now).await?;
        tx.commit().await?;

        tracing::info!(company_id = %company.id, user_id = %creator, "company created");
        Ok(company)
    }

    /// Companies in which `user` holds an ACTIVE membership.
    pub async fn list(&self, user: UserId) -> Result<Vec<Company>, StateError> {
        let mut tx = self.backend.begin().await?;
        tx.companies_for_member(user).await
    }

    /// Fetch one company. The caller must be an active member.
    pub async fn get(&self, company: CompanyId, user: UserId) -> Result<Company, StateError> {
        let mut tx = self.backend.begin().await?;
        let found = tx
            .company(company)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("company {company}")))?;
        guard::require(&mut tx, company, user, AccessLevel::Member).await?;
        Ok(found)
    }

    /// Replace a company's name and metadata. OWNER or ADMIN only.
    pub async fn update(&self, company: CompanyId, user: UserId, update: CompanyUpdate) -> Result<Company, StateError> {
        let mut tx = self.backend.begin().await?;
        if tx.company(company).await?.is_none() {
            return Err(StateError::NotFound(format!("company {company}")));
        }
        guard::require(&mut tx, company, user, AccessLevel::Admin).await?;

        if let Some(number) = &update.organization_number {
            if matches!(tx.company_id_by_organization_number(number).await?, Some(other) if other != company) {
                return Err(StateError::Conflict(format!(
                    "organization number {number} is already registered"
                )));
            }
        }

        let updated = tx
            .update_company(company, &update)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("company {company}")))?;
        tx.commit().await?;

        tracing::info!(company_id = %company, user_id = %user, "company updated");
        Ok(updated)
    }

    /// Delete a company with its ledger state and memberships. OWNER or
    /// ADMIN only. Records scoped to the company are detached, not deleted.
    pub async fn delete(&self, company: CompanyId, user: UserId) -> Result<(), StateError> {
        let mut tx = self.backend.begin().await?;
        if tx.company(company).await?.is_none() {
            return Err(StateError::NotFound(format!("company {company}")));
        }
        guard::require(&mut tx, company, user, AccessLevel::Admin).await?;

        let had_ledger = tx.delete_ledger_state(company).await?;
        let members = membership::remove_all_for_company(&mut tx, company).await?;
        tx.delete_company(company).await?;
        tx.commit().await?;

        tracing::info!(company_id = %company, user_id = %user, members, had_ledger, "company deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use snug_core::{CompanyProfile, NewUser};

    use super::*;

    async fn user(backend: &Backend, email: &str) -> UserId {
        let mut tx = backend.begin().await.unwrap();
        let u = tx
            .insert_user(&NewUser::new(email, "h", None).unwrap(), Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        u.id
    }

    fn acme(org: &str) -> NewCompany {
        NewCompany::new("Acme", org, CompanyProfile::default()).unwrap()
    }

    #[tokio::test]
    async fn create_seeds_owner_membership() {
        let backend = Backend::memory();
        let owner = user(&backend, "o@example.se").await;
        let directory = CompanyDirectory::new(backend.clone());

        let company = directory.create(acme("556-001"), owner).await.unwrap();

        let mut tx = backend.begin().await.unwrap();
        let m = tx.membership(company.id, owner).await.unwrap().unwrap();
        assert_eq!(m.role, snug_core::MembershipRole::Owner);
        assert!(m.is_active());
    }

    #[tokio::test]
    async fn duplicate_organization_number_conflicts_and_creates_nothing() {
        let backend = Backend::memory();
        let a = user(&backend, "a@example.se").await;
        let b = user(&backend, "b@example.se").await;
        let directory = CompanyDirectory::new(backend.clone());

        directory.create(acme("556-001"), a).await.unwrap();
        let err = directory.create(acme("556-001"), b).await.unwrap_err();
        assert!(matches!(err, StateError::Conflict(_)));
        assert!(directory.list(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_owner_seed_rolls_back_company() {
        let backend = Backend::memory();
        let directory = CompanyDirectory::new(backend.clone());

        // The creator does not exist, so the membership insert fails.
        let err = directory.create(acme("556-001"), UserId::new(404)).await.unwrap_err();
        assert!(matches!(err, StateError::Integrity(_)));

        let mut tx = backend.begin().await.unwrap();
        let number = snug_core::OrganizationNumber::new("556-001").unwrap();
        assert!(tx.company_id_by_organization_number(&number).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_only_returns_active_memberships() {
        let backend = Backend::memory();
        let a = user(&backend, "a@example.se").await;
        let b = user(&backend, "b@example.se").await;
        let directory = CompanyDirectory::new(backend);

        let first = directory.create(acme("556-001"), a).await.unwrap();
        directory.create(acme("556-002"), b).await.unwrap();

        let listed = directory.list(a).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.id);
    }

    #[tokio::test]
    async fn update_keeps_number_when_omitted_and_rejects_collisions() {
        let backend = Backend::memory();
        let owner = user(&backend, "o@example.se").await;
        let directory = CompanyDirectory::new(backend);
        let first = directory.create(acme("556-001"), owner).await.unwrap();
        directory.create(acme("556-002"), owner).await.unwrap();

        let renamed = directory
            .update(first.id, owner, CompanyUpdate::new("Acme Holding", None, CompanyProfile::default()).unwrap())
            .await
            .unwrap();
        assert_eq!(renamed.name, "Acme Holding");
        assert_eq!(renamed.organization_number.unwrap().as_str(), "556-001");

        let err = directory
            .update(first.id, owner, CompanyUpdate::new("Acme", Some("556-002"), CompanyProfile::default()).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::Conflict(_)));

        // Re-submitting its own number is not a collision.
        directory
            .update(first.id, owner, CompanyUpdate::new("Acme", Some("556-001"), CompanyProfile::default()).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_admin_cannot_update_or_delete() {
        let backend = Backend::memory();
        let owner = user(&backend, "o@example.se").await;
        let member = user(&backend, "m@example.se").await;
        let directory = CompanyDirectory::new(backend.clone());
        let company = directory.create(acme("556-001"), owner).await.unwrap();

        let mut tx = backend.begin().await.unwrap();
        tx.insert_membership(&snug_core::Membership {
            role: snug_core::MembershipRole::Member,
            ..snug_core::Membership::owner(company.id, member, Utc::now())
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let update = CompanyUpdate::new("Hijacked", None, CompanyProfile::default()).unwrap();
        assert!(matches!(
            directory.update(company.id, member, update).await,
            Err(StateError::AccessDenied(_))
        ));
        assert!(matches!(
            directory.delete(company.id, member).await,
            Err(StateError::AccessDenied(_))
        ));
        assert!(directory.get(company.id, member).await.is_ok());
    }

    #[tokio::test]
    async fn missing_company_is_not_found_before_access_check() {
        let backend = Backend::memory();
        let stranger = user(&backend, "s@example.se").await;
        let directory = CompanyDirectory::new(backend);
        assert!(matches!(
            directory.delete(CompanyId::new(404), stranger).await,
            Err(StateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_memberships_and_company() {
        let backend = Backend::memory();
        let owner = user(&backend, "o@example.se").await;
        let directory = CompanyDirectory::new(backend.clone());
        let company = directory.create(acme("556-001"), owner).await.unwrap();

        let mut tx = backend.begin().await.unwrap();
        tx.upsert_ledger_state(company.id, "#SIE", owner, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        directory.delete(company.id, owner).await.unwrap();

        let mut tx = backend.begin().await.unwrap();
        assert!(tx.company(company.id).await.unwrap().is_none());
        assert!(tx.membership(company.id, owner).await.unwrap().is_none());
        assert!(tx.ledger_state(company.id).await.unwrap().is_none());
        drop(tx);

        // The organization number is free again.
        directory.create(acme("556-001"), owner).await.unwrap();
    }
}
