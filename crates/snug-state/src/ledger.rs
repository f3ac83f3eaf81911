//! # Ledger State Store
//!
//! One shared, versioned document per company. Any active member may read
//! and overwrite it; the admin role is not needed.
//!
//! Writes are unconditional: there is no compare against a version the
//! client last saw. Versions still never collide, because the version bump
//! happens inside a single upsert statement keyed on the company. Two
//! writers racing from version 2 end at version 4, and the content of
//! whichever committed last is kept.

use chrono::Utc;
use snug_core::{AccessLevel, CompanyId, LedgerSnapshot, LedgerWriteReceipt, UserId};

use crate::error::StateError;
use crate::guard;
use crate::storage::{Backend, Tx};

/// Read/write access to company ledger states.
#[derive(Debug, Clone)]
pub struct LedgerStateStore {
    backend: Backend,
}

impl LedgerStateStore {
    /// Create a store over `backend`.
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Read the ledger state of `company`.
    ///
    /// A company that never wrote one yields [`LedgerSnapshot::empty`].
    pub async fn read(&self, company: CompanyId, user: UserId) -> Result<LedgerSnapshot, StateError> {
        let mut tx = self.backend.begin().await?;
        authorize(&mut tx, company, user).await?;
        let snapshot = tx
            .ledger_state(company)
            .await?
            .map_or_else(|| LedgerSnapshot::empty(company), LedgerSnapshot::from);
        Ok(snapshot)
    }

    /// Overwrite the ledger state of `company` with `content`.
    pub async fn write(&self, company: CompanyId, user: UserId, content: &str) -> Result<LedgerWriteReceipt, StateError> {
        let mut tx = self.backend.begin().await?;
        authorize(&mut tx, company, user).await?;

        let now = Utc::now();
        let state = tx.upsert_ledger_state(company, content, user, now).await?;
        tx.commit().await?;

        tracing::info!(
            company_id = %company,
            user_id = %user,
            version = state.version,
            bytes = content.len(),
            "ledger state written"
        );
        Ok(LedgerWriteReceipt {
            company_id: company,
            version: state.version,
            updated_at: state.updated_at.unwrap_or(now),
        })
    }
}

async fn authorize(tx: &mut Tx, company: CompanyId, user: UserId) -> Result<(), StateError> {
    if tx.company(company).await?.is_none() {
        return Err(StateError::NotFound(format!("company {company}")));
    }
    guard::require(tx, company, user, AccessLevel::Member).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use snug_core::{CompanyProfile, Membership, MembershipRole, MembershipStatus, NewCompany, NewUser};

    use super::*;
    use crate::directory::CompanyDirectory;

    struct Fixture {
        backend: Backend,
        store: LedgerStateStore,
        directory: CompanyDirectory,
    }

    impl Fixture {
        fn new() -> Self {
            let backend = Backend::memory();
            Self {
                store: LedgerStateStore::new(backend.clone()),
                directory: CompanyDirectory::new(backend.clone()),
                backend,
            }
        }

        async fn user(&self, email: &str) -> UserId {
            let mut tx = self.backend.begin().await.unwrap();
            let u = tx
                .insert_user(&NewUser::new(email, "h", None).unwrap(), Utc::now())
                .await
                .unwrap();
            tx.commit().await.unwrap();
            u.id
        }

        async fn company(&self, org: &str, owner: UserId) -> CompanyId {
            self.directory
                .create(NewCompany::new("Acme", org, CompanyProfile::default()).unwrap(), owner)
                .await
                .unwrap()
                .id
        }

        async fn add_member(&self, company: CompanyId, user: UserId, status: MembershipStatus) {
            let mut tx = self.backend.begin().await.unwrap();
            tx.insert_membership(&Membership {
                company_id: company,
                user_id: user,
                role: MembershipRole::Member,
                status,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }
    }

    #[tokio::test]
    async fn fresh_company_reads_empty_snapshot() {
        let f = Fixture::new();
        let owner = f.user("o@example.se").await;
        let company = f.company("556-001", owner).await;

        let snap = f.store.read(company, owner).await.unwrap();
        assert!(snap.is_empty());
        assert_eq!(snap.company_id, company);
    }

    #[tokio::test]
    async fn first_write_is_version_one_then_two() {
        let f = Fixture::new();
        let owner = f.user("o@example.se").await;
        let company = f.company("556-001", owner).await;

        assert_eq!(f.store.write(company, owner, "#SIE 1").await.unwrap().version, 1);
        assert_eq!(f.store.write(company, owner, "#SIE 2").await.unwrap().version, 2);

        let snap = f.store.read(company, owner).await.unwrap();
        assert_eq!(snap.version, Some(2));
        assert_eq!(snap.content.as_deref(), Some("#SIE 2"));
        assert_eq!(snap.updated_by, Some(owner));
    }

    #[tokio::test]
    async fn plain_member_may_write_and_is_recorded_as_writer() {
        let f = Fixture::new();
        let owner = f.user("o@example.se").await;
        let member = f.user("m@example.se").await;
        let company = f.company("556-001", owner).await;
        f.add_member(company, member, MembershipStatus::Active).await;

        f.store.write(company, owner, "a").await.unwrap();
        let receipt = f.store.write(company, member, "b").await.unwrap();
        assert_eq!(receipt.version, 2);
        assert_eq!(f.store.read(company, owner).await.unwrap().updated_by, Some(member));
    }

    #[tokio::test]
    async fn non_member_and_removed_member_are_denied() {
        let f = Fixture::new();
        let owner = f.user("o@example.se").await;
        let stranger = f.user("s@example.se").await;
        let removed = f.user("r@example.se").await;
        let company = f.company("556-001", owner).await;
        f.add_member(company, removed, MembershipStatus::Removed).await;

        for user in [stranger, removed] {
            assert!(matches!(f.store.read(company, user).await, Err(StateError::AccessDenied(_))));
            assert!(matches!(
                f.store.write(company, user, "x").await,
                Err(StateError::AccessDenied(_))
            ));
        }
        assert!(f.store.read(company, owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_writes_stranger_is_refused_owner_reads_back() {
        let f = Fixture::new();
        let a = f.user("a@example.se").await;
        let b = f.user("b@example.se").await;
        let acme = f.company("556-001", a).await;

        assert_eq!(f.store.write(acme, a, "SIE...v1").await.unwrap().version, 1);
        assert!(matches!(
            f.store.write(acme, b, "SIE...evil").await,
            Err(StateError::AccessDenied(_))
        ));

        let snap = f.store.read(acme, a).await.unwrap();
        assert_eq!(snap.content.as_deref(), Some("SIE...v1"));
        assert_eq!(snap.version, Some(1));

        assert_eq!(f.store.write(acme, a, "SIE...v2").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn companies_do_not_share_ledger_states() {
        let f = Fixture::new();
        let u1 = f.user("u1@example.se").await;
        let u2 = f.user("u2@example.se").await;

        // U1 creates Acme; U2 cannot reuse its number.
        let acme = f.company("556-001", u1).await;
        let err = f
            .directory
            .create(NewCompany::new("Other", "556-001", CompanyProfile::default()).unwrap(), u2)
            .await
            .unwrap_err();
        assert!(matches!(err, StateError::Conflict(_)));

        f.store.write(acme, u1, "acme ledger").await.unwrap();
        assert!(matches!(f.store.read(acme, u2).await, Err(StateError::AccessDenied(_))));

        let other = f.company("556-002", u2).await;
        assert!(f.store.read(other, u2).await.unwrap().is_empty());
        assert_eq!(
            f.store.read(acme, u1).await.unwrap().content.as_deref(),
            Some("acme ledger")
        );
    }

    #[tokio::test]
    async fn concurrent_writes_produce_consecutive_versions() {
        let f = Fixture::new();
        let a = f.user("a@example.se").await;
        let b = f.user("b@example.se").await;
        let company = f.company("556-001", a).await;
        f.add_member(company, b, MembershipStatus::Active).await;

        f.store.write(company, a, "v1").await.unwrap();
        f.store.write(company, a, "v2").await.unwrap();

        let (sa, sb) = (f.store.clone(), f.store.clone());
        let ta = tokio::spawn(async move { sa.write(company, a, "from a").await });
        let tb = tokio::spawn(async move { sb.write(company, b, "from b").await });
        let ra = ta.await.unwrap().unwrap();
        let rb = tb.await.unwrap().unwrap();

        let mut versions = [ra.version, rb.version];
        versions.sort_unstable();
        assert_eq!(versions, [3, 4]);

        let snap = f.store.read(company, a).await.unwrap();
        assert_eq!(snap.version, Some(4));
        let content = snap.content.unwrap();
        assert!(content == "from a" || content == "from b");
    }

    #[tokio::test]
    async fn deleted_company_rejects_reads_and_writes() {
        let f = Fixture::new();
        let owner = f.user("o@example.se").await;
        let company = f.company("556-001", owner).await;
        f.store.write(company, owner, "x").await.unwrap();

        f.directory.delete(company, owner).await.unwrap();

        assert!(matches!(f.store.read(company, owner).await, Err(StateError::NotFound(_))));
        assert!(matches!(
            f.store.write(company, owner, "y").await,
            Err(StateError::NotFound(_))
        ));
        let guard = crate::guard::AccessGuard::new(f.backend.clone());
        assert!(matches!(
            guard.check_access(company, owner).await,
            Err(StateError::NotFound(_))
        ));
    }
}
