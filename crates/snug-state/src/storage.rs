//! # Storage Backends
//!
//! [`Backend`] is the explicit storage handle every service receives. It is
//! either a Postgres pool or the in-memory tables; [`Tx`] is an open
//! transaction on one of them. Services run each operation inside one
//! [`Tx`] and call [`Tx::commit`] on success. Dropping a [`Tx`] without
//! committing rolls it back on both backends.

use chrono::{DateTime, Utc};
use snug_core::{
    Company, CompanyId, CompanyUpdate, Customer, CustomerDraft, CustomerId, LedgerState, Membership, NewCompany,
    NewUser, OrganizationNumber, Product, ProductDraft, ProductId, User, UserId, UserRole,
};
use sqlx::{PgPool, Postgres, Transaction};

use crate::db;
use crate::error::StateError;
use crate::memory::{MemoryBackend, MemoryTx};
use crate::records::RecordScope;

/// Storage handle shared by the services. Cheap to clone.
#[derive(Debug, Clone)]
pub enum Backend {
    /// In-process tables (development and tests).
    Memory(MemoryBackend),
    /// PostgreSQL via SQLx.
    Postgres(PgPool),
}

impl Backend {
    /// An empty in-memory backend.
    pub fn memory() -> Self {
        Self::Memory(MemoryBackend::new())
    }

    /// A Postgres backend over an existing pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self::Postgres(pool)
    }

    /// Short name for logs and the readiness probe.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Open a transaction.
    pub async fn begin(&self) -> Result<Tx, StateError> {
        match self {
            Self::Memory(backend) => Ok(Tx::Memory(backend.begin().await)),
            Self::Postgres(pool) => Ok(Tx::Postgres(pool.begin().await?)),
        }
    }

    /// Check that the store answers queries.
    pub async fn ping(&self) -> Result<(), StateError> {
        match self {
            Self::Memory(_) => Ok(()),
            Self::Postgres(pool) => {
                sqlx::query("SELECT 1").execute(pool).await?;
                Ok(())
            }
        }
    }
}

/// An open transaction.
pub enum Tx {
    /// In-memory transaction.
    Memory(MemoryTx),
    /// Postgres transaction.
    Postgres(Transaction<'static, Postgres>),
}

impl Tx {
    /// Commit every write made through this transaction.
    pub async fn commit(self) -> Result<(), StateError> {
        match self {
            Self::Memory(tx) => {
                tx.commit();
                Ok(())
            }
            Self::Postgres(tx) => Ok(tx.commit().await?),
        }
    }

    // -- users ----------------------------------------------------------------

    pub(crate) async fn user(&mut self, id: UserId) -> Result<Option<User>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.user(id)),
            Self::Postgres(tx) => db::users::get_by_id(&mut **tx, id).await,
        }
    }

    pub(crate) async fn insert_user(&mut self, new: &NewUser, now: DateTime<Utc>) -> Result<User, StateError> {
        match self {
            Self::Memory(tx) => tx.insert_user(new, now),
            Self::Postgres(tx) => db::users::insert(&mut **tx, new, now).await,
        }
    }

    pub(crate) async fn set_user_role(&mut self, id: UserId, role: UserRole) -> Result<Option<User>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.set_user_role(id, role)),
            Self::Postgres(tx) => db::users::set_role(&mut **tx, id, role).await,
        }
    }

    // -- companies ------------------------------------------------------------

    pub(crate) async fn company(&mut self, id: CompanyId) -> Result<Option<Company>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.company(id)),
            Self::Postgres(tx) => db::companies::get_by_id(&mut **tx, id).await,
        }
    }

    pub(crate) async fn company_id_by_organization_number(
        &mut self,
        number: &OrganizationNumber,
    ) -> Result<Option<CompanyId>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.company_id_by_organization_number(number)),
            Self::Postgres(tx) => db::companies::id_by_organization_number(&mut **tx, number).await,
        }
    }

    pub(crate) async fn insert_company(&mut self, new: &NewCompany, now: DateTime<Utc>) -> Result<Company, StateError> {
        match self {
            Self::Memory(tx) => tx.insert_company(new, now),
            Self::Postgres(tx) => db::companies::insert(&mut **tx, new, now).await,
        }
    }

    pub(crate) async fn update_company(
        &mut self,
        id: CompanyId,
        update: &CompanyUpdate,
    ) -> Result<Option<Company>, StateError> {
        match self {
            Self::Memory(tx) => tx.update_company(id, update),
            Self::Postgres(tx) => db::companies::update(&mut **tx, id, update).await,
        }
    }

    pub(crate) async fn delete_company(&mut self, id: CompanyId) -> Result<bool, StateError> {
        match self {
            Self::Memory(tx) => tx.delete_company(id),
            Self::Postgres(tx) => db::companies::delete(&mut **tx, id).await,
        }
    }

    pub(crate) async fn companies_for_member(&mut self, user: UserId) -> Result<Vec<Company>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.companies_for_member(user)),
            Self::Postgres(tx) => db::companies::list_for_member(&mut **tx, user).await,
        }
    }

    // -- memberships ----------------------------------------------------------

    pub(crate) async fn membership(&mut self, company: CompanyId, user: UserId) -> Result<Option<Membership>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.membership(company, user)),
            Self::Postgres(tx) => db::memberships::get(&mut **tx, company, user).await,
        }
    }

    pub(crate) async fn insert_membership(&mut self, membership: &Membership) -> Result<Membership, StateError> {
        match self {
            Self::Memory(tx) => tx.insert_membership(membership),
            Self::Postgres(tx) => db::memberships::insert(&mut **tx, membership).await,
        }
    }

    pub(crate) async fn memberships_for_company(&mut self, company: CompanyId) -> Result<Vec<Membership>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.memberships_for_company(company)),
            Self::Postgres(tx) => db::memberships::list_for_company(&mut **tx, company).await,
        }
    }

    pub(crate) async fn delete_memberships_for_company(&mut self, company: CompanyId) -> Result<u64, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.delete_memberships_for_company(company)),
            Self::Postgres(tx) => db::memberships::delete_for_company(&mut **tx, company).await,
        }
    }

    // -- ledger states --------------------------------------------------------

    pub(crate) async fn ledger_state(&mut self, company: CompanyId) -> Result<Option<LedgerState>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.ledger_state(company)),
            Self::Postgres(tx) => db::ledger::get(&mut **tx, company).await,
        }
    }

    pub(crate) async fn upsert_ledger_state(
        &mut self,
        company: CompanyId,
        content: &str,
        writer: UserId,
        now: DateTime<Utc>,
    ) -> Result<LedgerState, StateError> {
        match self {
            Self::Memory(tx) => tx.upsert_ledger_state(company, content, writer, now),
            Self::Postgres(tx) => db::ledger::upsert(&mut **tx, company, content, writer, now).await,
        }
    }

    pub(crate) async fn delete_ledger_state(&mut self, company: CompanyId) -> Result<bool, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.delete_ledger_state(company)),
            Self::Postgres(tx) => db::ledger::delete(&mut **tx, company).await,
        }
    }

    // -- customers ------------------------------------------------------------

    pub(crate) async fn insert_customer(
        &mut self,
        owner: UserId,
        company: Option<CompanyId>,
        fields: &CustomerDraft,
        now: DateTime<Utc>,
    ) -> Result<Customer, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.insert_customer(owner, company, fields, now)),
            Self::Postgres(tx) => db::customers::insert(&mut **tx, owner, company, fields, now).await,
        }
    }

    pub(crate) async fn customer(&mut self, id: CustomerId) -> Result<Option<Customer>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.customer(id)),
            Self::Postgres(tx) => db::customers::get(&mut **tx, id).await,
        }
    }

    pub(crate) async fn customers(&mut self, scope: RecordScope) -> Result<Vec<Customer>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.customers(scope)),
            Self::Postgres(tx) => db::customers::list(&mut **tx, scope).await,
        }
    }

    pub(crate) async fn update_customer(
        &mut self,
        id: CustomerId,
        fields: &CustomerDraft,
    ) -> Result<Option<Customer>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.update_customer(id, fields)),
            Self::Postgres(tx) => db::customers::update(&mut **tx, id, fields).await,
        }
    }

    pub(crate) async fn delete_customer(&mut self, id: CustomerId) -> Result<bool, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.delete_customer(id)),
            Self::Postgres(tx) => db::customers::delete(&mut **tx, id).await,
        }
    }

    // -- products -------------------------------------------------------------

    pub(crate) async fn insert_product(
        &mut self,
        owner: UserId,
        company: Option<CompanyId>,
        fields: &ProductDraft,
        now: DateTime<Utc>,
    ) -> Result<Product, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.insert_product(owner, company, fields, now)),
            Self::Postgres(tx) => db::products::insert(&mut **tx, owner, company, fields, now).await,
        }
    }

    pub(crate) async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.product(id)),
            Self::Postgres(tx) => db::products::get(&mut **tx, id).await,
        }
    }

    pub(crate) async fn products(&mut self, scope: RecordScope) -> Result<Vec<Product>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.products(scope)),
            Self::Postgres(tx) => db::products::list(&mut **tx, scope).await,
        }
    }

    pub(crate) async fn update_product(
        &mut self,
        id: ProductId,
        fields: &ProductDraft,
    ) -> Result<Option<Product>, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.update_product(id, fields)),
            Self::Postgres(tx) => db::products::update(&mut **tx, id, fields).await,
        }
    }

    pub(crate) async fn delete_product(&mut self, id: ProductId) -> Result<bool, StateError> {
        match self {
            Self::Memory(tx) => Ok(tx.delete_product(id)),
            Self::Postgres(tx) => db::products::delete(&mut **tx, id).await,
        }
    }
}
