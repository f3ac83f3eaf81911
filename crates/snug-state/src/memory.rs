//! # In-Memory Backend
//!
//! Backs the services when no `DATABASE_URL` is configured (development)
//! and in tests. All tables live behind one `tokio::sync::Mutex`; a
//! transaction holds the lock from `begin` to `commit` and works on a copy,
//! so dropping an uncommitted transaction discards its writes.
//!
//! The copy is taken on the first write and covers every table, so a
//! writing transaction costs time proportional to all data held. Read-only
//! transactions never copy.
//!
//! The lock is async because a transaction stays open across the `.await`
//! points of a request. Holding it serializes transactions, which is
//! stricter than the Postgres backend but observably equivalent for the
//! atomic ledger upsert.
//!
//! Referential rules of the Postgres schema are mirrored here: a company
//! cannot be deleted while memberships or a ledger state still reference
//! it, and memberships need both their company and their user to exist.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use snug_core::{
    Company, CompanyId, CompanyUpdate, Customer, CustomerDraft, CustomerId, LedgerState, Membership,
    MembershipStatus, NewCompany, NewUser, OrganizationNumber, Product, ProductDraft, ProductId, User,
    UserId, UserRole,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::StateError;
use crate::records::RecordScope;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    companies: BTreeMap<CompanyId, Company>,
    memberships: BTreeMap<(CompanyId, UserId), Membership>,
    ledger_states: BTreeMap<CompanyId, LedgerState>,
    customers: BTreeMap<CustomerId, Customer>,
    products: BTreeMap<ProductId, Product>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared handle to the in-memory tables. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transaction. Waits for any transaction in flight.
    pub async fn begin(&self) -> MemoryTx {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        MemoryTx { guard, work: None }
    }
}

/// An open in-memory transaction.
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    /// Copy taken on the first write. Reads see the committed tables until then.
    work: Option<Tables>,
}

impl MemoryTx {
    /// Publish the working copy, if anything was written.
    pub fn commit(mut self) {
        if let Some(work) = self.work.take() {
            *self.guard = work;
        }
    }

    fn tables(&self) -> &Tables {
        self.work.as_ref().unwrap_or(&*self.guard)
    }

    fn tables_mut(&mut self) -> &mut Tables {
        let committed = &self.guard;
        self.work.get_or_insert_with(|| Tables::clone(&**committed))
    }

    /// Whether this transaction has copied the tables.
    #[cfg(test)]
    fn has_copy(&self) -> bool {
        self.work.is_some()
    }

    // -- users ----------------------------------------------------------------

    pub(crate) fn user(&self, id: UserId) -> Option<User> {
        self.tables().users.get(&id).cloned()
    }

    pub(crate) fn insert_user(&mut self, new: &NewUser, now: DateTime<Utc>) -> Result<User, StateError> {
        if self.tables().users.values().any(|u| u.email == new.email) {
            return Err(StateError::Conflict(format!("email {} is already registered", new.email)));
        }
        let id = UserId::new(self.tables_mut().next_id());
        let user = User {
            id,
            email: new.email.clone(),
            credential_hash: new.credential_hash.clone(),
            role: UserRole::User,
            name: new.name.clone(),
            created_at: now,
        };
        self.tables_mut().users.insert(id, user.clone());
        Ok(user)
    }

    pub(crate) fn set_user_role(&mut self, id: UserId, role: UserRole) -> Option<User> {
        let user = self.tables_mut().users.get_mut(&id)?;
        user.role = role;
        Some(user.clone())
    }

    // -- companies ------------------------------------------------------------

    pub(crate) fn company(&self, id: CompanyId) -> Option<Company> {
        self.tables().companies.get(&id).cloned()
    }

    pub(crate) fn company_id_by_organization_number(&self, number: &OrganizationNumber) -> Option<CompanyId> {
        self.tables()
            .companies
            .values()
            .find(|c| c.organization_number.as_ref() == Some(number))
            .map(|c| c.id)
    }

    pub(crate) fn insert_company(&mut self, new: &NewCompany, now: DateTime<Utc>) -> Result<Company, StateError> {
        if self.company_id_by_organization_number(&new.organization_number).is_some() {
            return Err(StateError::Conflict(format!(
                "organization number {} is already registered",
                new.organization_number
            )));
        }
        let id = CompanyId::new(self.tables_mut().next_id());
        let company = Company {
            id,
            name: new.name.clone(),
            organization_number: Some(new.organization_number.clone()),
            profile: new.profile.clone(),
            created_at: now,
        };
        self.tables_mut().companies.insert(id, company.clone());
        Ok(company)
    }

    pub(crate) fn update_company(&mut self, id: CompanyId, update: &CompanyUpdate) -> Result<Option<Company>, StateError> {
        if let Some(number) = &update.organization_number {
            if matches!(self.company_id_by_organization_number(number), Some(other) if other != id) {
                return Err(StateError::Conflict(format!(
                    "organization number {number} is already registered"
                )));
            }
        }
        let Some(company) = self.tables_mut().companies.get_mut(&id) else {
            return Ok(None);
        };
        company.name = update.name.clone();
        if let Some(number) = &update.organization_number {
            company.organization_number = Some(number.clone());
        }
        company.profile = update.profile.clone();
        Ok(Some(company.clone()))
    }

    pub(crate) fn delete_company(&mut self, id: CompanyId) -> Result<bool, StateError> {
        if self.tables().memberships.keys().any(|(c, _)| *c == id) {
            return Err(StateError::Integrity(format!("company {id} is still referenced by memberships")));
        }
        if self.tables().ledger_states.contains_key(&id) {
            return Err(StateError::Integrity(format!("company {id} is still referenced by its ledger state")));
        }
        for customer in self.tables_mut().customers.values_mut().filter(|c| c.company_id == Some(id)) {
            customer.company_id = None;
        }
        for product in self.tables_mut().products.values_mut().filter(|p| p.company_id == Some(id)) {
            product.company_id = None;
        }
        Ok(self.tables_mut().companies.remove(&id).is_some())
    }

    pub(crate) fn companies_for_member(&self, user: UserId) -> Vec<Company> {
        self.tables()
            .memberships
            .values()
            .filter(|m| m.user_id == user && m.status == MembershipStatus::Active)
            .filter_map(|m| self.tables().companies.get(&m.company_id).cloned())
            .collect()
    }

    // -- memberships ----------------------------------------------------------

    pub(crate) fn membership(&self, company: CompanyId, user: UserId) -> Option<Membership> {
        self.tables().memberships.get(&(company, user)).cloned()
    }

    pub(crate) fn insert_membership(&mut self, membership: &Membership) -> Result<Membership, StateError> {
        let key = (membership.company_id, membership.user_id);
        if !self.tables().companies.contains_key(&key.0) {
            return Err(StateError::Integrity(format!("company {} does not exist", key.0)));
        }
        if !self.tables().users.contains_key(&key.1) {
            return Err(StateError::Integrity(format!("user {} does not exist", key.1)));
        }
        if self.tables().memberships.contains_key(&key) {
            return Err(StateError::Conflict(format!(
                "user {} is already a member of company {}",
                key.1, key.0
            )));
        }
        self.tables_mut().memberships.insert(key, membership.clone());
        Ok(membership.clone())
    }

    pub(crate) fn memberships_for_company(&self, company: CompanyId) -> Vec<Membership> {
        self.tables()
            .memberships
            .values()
            .filter(|m| m.company_id == company)
            .cloned()
            .collect()
    }

    pub(crate) fn delete_memberships_for_company(&mut self, company: CompanyId) -> u64 {
        let before = self.tables().memberships.len();
        self.tables_mut().memberships.retain(|(c, _), _| *c != company);
        (before - self.tables().memberships.len()) as u64
    }

    // -- ledger states --------------------------------------------------------

    pub(crate) fn ledger_state(&self, company: CompanyId) -> Option<LedgerState> {
        self.tables().ledger_states.get(&company).cloned()
    }

    pub(crate) fn upsert_ledger_state(
        &mut self,
        company: CompanyId,
        content: &str,
        writer: UserId,
        now: DateTime<Utc>,
    ) -> Result<LedgerState, StateError> {
        if !self.tables().companies.contains_key(&company) {
            return Err(StateError::Integrity(format!("company {company} does not exist")));
        }
        let version = LedgerState::next_version(self.tables().ledger_states.get(&company));
        let state = LedgerState {
            company_id: company,
            content: content.to_string(),
            version,
            updated_by: Some(writer),
            updated_at: Some(now),
        };
        self.tables_mut().ledger_states.insert(company, state.clone());
        Ok(state)
    }

    pub(crate) fn delete_ledger_state(&mut self, company: CompanyId) -> bool {
        self.tables_mut().ledger_states.remove(&company).is_some()
    }

    // -- customers ------------------------------------------------------------

    pub(crate) fn insert_customer(
        &mut self,
        owner: UserId,
        company: Option<CompanyId>,
        fields: &CustomerDraft,
        now: DateTime<Utc>,
    ) -> Customer {
        let id = CustomerId::new(self.tables_mut().next_id());
        let customer = Customer {
            id,
            user_id: owner,
            company_id: company,
            fields: fields.clone(),
            created_at: now,
        };
        self.tables_mut().customers.insert(id, customer.clone());
        customer
    }

    pub(crate) fn customer(&self, id: CustomerId) -> Option<Customer> {
        self.tables().customers.get(&id).cloned()
    }

    pub(crate) fn customers(&self, scope: RecordScope) -> Vec<Customer> {
        let mut found: Vec<Customer> = self
            .tables()
            .customers
            .values()
            .filter(|c| scope.matches(c.user_id, c.company_id))
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.created_at, c.id));
        found
    }

    pub(crate) fn update_customer(&mut self, id: CustomerId, fields: &CustomerDraft) -> Option<Customer> {
        let customer = self.tables_mut().customers.get_mut(&id)?;
        customer.fields = fields.clone();
        Some(customer.clone())
    }

    pub(crate) fn delete_customer(&mut self, id: CustomerId) -> bool {
        self.tables_mut().customers.remove(&id).is_some()
    }

    // -- products -------------------------------------------------------------

    pub(crate) fn insert_product(
        &mut self,
        owner: UserId,
        company: Option<CompanyId>,
        fields: &ProductDraft,
        now: DateTime<Utc>,
    ) -> Product {
        let id = ProductId::new(self.tables_mut().next_id());
        let product = Product {
            id,
            user_id: owner,
            company_id: company,
            fields: fields.clone(),
            created_at: now,
        };
        self.tables_mut().products.insert(id, product.clone());
        product
    }

    pub(crate) fn product(&self, id: ProductId) -> Option<Product> {
        self.tables().products.get(&id).cloned()
    }

    pub(crate) fn products(&self, scope: RecordScope) -> Vec<Product> {
        let mut found: Vec<Product> = self
            .tables()
            .products
            .values()
            .filter(|p| scope.matches(p.user_id, p.company_id))
            .cloned()
            .collect();
        found.sort_by_key(|p| (p.created_at, p.id));
        found
    }

    pub(crate) fn update_product(&mut self, id: ProductId, fields: &ProductDraft) -> Option<Product> {
        let product = self.tables_mut().products.get_mut(&id)?;
        product.fields = fields.clone();
        Some(product.clone())
    }

    pub(crate) fn delete_product(&mut self, id: ProductId) -> bool {
        self.tables_mut().products.remove(&id).is_some()
    }
}
