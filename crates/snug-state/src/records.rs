//! # Record Store
//!
//! Customers and products. A record belongs to the user who created it and
//! may additionally be scoped to a company. The caller may see and change
//! a record when they own it or hold an ACTIVE membership in its company.
//!
//! Listing without a company returns the caller's own records; listing
//! with a company returns every record scoped to it, after an access check.

use chrono::Utc;
use snug_core::{
    AccessDenied, AccessLevel, CompanyId, Customer, CustomerDraft, CustomerId, DenialReason, Product, ProductDraft,
    ProductId, UserId,
};

use crate::error::StateError;
use crate::guard;
use crate::storage::{Backend, Tx};

/// Which records a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    /// Records created by this user.
    Owner(UserId),
    /// Records scoped to this company.
    Company(CompanyId),
}

impl RecordScope {
    /// Whether a record with this owner and company falls in the scope.
    pub fn matches(&self, owner: UserId, company: Option<CompanyId>) -> bool {
        match self {
            Self::Owner(user) => owner == *user,
            Self::Company(id) => company == Some(*id),
        }
    }

    /// Column and key to filter on in SQL.
    pub(crate) fn filter(&self) -> (&'static str, i64) {
        match self {
            Self::Owner(user) => ("user_id", user.get()),
            Self::Company(company) => ("company_id", company.get()),
        }
    }
}

/// Customer and product storage with ownership checks.
#[derive(Debug, Clone)]
pub struct RecordStore {
    backend: Backend,
}

impl RecordStore {
    /// Create a store over `backend`.
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    // -- customers ------------------------------------------------------------

    /// Create a customer owned by `caller`.
    pub async fn create_customer(
        &self,
        caller: UserId,
        company: Option<CompanyId>,
        draft: CustomerDraft,
    ) -> Result<Customer, StateError> {
        let draft = draft.normalized()?;
        let mut tx = self.backend.begin().await?;
        if let Some(company) = company {
            require_company_member(&mut tx, company, caller).await?;
        }
        let customer = tx.insert_customer(caller, company, &draft, Utc::now()).await?;
        tx.commit().await?;
        Ok(customer)
    }

    /// List customers, oldest first.
    pub async fn list_customers(&self, caller: UserId, company: Option<CompanyId>) -> Result<Vec<Customer>, StateError> {
        let mut tx = self.backend.begin().await?;
        let scope = scope_for(&mut tx, caller, company).await?;
        tx.customers(scope).await
    }

    /// Replace a customer's fields.
    pub async fn update_customer(
        &self,
        caller: UserId,
        id: CustomerId,
        draft: CustomerDraft,
    ) -> Result<Customer, StateError> {
        let draft = draft.normalized()?;
        let mut tx = self.backend.begin().await?;
        let existing = tx
            .customer(id)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("customer {id}")))?;
        require_record_access(&mut tx, caller, existing.user_id, existing.company_id).await?;
        let updated = tx
            .update_customer(id, &draft)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("customer {id}")))?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a customer.
    pub async fn delete_customer(&self, caller: UserId, id: CustomerId) -> Result<(), StateError> {
        let mut tx = self.backend.begin().await?;
        let existing = tx
            .customer(id)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("customer {id}")))?;
        require_record_access(&mut tx, caller, existing.user_id, existing.company_id).await?;
        tx.delete_customer(id).await?;
        tx.commit().await
    }

    // -- products -------------------------------------------------------------

    /// Create a product owned by `caller`.
    pub async fn create_product(
        &self,
        caller: UserId,
        company: Option<CompanyId>,
        draft: ProductDraft,
    ) -> Result<Product, StateError> {
        let draft = draft.normalized()?;
        let mut tx = self.backend.begin().await?;
        if let Some(company) = company {
            require_company_member(&mut tx, company, caller).await?;
        }
        let product = tx.insert_product(caller, company, &draft, Utc::now()).await?;
        tx.commit().await?;
        Ok(product)
    }

    /// List products, oldest first.
    pub async fn list_products(&self, caller: UserId, company: Option<CompanyId>) -> Result<Vec<Product>, StateError> {
        let mut tx = self.backend.begin().await?;
        let scope = scope_for(&mut tx, caller, company).await?;
        tx.products(scope).await
    }

    /// Replace a product's fields.
    pub async fn update_product(&self, caller: UserId, id: ProductId, draft: ProductDraft) -> Result<Product, StateError> {
        let draft = draft.normalized()?;
        let mut tx = self.backend.begin().await?;
        let existing = tx
            .product(id)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("product {id}")))?;
        require_record_access(&mut tx, caller, existing.user_id, existing.company_id).await?;
        let updated = tx
            .update_product(id, &draft)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("product {id}")))?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a product.
    pub async fn delete_product(&self, caller: UserId, id: ProductId) -> Result<(), StateError> {
        let mut tx = self.backend.begin().await?;
        let existing = tx
            .product(id)
            .await?
            .ok_or_else(|| StateError::NotFound(format!("product {id}")))?;
        require_record_access(&mut tx, caller, existing.user_id, existing.company_id).await?;
        tx.delete_product(id).await?;
        tx.commit().await
    }
}

async fn require_company_member(tx: &mut Tx, company: CompanyId, caller: UserId) -> Result<(), StateError> {
    if tx.company(company).await?.is_none() {
        return Err(StateError::NotFound(format!("company {company}")));
    }
    guard::require(tx, company, caller, AccessLevel::Member).await?;
    Ok(())
}

async fn scope_for(tx: &mut Tx, caller: UserId, company: Option<CompanyId>) -> Result<RecordScope, StateError> {
    match company {
        Some(company) => {
            require_company_member(tx, company, caller).await?;
            Ok(RecordScope::Company(company))
        }
        None => Ok(RecordScope::Owner(caller)),
    }
}

async fn require_record_access(
    tx: &mut Tx,
    caller: UserId,
    owner: UserId,
    company: Option<CompanyId>,
) -> Result<(), StateError> {
    if owner == caller {
        return Ok(());
    }
    match company {
        Some(company) => {
            guard::require(tx, company, caller, AccessLevel::Member).await?;
            Ok(())
        }
        None => Err(AccessDenied::new(DenialReason::NoMembership).into()),
    }
}
