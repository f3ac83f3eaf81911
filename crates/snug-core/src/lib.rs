#![deny(missing_docs)]

//! # snug-core: Foundational Types for the Snug Ledger Backend
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies and no I/O: only `serde`,
//! `chrono`, and `thiserror` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`UserId`] cannot be passed
//!    where a [`CompanyId`] is expected, even though both are database
//!    serials underneath.
//!
//! 2. **Closed enumerations for roles and statuses.** Membership roles,
//!    membership statuses, and user roles are enums with a single string
//!    codec each. An unknown string is a [`ValidationError`], never a value.
//!
//! 3. **Access decisions are pure.** [`access::authorize`] turns an optional
//!    membership into either the membership or an [`AccessDenied`]. Fetching
//!    the membership is the storage layer's job.
//!
//! 4. **Absence is a value.** A company without a ledger state yields an
//!    empty [`LedgerSnapshot`], not an error.

pub mod access;
pub mod company;
pub mod consolidation;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod membership;
pub mod records;
pub mod schema;
pub mod user;

// Re-export primary types at crate root for ergonomic imports.
pub use access::{authorize, AccessLevel};
pub use company::{AccountingStandard, Company, CompanyProfile, CompanyUpdate, NewCompany, OrganizationNumber};
pub use error::{AccessDenied, DenialReason, ValidationError};
pub use identity::{CompanyId, CustomerId, ProductId, UserId};
pub use ledger::{LedgerSnapshot, LedgerState, LedgerWriteReceipt};
pub use membership::{Membership, MembershipRole, MembershipStatus};
pub use records::{Customer, CustomerDraft, CustomerKind, Product, ProductDraft};
pub use user::{NewUser, User, UserRole};
