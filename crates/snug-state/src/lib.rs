//! # snug-state: Storage and Services
//!
//! The services of the ledger backend and the storage they run on.
//!
//! ## Services
//!
//! - **Access Guard** ([`guard`]): resolves a caller's membership and
//!   applies [`snug_core::authorize`]. Refusals are uniform.
//!
//! - **Membership Registry** ([`membership`]): OWNER seeding at company
//!   creation, bulk removal at deletion, roster listing.
//!
//! - **Company Directory** ([`directory`]): create, list, get, update and
//!   delete companies. Creation and deletion are single transactions.
//!
//! - **Ledger State Store** ([`ledger`]): one versioned document per company.
//!
//! - **Identity Store** ([`identity`]) and **Record Store** ([`records`]):
//!   users, and the customers and products used for invoicing.
//!
//! ## Storage
//!
//! Every service holds a [`Backend`]: a Postgres pool ([`db`]) or the
//! in-memory tables ([`memory`]). Operations run inside one [`Tx`] each.
//!
//! ```text
//! service ── begin ──▶ Tx ── reads/writes ──▶ commit
//!                       └── dropped on error ──▶ rollback
//! ```
//!
//! Schema evolution for Postgres lives in [`db::schema`].

pub mod db;
pub mod directory;
pub mod error;
pub mod guard;
pub mod identity;
pub mod ledger;
pub mod membership;
pub mod memory;
pub mod records;
pub mod storage;

// Re-export primary types.
pub use db::{connect_with_retry, PoolSettings};
pub use directory::CompanyDirectory;
pub use error::StateError;
pub use guard::AccessGuard;
pub use identity::{secret_matches, IdentityStore};
pub use ledger::LedgerStateStore;
pub use membership::MembershipRegistry;
pub use memory::MemoryBackend;
pub use records::{RecordScope, RecordStore};
pub use storage::{Backend, Tx};
