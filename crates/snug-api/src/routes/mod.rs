//! # API Route Modules
//!
//! - `users`: the caller's own record and admin role changes.
//! - `companies`: the company directory and membership rosters.
//! - `ledger`: the per-company ledger state document.
//! - `records`: customers and products used for invoicing.
//!
//! Handlers translate DTOs into `snug_core` types and delegate to the
//! services on [`AppState`](crate::state::AppState). Access decisions are
//! never made here.

pub mod companies;
pub mod ledger;
pub mod records;
pub mod users;
