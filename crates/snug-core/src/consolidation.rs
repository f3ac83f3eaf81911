//! # Ledger Consolidation Policy
//!
//! Ledger states were originally stored per (user, company). They are now
//! stored per company, and company ownership moved from a `companies.user_id`
//! column to OWNER memberships. This module holds the pure planning half of
//! that one-time conversion; the schema runner in `snug-state` loads the
//! legacy rows, asks for a plan, and applies it.
//!
//! ## Deduplication
//!
//! For each company keep exactly one ledger row: the most recently updated
//! one, with a missing `updated_at` ranking below any timestamp, and the
//! highest row id winning ties. Every other row is discarded.
//!
//! ## Owner backfill
//!
//! Every company with a legacy owner gets an OWNER/ACTIVE membership for
//! that owner, unless a membership for the pair already exists. Planning
//! against the memberships produced by a previous run yields nothing, so
//! the backfill is idempotent.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::identity::{CompanyId, UserId};

/// A legacy ledger-state row, reduced to what the policy ranks on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyLedgerRow {
    /// Row id.
    pub id: i64,
    /// Company the row belongs to.
    pub company_id: CompanyId,
    /// Last update time; legacy rows may lack one.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Rank two rows of the same company; `Greater` means `a` is kept over `b`.
fn rank(a: &LegacyLedgerRow, b: &LegacyLedgerRow) -> Ordering {
    let by_time = match (a.updated_at, b.updated_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };
    by_time.then(a.id.cmp(&b.id))
}

/// Result of planning the ledger-state deduplication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDedupPlan {
    /// The surviving row id of every company that has at least one row.
    pub keep: BTreeMap<CompanyId, i64>,
    /// Row ids to delete, ascending.
    pub discard: Vec<i64>,
}

impl LedgerDedupPlan {
    /// Whether applying the plan changes nothing.
    pub fn is_noop(&self) -> bool {
        self.discard.is_empty()
    }
}

/// Plan which legacy ledger rows survive consolidation.
pub fn plan_ledger_dedup(rows: &[LegacyLedgerRow]) -> LedgerDedupPlan {
    let mut winners: BTreeMap<CompanyId, &LegacyLedgerRow> = BTreeMap::new();
    for row in rows {
        winners
            .entry(row.company_id)
            .and_modify(|current| {
                if rank(row, current) == Ordering::Greater {
                    *current = row;
                }
            })
            .or_insert(row);
    }

    let keep: BTreeMap<CompanyId, i64> = winners.iter().map(|(c, r)| (*c, r.id)).collect();
    let kept: BTreeSet<i64> = keep.values().copied().collect();
    let mut discard: Vec<i64> = rows.iter().map(|r| r.id).filter(|id| !kept.contains(id)).collect();
    discard.sort_unstable();
    discard.dedup();

    LedgerDedupPlan { keep, discard }
}

/// A company together with its legacy owner column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyOwnership {
    /// The company.
    pub company_id: CompanyId,
    /// Value of the legacy `companies.user_id` column.
    pub owner: Option<UserId>,
}

/// Plan which OWNER memberships to seed.
///
/// `existing` holds every (company, user) pair that already has a
/// membership row, whatever its role. The result is sorted and never
/// contains a pair from `existing` or the same pair twice.
pub fn plan_owner_backfill(
    companies: &[LegacyOwnership],
    existing: &BTreeSet<(CompanyId, UserId)>,
) -> Vec<(CompanyId, UserId)> {
    let planned: BTreeSet<(CompanyId, UserId)> = companies
        .iter()
        .filter_map(|c| c.owner.map(|owner| (c.company_id, owner)))
        .filter(|pair| !existing.contains(pair))
        .collect();
    planned.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    fn row(id: i64, company: i64, updated_at: Option<DateTime<Utc>>) -> LegacyLedgerRow {
        LegacyLedgerRow {
            id,
            company_id: CompanyId::new(company),
            updated_at,
        }
    }

    #[test]
    fn newest_row_survives() {
        let plan = plan_ledger_dedup(&[row(1, 10, at(100)), row(2, 10, at(300)), row(3, 10, at(200))]);
        assert_eq!(plan.keep[&CompanyId::new(10)], 2);
        assert_eq!(plan.discard, vec![1, 3]);
    }

    #[test]
    fn null_timestamps_rank_last() {
        let plan = plan_ledger_dedup(&[row(9, 10, None), row(4, 10, at(1))]);
        assert_eq!(plan.keep[&CompanyId::new(10)], 4);
        assert_eq!(plan.discard, vec![9]);
    }

    #[test]
    fn ties_go_to_highest_id() {
        let plan = plan_ledger_dedup(&[row(5, 10, at(50)), row(7, 10, at(50)), row(6, 10, at(50))]);
        assert_eq!(plan.keep[&CompanyId::new(10)], 7);

        let plan = plan_ledger_dedup(&[row(5, 11, None), row(8, 11, None)]);
        assert_eq!(plan.keep[&CompanyId::new(11)], 8);
    }

    #[test]
    fn companies_are_planned_independently() {
        let plan = plan_ledger_dedup(&[row(1, 1, at(10)), row(2, 2, at(5)), row(3, 1, at(1))]);
        assert_eq!(plan.keep.len(), 2);
        assert_eq!(plan.keep[&CompanyId::new(2)], 2);
        assert_eq!(plan.discard, vec![3]);
    }

    #[test]
    fn already_consolidated_rows_are_a_noop() {
        let plan = plan_ledger_dedup(&[row(1, 1, at(10)), row(2, 2, None)]);
        assert!(plan.is_noop());
        assert!(plan_ledger_dedup(&[]).is_noop());
    }

    #[test]
    fn backfill_skips_ownerless_and_existing() {
        let companies = [
            LegacyOwnership { company_id: CompanyId::new(1), owner: Some(UserId::new(10)) },
            LegacyOwnership { company_id: CompanyId::new(2), owner: None },
            LegacyOwnership { company_id: CompanyId::new(3), owner: Some(UserId::new(30)) },
        ];
        let existing = BTreeSet::from([(CompanyId::new(3), UserId::new(30))]);
        let plan = plan_owner_backfill(&companies, &existing);
        assert_eq!(plan, vec![(CompanyId::new(1), UserId::new(10))]);
    }

    #[test]
    fn backfill_twice_seeds_once() {
        let companies = [
            LegacyOwnership { company_id: CompanyId::new(1), owner: Some(UserId::new(10)) },
            LegacyOwnership { company_id: CompanyId::new(2), owner: Some(UserId::new(10)) },
        ];
        let mut memberships = BTreeSet::new();
        let first = plan_owner_backfill(&companies, &memberships);
        assert_eq!(first.len(), 2);
        memberships.extend(first);
        let second = plan_owner_backfill(&companies, &memberships);
        assert!(second.is_empty());
        assert_eq!(memberships.len(), 2);
    }

    fn arb_rows() -> impl Strategy<Value = Vec<LegacyLedgerRow>> {
        prop::collection::vec((1i64..5, prop::option::of(0i64..20)), 0..40).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (company, secs))| row(i as i64 + 1, company, secs.and_then(at)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn exactly_one_row_per_company_survives(rows in arb_rows()) {
            let plan = plan_ledger_dedup(&rows);
            let companies: BTreeSet<CompanyId> = rows.iter().map(|r| r.company_id).collect();
            prop_assert_eq!(plan.keep.len(), companies.len());
            prop_assert_eq!(plan.keep.len() + plan.discard.len(), rows.len());
        }

        #[test]
        fn survivor_outranks_every_sibling(rows in arb_rows()) {
            let plan = plan_ledger_dedup(&rows);
            for (company, kept_id) in &plan.keep {
                let kept = rows.iter().find(|r| r.id == *kept_id).unwrap();
                for other in rows.iter().filter(|r| r.company_id == *company && r.id != *kept_id) {
                    prop_assert_eq!(rank(kept, other), Ordering::Greater);
                }
            }
        }
    }
}
