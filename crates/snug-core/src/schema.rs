//! # Schema Step Catalog
//!
//! The database schema evolves through an ordered list of versioned steps.
//! Each step is applied at most once; the runner records applied versions
//! and probes the live schema before running a step, so a step whose effect
//! is already present is recorded without being re-executed.
//!
//! Ordering constraints of the ledger consolidation:
//!
//! - owner memberships are seeded (step 2) before `companies.user_id` is
//!   dropped (step 4);
//! - ledger rows are deduplicated before the per-company unique constraint
//!   is added (both inside step 5, in that order).
//!
//! The SQL bodies live with the Postgres backend; this catalog is the
//! source of truth for versions, names, and prerequisites.

use std::collections::BTreeSet;

/// A versioned schema step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaStep {
    /// Monotonic version number.
    pub version: i32,
    /// Stable machine name, recorded alongside the version.
    pub name: &'static str,
    /// One-line summary for `schema-status` output.
    pub summary: &'static str,
    /// Versions that must be applied first.
    pub requires: &'static [i32],
}

/// Every step, in application order.
pub const SCHEMA_STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "base_tables",
        summary: "users, companies (legacy owner column), customers, products, per-user ledger states",
        requires: &[],
    },
    SchemaStep {
        version: 2,
        name: "company_members",
        summary: "company_members table; seed OWNER memberships from companies.user_id",
        requires: &[1],
    },
    SchemaStep {
        version: 3,
        name: "unique_organization_number",
        summary: "unique constraint on companies.organization_number",
        requires: &[1],
    },
    SchemaStep {
        version: 4,
        name: "drop_company_owner_column",
        summary: "drop companies.user_id now that ownership lives in company_members",
        requires: &[2],
    },
    SchemaStep {
        version: 5,
        name: "per_company_ledger_state",
        summary: "deduplicate ledger states per company; add version and updated_by; unique on company_id",
        requires: &[1],
    },
];

/// Look up a step by version.
pub fn step(version: i32) -> Option<&'static SchemaStep> {
    SCHEMA_STEPS.iter().find(|s| s.version == version)
}

/// Steps not yet in `applied`, in application order.
///
/// Returns an error naming the first step whose prerequisite is neither
/// applied nor scheduled before it.
pub fn pending_steps(applied: &BTreeSet<i32>) -> Result<Vec<&'static SchemaStep>, String> {
    let mut satisfied = applied.clone();
    let mut pending = Vec::new();
    for step in SCHEMA_STEPS {
        if applied.contains(&step.version) {
            continue;
        }
        if let Some(missing) = step.requires.iter().find(|v| !satisfied.contains(v)) {
            return Err(format!(
                "schema step {} ({}) requires step {missing}",
                step.version, step.name
            ));
        }
        satisfied.insert(step.version);
        pending.push(step);
    }
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_versions_are_strictly_increasing() {
        for pair in SCHEMA_STEPS.windows(2) {
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn prerequisites_precede_their_dependents() {
        for step in SCHEMA_STEPS {
            for req in step.requires {
                assert!(*req < step.version, "step {} requires later step {req}", step.version);
            }
        }
    }

    #[test]
    fn fresh_database_runs_everything() {
        let pending = pending_steps(&BTreeSet::new()).unwrap();
        assert_eq!(pending.len(), SCHEMA_STEPS.len());
    }

    #[test]
    fn owner_column_drop_follows_membership_seeding() {
        let pending = pending_steps(&BTreeSet::new()).unwrap();
        let seed = pending.iter().position(|s| s.name == "company_members").unwrap();
        let drop = pending.iter().position(|s| s.name == "drop_company_owner_column").unwrap();
        assert!(seed < drop);
    }

    #[test]
    fn fully_applied_database_has_nothing_pending() {
        let applied: BTreeSet<i32> = SCHEMA_STEPS.iter().map(|s| s.version).collect();
        assert!(pending_steps(&applied).unwrap().is_empty());
    }

    #[test]
    fn partially_applied_database_resumes_in_order() {
        let applied = BTreeSet::from([1, 3]);
        let pending = pending_steps(&applied).unwrap();
        let versions: Vec<i32> = pending.iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![2, 4, 5]);
    }

    #[test]
    fn step_lookup() {
        assert_eq!(step(3).map(|s| s.name), Some("unique_organization_number"));
        assert!(step(99).is_none());
    }
}
