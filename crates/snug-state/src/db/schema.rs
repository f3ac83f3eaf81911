//! # Schema Runner
//!
//! Applies the steps of [`snug_core::schema::SCHEMA_STEPS`] to a Postgres
//! database. Applied versions are recorded in `snug_schema_versions`.
//!
//! Every pending step runs in its own transaction:
//!
//! 1. probe the live schema for the step's effect;
//! 2. if absent, execute the step's SQL;
//! 3. record the version.
//!
//! A database created by an older deployment (tables present, no version
//! table) is therefore adopted without re-running DDL that already took
//! effect. Step 1 is adopted only when every base table exists; a partial
//! set runs the step, whose statements are all `IF NOT EXISTS`. A failing step rolls back alone and leaves earlier steps
//! recorded.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use snug_core::consolidation::{plan_ledger_dedup, plan_owner_backfill, LegacyLedgerRow, LegacyOwnership};
use snug_core::schema::{pending_steps, SchemaStep, SCHEMA_STEPS};
use snug_core::{CompanyId, Membership, UserId};
use sqlx::{PgConnection, PgPool};

use crate::error::StateError;

/// Applied state of one catalog step.
#[derive(Debug, Clone)]
pub struct StepStatus {
    /// The catalog entry.
    pub step: &'static SchemaStep,
    /// When the step was recorded, if it was.
    pub applied_at: Option<DateTime<Utc>>,
}

/// Outcome of applying one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step's SQL ran.
    Executed,
    /// The probe found the effect already present; only the version was recorded.
    Adopted,
}

/// Apply every pending step. Returns the steps handled, in order.
pub async fn run_pending(pool: &PgPool) -> Result<Vec<(i32, StepOutcome)>, StateError> {
    ensure_version_table(pool).await?;
    let applied: BTreeSet<i32> = applied_versions(pool).await?.into_keys().collect();
    let pending = pending_steps(&applied).map_err(StateError::Schema)?;

    let mut handled = Vec::with_capacity(pending.len());
    for step in pending {
        let mut tx = pool.begin().await?;
        let outcome = if probe(&mut tx, step.version).await? {
            StepOutcome::Adopted
        } else {
            apply(&mut tx, step.version).await?;
            StepOutcome::Executed
        };
        sqlx::query("INSERT INTO snug_schema_versions (version, name, applied_at) VALUES ($1, $2, $3)")
            .bind(step.version)
            .bind(step.name)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(version = step.version, name = step.name, ?outcome, "schema step recorded");
        handled.push((step.version, outcome));
    }
    Ok(handled)
}

/// Applied state of every catalog step.
pub async fn status(pool: &PgPool) -> Result<Vec<StepStatus>, StateError> {
    ensure_version_table(pool).await?;
    let applied = applied_versions(pool).await?;
    Ok(SCHEMA_STEPS
        .iter()
        .map(|step| StepStatus {
            step,
            applied_at: applied.get(&step.version).copied(),
        })
        .collect())
}

async fn ensure_version_table(pool: &PgPool) -> Result<(), StateError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS snug_schema_versions (
             version INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             applied_at TIMESTAMPTZ NOT NULL
         )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn applied_versions(pool: &PgPool) -> Result<BTreeMap<i32, DateTime<Utc>>, StateError> {
    let rows: Vec<(i32, DateTime<Utc>)> = sqlx::query_as("SELECT version, applied_at FROM snug_schema_versions")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

async fn table_exists(conn: &mut PgConnection, table: &str) -> Result<bool, StateError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = $1
         )",
    )
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

async fn column_exists(conn: &mut PgConnection, table: &str, column: &str) -> Result<bool, StateError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM information_schema.columns
             WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2
         )",
    )
    .bind(table)
    .bind(column)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

async fn constraint_exists(conn: &mut PgConnection, name: &str) -> Result<bool, StateError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
             SELECT 1 FROM pg_constraint c
             JOIN pg_namespace n ON n.oid = c.connamespace
             WHERE c.conname = $1 AND n.nspname = current_schema()
         )",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(exists)
}

/// Tables created by step 1. A partial set is completed, not adopted.
const BASE_TABLES: &[&str] = &["users", "companies", "customers", "products", "company_ledger_states"];

async fn all_tables_exist(conn: &mut PgConnection, tables: &[&str]) -> Result<bool, StateError> {
    for table in tables {
        if !table_exists(conn, table).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether the effect of step `version` is already present.
async fn probe(conn: &mut PgConnection, version: i32) -> Result<bool, StateError> {
    match version {
        1 => all_tables_exist(conn, BASE_TABLES).await,
        // The owner backfill is only complete once the legacy column is gone.
        2 => Ok(table_exists(conn, "company_members").await?
            && !column_exists(conn, "companies", "user_id").await?),
        3 => constraint_exists(conn, "uq_companies_organization_number").await,
        4 => Ok(!column_exists(conn, "companies", "user_id").await?),
        5 => Ok(column_exists(conn, "company_ledger_states", "version").await?
            && !column_exists(conn, "company_ledger_states", "user_id").await?),
        other => Err(StateError::Schema(format!("no probe for schema step {other}"))),
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

async fn apply(conn: &mut PgConnection, version: i32) -> Result<(), StateError> {
    match version {
        1 => base_tables(conn).await,
        2 => company_members(conn).await,
        3 => {
            sqlx::query(
                "ALTER TABLE companies
                 ADD CONSTRAINT uq_companies_organization_number UNIQUE (organization_number)",
            )
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                StateError::unique_or(e, || {
                    "duplicate organization numbers must be resolved before step 3".to_string()
                })
            })?;
            Ok(())
        }
        4 => {
            sqlx::query("ALTER TABLE companies DROP COLUMN IF EXISTS user_id")
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
        5 => per_company_ledger_state(conn).await,
        other => Err(StateError::Schema(format!("unknown schema step {other}"))),
    }
}

async fn base_tables(conn: &mut PgConnection) -> Result<(), StateError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS users (
             id BIGSERIAL PRIMARY KEY,
             email VARCHAR(255) NOT NULL UNIQUE,
             credential_hash VARCHAR(255) NOT NULL,
             role VARCHAR(50) NOT NULL DEFAULT 'user',
             name VARCHAR(255),
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );

         CREATE TABLE IF NOT EXISTS companies (
             id BIGSERIAL PRIMARY KEY,
             user_id BIGINT REFERENCES users(id),
             name VARCHAR(255) NOT NULL,
             organization_number VARCHAR(20),
             address VARCHAR(255),
             postal_code VARCHAR(20),
             city VARCHAR(255),
             country VARCHAR(255),
             vat_number VARCHAR(50),
             fiscal_year_start VARCHAR(10),
             fiscal_year_end VARCHAR(10),
             accounting_standard VARCHAR(2),
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );

         CREATE TABLE IF NOT EXISTS customers (
             id BIGSERIAL PRIMARY KEY,
             user_id BIGINT NOT NULL REFERENCES users(id),
             company_id BIGINT REFERENCES companies(id) ON DELETE SET NULL,
             type VARCHAR(20) NOT NULL,
             name VARCHAR(255) NOT NULL,
             organization_number VARCHAR(20),
             email VARCHAR(255),
             phone VARCHAR(50),
             address VARCHAR(255) NOT NULL,
             postal_code VARCHAR(20) NOT NULL,
             city VARCHAR(255) NOT NULL,
             country VARCHAR(255) NOT NULL,
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );
         CREATE INDEX IF NOT EXISTS ix_customers_user_id ON customers (user_id);
         CREATE INDEX IF NOT EXISTS ix_customers_company_id ON customers (company_id);

         CREATE TABLE IF NOT EXISTS products (
             id BIGSERIAL PRIMARY KEY,
             user_id BIGINT NOT NULL REFERENCES users(id),
             company_id BIGINT REFERENCES companies(id) ON DELETE SET NULL,
             name VARCHAR(255) NOT NULL,
             description TEXT,
             price DOUBLE PRECISION NOT NULL,
             includes_vat BOOLEAN NOT NULL DEFAULT FALSE,
             vat_rate DOUBLE PRECISION NOT NULL DEFAULT 25,
             unit VARCHAR(20),
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
         );
         CREATE INDEX IF NOT EXISTS ix_products_user_id ON products (user_id);
         CREATE INDEX IF NOT EXISTS ix_products_company_id ON products (company_id);

         CREATE TABLE IF NOT EXISTS company_ledger_states (
             id BIGSERIAL PRIMARY KEY,
             user_id BIGINT NOT NULL REFERENCES users(id),
             company_id BIGINT NOT NULL REFERENCES companies(id),
             content TEXT NOT NULL,
             updated_at TIMESTAMPTZ,
             CONSTRAINT uq_company_ledger_states_user_company UNIQUE (user_id, company_id)
         );",
    )
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn company_members(conn: &mut PgConnection) -> Result<(), StateError> {
    sqlx::raw_sql(
        "CREATE TABLE IF NOT EXISTS company_members (
             id BIGSERIAL PRIMARY KEY,
             company_id BIGINT NOT NULL REFERENCES companies(id),
             user_id BIGINT NOT NULL REFERENCES users(id),
             role VARCHAR(50) NOT NULL DEFAULT 'MEMBER',
             status VARCHAR(50) NOT NULL DEFAULT 'ACTIVE',
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
             CONSTRAINT uq_company_members_company_user UNIQUE (company_id, user_id)
         );
         CREATE INDEX IF NOT EXISTS ix_company_members_company_id ON company_members (company_id);
         CREATE INDEX IF NOT EXISTS ix_company_members_user_id ON company_members (user_id);",
    )
    .execute(&mut *conn)
    .await?;

    if !column_exists(conn, "companies", "user_id").await? {
        return Ok(());
    }

    let owners: Vec<(i64, Option<i64>)> = sqlx::query_as("SELECT id, user_id FROM companies")
        .fetch_all(&mut *conn)
        .await?;
    let owners: Vec<LegacyOwnership> = owners
        .into_iter()
        .map(|(company, owner)| LegacyOwnership {
            company_id: CompanyId::new(company),
            owner: owner.map(UserId::new),
        })
        .collect();

    let existing: Vec<(i64, i64)> = sqlx::query_as("SELECT company_id, user_id FROM company_members")
        .fetch_all(&mut *conn)
        .await?;
    let existing: BTreeSet<(CompanyId, UserId)> = existing
        .into_iter()
        .map(|(c, u)| (CompanyId::new(c), UserId::new(u)))
        .collect();

    let seeds = plan_owner_backfill(&owners, &existing);
    let now = Utc::now();
    for (company, user) in &seeds {
        super::memberships::insert(conn, &Membership::owner(*company, *user, now)).await?;
    }
    tracing::info!(seeded = seeds.len(), "owner memberships backfilled");
    Ok(())
}

async fn per_company_ledger_state(conn: &mut PgConnection) -> Result<(), StateError> {
    let rows: Vec<(i64, i64, Option<DateTime<Utc>>)> =
        sqlx::query_as("SELECT id, company_id, updated_at FROM company_ledger_states")
            .fetch_all(&mut *conn)
            .await?;
    let rows: Vec<LegacyLedgerRow> = rows
        .into_iter()
        .map(|(id, company, updated_at)| LegacyLedgerRow {
            id,
            company_id: CompanyId::new(company),
            updated_at,
        })
        .collect();

    let plan = plan_ledger_dedup(&rows);
    if !plan.is_noop() {
        sqlx::query("DELETE FROM company_ledger_states WHERE id = ANY($1)")
            .bind(&plan.discard)
            .execute(&mut *conn)
            .await?;
    }
    tracing::info!(kept = plan.keep.len(), discarded = plan.discard.len(), "ledger states deduplicated");

    sqlx::raw_sql(
        "ALTER TABLE company_ledger_states ADD COLUMN IF NOT EXISTS version BIGINT NOT NULL DEFAULT 1;
         ALTER TABLE company_ledger_states
             ADD COLUMN IF NOT EXISTS updated_by_user_id BIGINT REFERENCES users(id);",
    )
    .execute(&mut *conn)
    .await?;

    if column_exists(conn, "company_ledger_states", "user_id").await? {
        sqlx::raw_sql(
            "UPDATE company_ledger_states SET updated_by_user_id = user_id WHERE updated_by_user_id IS NULL;
             ALTER TABLE company_ledger_states
                 DROP CONSTRAINT IF EXISTS uq_company_ledger_states_user_company;
             ALTER TABLE company_ledger_states DROP COLUMN user_id;",
        )
        .execute(&mut *conn)
        .await?;
    }

    if !constraint_exists(conn, "uq_company_ledger_states_company").await? {
        sqlx::query(
            "ALTER TABLE company_ledger_states
             ADD CONSTRAINT uq_company_ledger_states_company UNIQUE (company_id)",
        )
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
