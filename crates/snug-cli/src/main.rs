//! # snug CLI entry point
//!
//! Operator tooling for the ledger database. Applies the versioned schema
//! steps (including the one-time ledger consolidation and owner backfill)
//! and reports which steps a database has recorded.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snug_state::db::schema::{self, StepOutcome};
use snug_state::{connect_with_retry, PoolSettings};

/// Snug ledger backend operator CLI.
#[derive(Parser, Debug)]
#[command(name = "snug", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    database_url: Option<String>,

    /// Connection attempts before giving up.
    #[arg(long, default_value_t = 3, global = true)]
    connect_attempts: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Apply every pending schema step.
    Migrate,

    /// List schema steps and whether each has been applied.
    SchemaStatus,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let url = cli
        .database_url
        .context("no database configured: pass --database-url or set DATABASE_URL")?;
    let mut settings = PoolSettings::new(url);
    settings.max_connections = 2;
    settings.connect_attempts = cli.connect_attempts;
    let pool = connect_with_retry(&settings)
        .await
        .context("connecting to the database")?;

    match cli.command {
        Commands::Migrate => {
            let handled = schema::run_pending(&pool).await.context("applying schema steps")?;
            if handled.is_empty() {
                println!("schema is up to date");
            }
            for (version, outcome) in handled {
                let verb = match outcome {
                    StepOutcome::Executed => "applied",
                    StepOutcome::Adopted => "adopted",
                };
                println!("{verb} step {version}");
            }
        }
        Commands::SchemaStatus => {
            for entry in schema::status(&pool).await.context("reading schema status")? {
                let applied = entry
                    .applied_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "pending".to_string());
                println!("{:>3}  {:<32} {}", entry.step.version, entry.step.name, applied);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_migrate_with_url() {
        let cli = Cli::try_parse_from(["snug", "--database-url", "postgres://db/snug", "migrate"]).unwrap();
        assert_eq!(cli.command, Commands::Migrate);
        assert_eq!(cli.database_url.as_deref(), Some("postgres://db/snug"));
        assert_eq!(cli.connect_attempts, 3);
    }

    #[test]
    fn parses_schema_status_with_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["snug", "schema-status", "-vv", "--connect-attempts", "1"]).unwrap();
        assert_eq!(cli.command, Commands::SchemaStatus);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.connect_attempts, 1);
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["snug", "rollback"]).is_err());
    }
}
