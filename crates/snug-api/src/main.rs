//! # snug-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).
//!
//! With `DATABASE_URL` set, connects to Postgres (retrying with a fixed
//! backoff), applies pending schema steps, and serves from the database.
//! Without it, serves from in-memory tables that vanish on exit.

use snug_api::state::{AppConfig, AppState};
use snug_state::db::schema;
use snug_state::{connect_with_retry, Backend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env();
    tracing::debug!(?config, "configuration loaded");

    let backend = match &config.database {
        Some(settings) => {
            let pool = connect_with_retry(settings).await.map_err(|e| {
                tracing::error!("Database connection failed: {e}");
                e
            })?;
            let applied = schema::run_pending(&pool).await.map_err(|e| {
                tracing::error!("Schema evolution failed: {e}");
                e
            })?;
            tracing::info!(steps = applied.len(), "schema up to date");
            Backend::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage. Data is lost on exit.");
            Backend::memory()
        }
    };

    let port = config.port;
    let app = snug_api::app(AppState::with_config(config, backend));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Snug API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `RUST_LOG` filter (default `info`); JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
