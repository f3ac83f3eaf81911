//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! Every service holds a clone of the same [`Backend`]: a Postgres pool in
//! production, or the in-memory tables when no `DATABASE_URL` is set.

use std::time::Duration;

use snug_state::{
    AccessGuard, Backend, CompanyDirectory, IdentityStore, LedgerStateStore, MembershipRegistry, PoolSettings,
    RecordStore,
};

/// Runtime configuration, read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token required on every `/v1` request.
    /// If `None`, the service token check is disabled.
    pub auth_token: Option<String>,
    /// Shared secret for user role changes. If `None`, role changes are refused.
    pub admin_token: Option<String>,
    /// Postgres settings. If `None`, the in-memory backend is used.
    pub database: Option<PoolSettings>,
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, `ADMIN_TOKEN`, `DATABASE_URL`,
    /// `DB_MAX_CONNECTIONS`, `DB_CONNECT_ATTEMPTS` and `DB_CONNECT_BACKOFF_SECS`.
    ///
    /// Unparseable numbers fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = non_empty("DATABASE_URL").map(|url| {
            let mut settings = PoolSettings::new(url);
            if let Some(max) = parsed("DB_MAX_CONNECTIONS") {
                settings.max_connections = u32::try_from(max).unwrap_or(u32::MAX);
            }
            if let Some(attempts) = parsed("DB_CONNECT_ATTEMPTS") {
                settings.connect_attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
            }
            if let Some(secs) = parsed("DB_CONNECT_BACKOFF_SECS") {
                settings.connect_backoff = Duration::from_secs(secs);
            }
            settings
        });

        Self {
            port: parsed("PORT").and_then(|p| u16::try_from(p).ok()).unwrap_or(8080),
            auth_token: non_empty("AUTH_TOKEN"),
            admin_token: non_empty("ADMIN_TOKEN"),
            database,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            admin_token: None,
            database: None,
        }
    }
}

/// Services shared by every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub backend: Backend,
    pub guard: AccessGuard,
    pub identity: IdentityStore,
    pub memberships: MembershipRegistry,
    pub directory: CompanyDirectory,
    pub ledger: LedgerStateStore,
    pub records: RecordStore,
}

impl AppState {
    /// Default configuration over a fresh in-memory backend.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), Backend::memory())
    }

    /// Wire every service to `backend`.
    pub fn with_config(config: AppConfig, backend: Backend) -> Self {
        Self {
            guard: AccessGuard::new(backend.clone()),
            identity: IdentityStore::new(backend.clone(), config.admin_token.clone()),
            memberships: MembershipRegistry::new(backend.clone()),
            directory: CompanyDirectory::new(backend.clone()),
            ledger: LedgerStateStore::new(backend.clone()),
            records: RecordStore::new(backend.clone()),
            backend,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
