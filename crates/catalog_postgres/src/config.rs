//! Database connection management and pooling.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::audit::{PgAuditSink, PgOutboxPublisher};
use crate::schema;
use crate::store::PgCatalogStore;

const DEFAULT_URL: &str = "postgresql://localhost:5432/catalog";

fn env_secs(name: &str, fallback: u64) -> Duration {
    Duration::from_secs(
        std::env::var(name)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(fallback),
    )
}

/// Connection settings for the catalog database.
///
/// Read from `DATABASE_URL`, `DATABASE_POOL_SIZE` and the
/// `DATABASE_*_SECS` timeouts; a zero idle or lifetime timeout disables it.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let optional = |d: Duration| (!d.is_zero()).then_some(d);
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_URL.to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(10),
            acquire_timeout: env_secs("DATABASE_ACQUIRE_TIMEOUT_SECS", 30),
            idle_timeout: optional(env_secs("DATABASE_IDLE_TIMEOUT_SECS", 600)),
            max_lifetime: optional(env_secs("DATABASE_MAX_LIFETIME_SECS", 1800)),
        }
    }
}

impl DatabaseConfig {
    pub fn with_url(mut self, database_url: impl Into<String>) -> Self {
        self.database_url = database_url.into();
        self
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
    }
}

/// Owns the pool and hands out the catalog's Postgres adapters.
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    pub async fn new(config: DatabaseConfig) -> Result<Self, sqlx::Error> {
        let target = mask_database_url(&config.database_url);
        info!(
            database = %target,
            pool_size = config.max_connections,
            "connecting to catalog database"
        );
        let pool = config
            .pool_options()
            .connect(&config.database_url)
            .await
            .inspect_err(|e| {
                warn!(database = %target, error = %e, "catalog database unreachable");
            })?;
        Ok(Self { pool })
    }

    pub async fn with_default_config() -> Result<Self, sqlx::Error> {
        Self::new(DatabaseConfig::default()).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn store(&self) -> PgCatalogStore {
        PgCatalogStore::new(self.pool.clone())
    }

    pub fn audit_sink(&self) -> PgAuditSink {
        PgAuditSink::new(self.pool.clone())
    }

    pub fn outbox(&self) -> PgOutboxPublisher {
        PgOutboxPublisher::new(self.pool.clone())
    }

    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    /// Creates the catalog schema if it does not exist yet.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        info!("Applying catalog schema");
        schema::apply(&self.pool).await?;
        info!("Catalog schema ready");
        Ok(())
    }

    /// Number of catalog tables present.
    pub async fn verify_schema(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema = 'catalog'
              AND table_name = ANY($1)
            "#,
        )
        .bind(schema::TABLES.to_vec())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn close(self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

/// Hides the password of a connection URL before it reaches a log line.
pub fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        return masked.to_string();
    }
    let head = url.get(..10);
    let tail = url.len().checked_sub(10).and_then(|start| url.get(start..));
    match (head, tail) {
        (Some(head), Some(tail)) if url.len() > 20 => format!("{head}***{tail}"),
        _ => "***".to_string(),
    }
}
