//! PostgreSQL adapter for catalog_core.
//!
//! - [`store::PgCatalogStore`] implements every storage port
//! - [`audit`] holds the audit-log and outbox sinks
//! - [`schema`] holds the DDL applied by `catalog_migrate`
//! - [`config`] manages the connection pool
//!
//! [`connect`] wires all of them into a ready [`CatalogService`].

pub mod audit;
pub mod config;
pub mod schema;
pub mod sql;
pub mod sqlx_types;
pub mod store;

use std::sync::Arc;

use catalog_core::{CatalogConfig, CatalogService};

pub use audit::{PgAuditSink, PgOutboxPublisher};
pub use config::{mask_database_url, DatabaseConfig, DatabaseManager};
pub use store::PgCatalogStore;

/// Connects, and builds a catalog service backed by Postgres for storage,
/// audit and events.
pub async fn connect(
    database: DatabaseConfig,
    catalog: CatalogConfig,
) -> Result<(DatabaseManager, CatalogService), sqlx::Error> {
    let manager = DatabaseManager::new(database).await?;
    let service = CatalogService::new(
        Arc::new(manager.store()),
        Arc::new(manager.audit_sink()),
        Arc::new(manager.outbox()),
        catalog,
    );
    Ok((manager, service))
}
