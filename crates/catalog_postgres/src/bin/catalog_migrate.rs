//! Catalog schema tool
//!
//! Applies the catalog DDL to a Postgres database, or checks that every
//! catalog table is present.
//!
//! Usage:
//!   catalog_migrate --database-url postgresql://localhost:5432/catalog
//!   catalog_migrate --check

use clap::Parser;
use tracing::{error, info};

use catalog_postgres::schema;
use catalog_postgres::{mask_database_url, DatabaseConfig, DatabaseManager};

/// Catalog schema migration tool
#[derive(Parser, Debug)]
#[command(name = "catalog_migrate")]
#[command(about = "Create or verify the hardware catalog schema")]
struct Args {
    /// Database URL (defaults to DATABASE_URL)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Only report whether the schema is complete
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = DatabaseConfig::default();
    if let Some(url) = args.database_url {
        config = config.with_url(url);
    }
    let target = mask_database_url(&config.database_url);
    let manager = DatabaseManager::new(config).await?;
    manager.test_connection().await?;

    if !args.check {
        manager.run_migrations().await?;
    }

    let present = manager.verify_schema().await?;
    let expected = schema::TABLES.len() as i64;
    manager.close().await;

    if present == expected {
        info!("{target}: {present}/{expected} catalog tables present");
        Ok(())
    } else {
        error!("{target}: {present}/{expected} catalog tables present");
        std::process::exit(1);
    }
}
