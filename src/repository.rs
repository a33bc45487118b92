//! Database module with SQLite storage and SQLx.

use std::str::FromStr;

use log::debug;
use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::repository::error::DatabaseError;
use crate::repository::table::SubscriptionTable;
use crate::repository::table::TableBase;

pub mod error;
pub mod filter;
pub mod table;

/// Main database struct containing all table handlers.
pub struct Repository {
    pool: SqlitePool,
    pub subscription: SubscriptionTable,
}

impl Repository {
    /// Creates a new database connection and initializes table handlers.
    pub async fn new(db_url: &str, db_path: &str) -> anyhow::Result<Self> {
        let path = std::path::Path::new(db_path);
        if !path.exists() {
            debug!("Database path {db_path} does not exist. Creating...");
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, "")?;
            info!("Created {db_path}");
        }

        debug!("Connecting to db...");
        let opts = SqliteConnectOptions::from_str(db_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await?;
        info!("Connected to db.");

        let subscription = SubscriptionTable::new(pool.clone());

        Ok(Self { pool, subscription })
    }

    /// Applies the schema from the migrations directory. Safe to run on every start.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Deletes all data from all tables. Use with caution!
    pub async fn delete_all_tables(&self) -> Result<(), DatabaseError> {
        self.subscription.delete_all().await
    }
}
