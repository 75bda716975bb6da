//! Versioned schema migrations shared by the pawgate storage backends.
//!
//! A backend implements [`Migration`] once per schema step and a
//! [`MigrationManager`] that records applied versions in
//! [`MIGRATION_TABLE`]. Migrations run in ascending version order and each
//! one is applied inside its own transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Database;
use thiserror::Error;

/// Table that tracks which migrations have been applied.
pub const MIGRATION_TABLE: &str = "_pawgate_migrations";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Duplicate migration version {0}")]
    DuplicateVersion(i64),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration<DB: Database>: Send + Sync {
    /// Apply the schema change
    async fn up<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Revert the schema change
    async fn down<'a>(&'a self, conn: &'a mut <DB as Database>::Connection) -> Result<()>;

    /// Ordering key, unique per backend
    fn version(&self) -> i64;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    /// Unix timestamp in seconds
    pub applied_at: i64,
}

impl MigrationRecord {
    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.applied_at, 0)
    }
}

/// Check that migration versions are unique and return them sorted ascending.
pub fn ordered<DB: Database>(
    mut migrations: Vec<Box<dyn Migration<DB>>>,
) -> Result<Vec<Box<dyn Migration<DB>>>> {
    migrations.sort_by_key(|m| m.version());
    if let Some(pair) = migrations
        .windows(2)
        .find(|pair| pair[0].version() == pair[1].version())
    {
        return Err(MigrationError::DuplicateVersion(pair[0].version()));
    }
    Ok(migrations)
}

#[async_trait]
pub trait MigrationManager<DB: Database>: Send + Sync {
    fn get_migration_table_name(&self) -> &str {
        MIGRATION_TABLE
    }

    /// Create the tracking table if it does not exist
    async fn initialize(&self) -> Result<()>;

    /// Apply every migration that has not been applied yet
    async fn up(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    /// Revert every applied migration in the given order
    async fn down(&self, migrations: &[Box<dyn Migration<DB>>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;
}
