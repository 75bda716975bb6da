//! SQLite storage backend for pawgate.
//!
//! Lockout records, rate limit windows and admin sessions are kept in three
//! tables, so several server instances pointed at the same database share
//! one view of every client. Timestamps are stored as unix milliseconds.
//!
//! ```rust,ignore
//! let provider = pawgate_storage_sqlite::connect("sqlite://pawgate.db").await?;
//! provider.migrate().await?;
//! ```

mod migrations;
pub mod repositories;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use pawgate_core::{Error, error::StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use migrations::SqliteMigrationManager;
pub use repositories::{
    SqliteAttemptRepository, SqliteRateLimitRepository, SqliteRepositoryProvider,
    SqliteSessionRepository,
};

/// Open a pool for `database_url`, creating the database file if needed.
pub async fn connect(database_url: &str) -> Result<SqliteRepositoryProvider, Error> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| {
            tracing::error!(error = %e, "Invalid SQLite database URL");
            StorageError::Connection(format!("Invalid database URL: {database_url}"))
        })?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            StorageError::Connection("Failed to connect to SQLite".to_string())
        })?;

    Ok(SqliteRepositoryProvider::new(pool))
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::Database(format!("Invalid timestamp: {ms}")).into())
}
