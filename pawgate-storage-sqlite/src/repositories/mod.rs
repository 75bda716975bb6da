//! Repository implementations for SQLite storage

pub mod attempt;
pub mod rate_limit;
pub mod session;

pub use attempt::SqliteAttemptRepository;
pub use rate_limit::SqliteRateLimitRepository;
pub use session::SqliteSessionRepository;

use async_trait::async_trait;
use pawgate_core::{
    Error,
    error::StorageError,
    repositories::{
        AttemptRepositoryProvider, RateLimitRepositoryProvider, RepositoryProvider,
        SessionRepositoryProvider,
    },
};
use pawgate_migration::MigrationManager;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
///
/// All three repositories share one pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    session: Arc<SqliteSessionRepository>,
    attempts: Arc<SqliteAttemptRepository>,
    rate_limits: Arc<SqliteRateLimitRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            session: Arc::new(SqliteSessionRepository::new(pool.clone())),
            attempts: Arc::new(SqliteAttemptRepository::new(pool.clone())),
            rate_limits: Arc::new(SqliteRateLimitRepository::new(pool.clone())),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SessionRepositoryProvider for SqliteRepositoryProvider {
    type SessionRepo = SqliteSessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }
}

impl AttemptRepositoryProvider for SqliteRepositoryProvider {
    type AttemptRepo = SqliteAttemptRepository;

    fn attempts(&self) -> &Self::AttemptRepo {
        &self.attempts
    }
}

impl RateLimitRepositoryProvider for SqliteRepositoryProvider {
    type RateLimitRepo = SqliteRateLimitRepository;

    fn rate_limits(&self) -> &Self::RateLimitRepo {
        &self.rate_limits
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            StorageError::Migration("Failed to initialize migrations".to_string())
        })?;

        let migrations = pawgate_migration::ordered(migrations::all())
            .map_err(|e| StorageError::Migration(e.to_string()))?;

        manager.up(&migrations).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            StorageError::Migration("Failed to run migrations".to_string())
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }
}
