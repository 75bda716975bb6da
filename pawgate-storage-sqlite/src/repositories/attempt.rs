//! SQLite implementation of the failed-attempt repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pawgate_core::{
    Error, error::StorageError, repositories::AttemptRepository, storage::AttemptRecord,
};
use sqlx::SqlitePool;

use crate::{from_millis, to_millis};

pub struct SqliteAttemptRepository {
    pool: SqlitePool,
}

impl SqliteAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteAttemptRecord {
    key: String,
    count: i64,
    lock_until: Option<i64>,
    last_failed_at: i64,
}

impl TryFrom<SqliteAttemptRecord> for AttemptRecord {
    type Error = Error;

    fn try_from(row: SqliteAttemptRecord) -> Result<Self, Self::Error> {
        Ok(AttemptRecord {
            key: row.key,
            count: row.count as u32,
            lock_until: row.lock_until.map(from_millis).transpose()?,
            last_failed_at: from_millis(row.last_failed_at)?,
        })
    }
}

#[async_trait]
impl AttemptRepository for SqliteAttemptRepository {
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error> {
        let row = sqlx::query_as::<_, SqliteAttemptRecord>(
            "SELECT key, count, lock_until, last_failed_at FROM failed_login_attempts WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get failed login attempts");
            StorageError::Database("Failed to get failed login attempts".to_string())
        })?;

        row.map(AttemptRecord::try_from).transpose()
    }

    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<AttemptRecord, Error> {
        let row = sqlx::query_as::<_, SqliteAttemptRecord>(
            r#"
            INSERT INTO failed_login_attempts (key, count, lock_until, last_failed_at)
            VALUES (?1, 1, NULL, ?2)
            ON CONFLICT(key) DO UPDATE SET
                count = failed_login_attempts.count + 1,
                last_failed_at = excluded.last_failed_at
            RETURNING key, count, lock_until, last_failed_at
            "#,
        )
        .bind(key)
        .bind(to_millis(at))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record failed login attempt");
            StorageError::Database("Failed to record failed login attempt".to_string())
        })?;

        row.try_into()
    }

    async fn set_lock_until(
        &self,
        key: &str,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE failed_login_attempts SET lock_until = ? WHERE key = ?")
            .bind(lock_until.map(to_millis))
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to set lock_until");
                StorageError::Database("Failed to set lock_until".to_string())
            })?;

        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM failed_login_attempts WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clear failed login attempts");
                StorageError::Database("Failed to clear failed login attempts".to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM failed_login_attempts
            WHERE (lock_until IS NOT NULL AND lock_until <= ?)
               OR (lock_until IS NULL AND last_failed_at < ?)
            "#,
        )
        .bind(to_millis(now))
        .bind(to_millis(stale_before))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to purge failed login attempts");
            StorageError::Database("Failed to purge failed login attempts".to_string())
        })?;

        Ok(result.rows_affected())
    }
}
