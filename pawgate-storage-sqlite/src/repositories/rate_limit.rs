//! SQLite implementation of the rate limit repository.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use pawgate_core::{
    Error, error::StorageError, repositories::RateLimitRepository, storage::RateLimitWindow,
};
use sqlx::SqlitePool;

use crate::{from_millis, to_millis};

pub struct SqliteRateLimitRepository {
    pool: SqlitePool,
}

impl SqliteRateLimitRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteRateLimitWindow {
    key: String,
    hits: i64,
    window_started_at: i64,
}

impl TryFrom<SqliteRateLimitWindow> for RateLimitWindow {
    type Error = Error;

    fn try_from(row: SqliteRateLimitWindow) -> Result<Self, Self::Error> {
        Ok(RateLimitWindow {
            key: row.key,
            hits: row.hits as u32,
            window_started_at: from_millis(row.window_started_at)?,
        })
    }
}

#[async_trait]
impl RateLimitRepository for SqliteRateLimitRepository {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitWindow, Error> {
        // Both CASE arms read the row as it was before the update.
        let row = sqlx::query_as::<_, SqliteRateLimitWindow>(
            r#"
            INSERT INTO login_rate_limits (key, hits, window_started_at)
            VALUES (?1, 1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                hits = CASE
                    WHEN login_rate_limits.window_started_at <= ?3 THEN 1
                    ELSE login_rate_limits.hits + 1
                END,
                window_started_at = CASE
                    WHEN login_rate_limits.window_started_at <= ?3 THEN excluded.window_started_at
                    ELSE login_rate_limits.window_started_at
                END
            RETURNING key, hits, window_started_at
            "#,
        )
        .bind(key)
        .bind(to_millis(now))
        .bind(to_millis(now - window))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record login request");
            StorageError::Database("Failed to record login request".to_string())
        })?;

        row.try_into()
    }

    async fn refund(&self, key: &str) -> Result<(), Error> {
        sqlx::query("UPDATE login_rate_limits SET hits = MAX(hits - 1, 0) WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to refund login request");
                StorageError::Database("Failed to refund login request".to_string())
            })?;

        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<(), Error> {
        sqlx::query("DELETE FROM login_rate_limits WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reset rate limit");
                StorageError::Database("Failed to reset rate limit".to_string())
            })?;

        Ok(())
    }

    async fn purge(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_rate_limits WHERE window_started_at < ?")
            .bind(to_millis(before))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to purge rate limit windows");
                StorageError::Database("Failed to purge rate limit windows".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests::setup_test_db;

    #[tokio::test]
    async fn test_hits_accumulate_within_window() {
        let repo = SqliteRateLimitRepository::new(setup_test_db().await);
        let now = Utc::now();
        let window = Duration::minutes(15);

        for expected in 1..=3 {
            let current = repo
                .hit("10.0.0.1", now + Duration::minutes(expected), window)
                .await
                .unwrap();
            assert_eq!(current.hits, expected as u32);
            assert_eq!(
                current.window_started_at.timestamp_millis(),
                (now + Duration::minutes(1)).timestamp_millis()
            );
        }
    }

    #[tokio::test]
    async fn test_expired_window_restarts() {
        let repo = SqliteRateLimitRepository::new(setup_test_db().await);
        let now = Utc::now();
        let window = Duration::minutes(15);

        repo.hit("10.0.0.1", now, window).await.unwrap();
        repo.hit("10.0.0.1", now, window).await.unwrap();

        let later = now + Duration::minutes(15);
        let current = repo.hit("10.0.0.1", later, window).await.unwrap();
        assert_eq!(current.hits, 1);
        assert_eq!(
            current.window_started_at.timestamp_millis(),
            later.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_refund_floors_at_zero() {
        let repo = SqliteRateLimitRepository::new(setup_test_db().await);
        let now = Utc::now();
        let window = Duration::minutes(15);

        repo.hit("10.0.0.1", now, window).await.unwrap();
        repo.refund("10.0.0.1").await.unwrap();
        repo.refund("10.0.0.1").await.unwrap();

        assert_eq!(repo.hit("10.0.0.1", now, window).await.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_purge_and_reset() {
        let repo = SqliteRateLimitRepository::new(setup_test_db().await);
        let now = Utc::now();
        let window = Duration::minutes(15);

        repo.hit("old", now - Duration::minutes(20), window)
            .await
            .unwrap();
        repo.hit("new", now, window).await.unwrap();

        assert_eq!(repo.purge(now - window).await.unwrap(), 1);

        repo.hit("new", now, window).await.unwrap();
        repo.reset("new").await.unwrap();
        assert_eq!(repo.hit("new", now, window).await.unwrap().hits, 1);
    }
}
