use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pawgate_core::{
    AdminIdentity, Error, Session, error::StorageError, repositories::SessionRepository,
    session::SessionToken,
};
use sqlx::SqlitePool;

use crate::{from_millis, to_millis};

/// SQLite repository for admin sessions. Only the token hash is persisted.
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteSession {
    token_hash: String,
    username: String,
    identity_created_at: i64,
    user_agent: Option<String>,
    ip_address: Option<String>,
    created_at: i64,
    expires_at: i64,
}

impl SqliteSession {
    fn into_session(self, token: SessionToken) -> Result<Session, Error> {
        Ok(Session {
            token,
            token_hash: self.token_hash,
            identity: AdminIdentity::new(self.username, from_millis(self.identity_created_at)?),
            user_agent: self.user_agent,
            ip_address: self.ip_address,
            created_at: from_millis(self.created_at)?,
            expires_at: from_millis(self.expires_at)?,
        })
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        sqlx::query(
            r#"
            INSERT INTO admin_sessions
                (token_hash, username, identity_created_at, user_agent, ip_address, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.token_hash)
        .bind(&session.identity.username)
        .bind(to_millis(session.identity.created_at))
        .bind(&session.user_agent)
        .bind(&session.ip_address)
        .bind(to_millis(session.created_at))
        .bind(to_millis(session.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create session");
            StorageError::Database("Failed to create session".to_string())
        })?;

        Ok(session)
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        let row = sqlx::query_as::<_, SqliteSession>(
            r#"
            SELECT token_hash, username, identity_created_at, user_agent, ip_address, created_at, expires_at
            FROM admin_sessions
            WHERE token_hash = ?
            "#,
        )
        .bind(token.token_hash())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find session");
            StorageError::Database("Failed to find session".to_string())
        })?;

        match row {
            Some(row) if token.verify_hash(&row.token_hash) => {
                row.into_session(token.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        sqlx::query("DELETE FROM admin_sessions WHERE token_hash = ?")
            .bind(token.token_hash())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete session");
                StorageError::Database("Failed to delete session".to_string())
            })?;

        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE expires_at <= ?")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clean up expired sessions");
                StorageError::Database("Failed to clean up expired sessions".to_string())
            })?;

        Ok(result.rows_affected())
    }
}
