use crate::{
    Error, Session,
    repositories::{AttemptRepository, RateLimitRepository, RepositoryProvider, SessionRepository},
    session::SessionToken,
    storage::{AttemptRecord, RateLimitWindow},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements SessionRepository
pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.provider.session().create(session).await
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        self.provider.session().find_by_token(token).await
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.provider.session().delete(token).await
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.session().cleanup_expired(now).await
    }
}

/// Adapter that wraps a RepositoryProvider and implements AttemptRepository
pub struct AttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AttemptRepository for AttemptRepositoryAdapter<R> {
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error> {
        self.provider.attempts().get(key).await
    }

    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<AttemptRecord, Error> {
        self.provider.attempts().record_failure(key, at).await
    }

    async fn set_lock_until(
        &self,
        key: &str,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        self.provider.attempts().set_lock_until(key, lock_until).await
    }

    async fn clear(&self, key: &str) -> Result<bool, Error> {
        self.provider.attempts().clear(key).await
    }

    async fn purge(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.attempts().purge(now, stale_before).await
    }
}

/// Adapter that wraps a RepositoryProvider and implements RateLimitRepository
pub struct RateLimitRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> RateLimitRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> RateLimitRepository for RateLimitRepositoryAdapter<R> {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitWindow, Error> {
        self.provider.rate_limits().hit(key, now, window).await
    }

    async fn refund(&self, key: &str) -> Result<(), Error> {
        self.provider.rate_limits().refund(key).await
    }

    async fn reset(&self, key: &str) -> Result<(), Error> {
        self.provider.rate_limits().reset(key).await
    }

    async fn purge(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        self.provider.rate_limits().purge(before).await
    }
}
