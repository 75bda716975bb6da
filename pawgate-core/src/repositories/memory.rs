//! In-memory repositories.
//!
//! State lives in [`DashMap`]s and is lost when the process exits. Each
//! operation runs under the map's per-shard lock, so concurrent requests and
//! the background sweep can touch the same key safely. Suitable for a single
//! server instance; use the SQLite backend to share state between instances.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::{
    Error, Session,
    repositories::{
        AttemptRepository, AttemptRepositoryProvider, RateLimitRepository,
        RateLimitRepositoryProvider, RepositoryProvider, SessionRepository,
        SessionRepositoryProvider,
    },
    session::SessionToken,
    storage::{AttemptRecord, RateLimitWindow},
};

#[derive(Debug, Default, Clone)]
pub struct MemoryAttemptRepository {
    records: Arc<DashMap<String, AttemptRecord>>,
}

impl MemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl AttemptRepository for MemoryAttemptRepository {
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error> {
        Ok(self.records.get(key).map(|r| r.value().clone()))
    }

    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<AttemptRecord, Error> {
        let mut entry = self
            .records
            .entry(key.to_string())
            .or_insert_with(|| AttemptRecord::new(key, at));
        entry.count += 1;
        entry.last_failed_at = at;
        Ok(entry.value().clone())
    }

    async fn set_lock_until(
        &self,
        key: &str,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        if let Some(mut record) = self.records.get_mut(key) {
            record.lock_until = lock_until;
        }
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<bool, Error> {
        Ok(self.records.remove(key).is_some())
    }

    async fn purge(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.records.len();
        self.records.retain(|_, record| match record.lock_until {
            Some(until) => now < until,
            None => record.last_failed_at >= stale_before,
        });
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryRateLimitRepository {
    windows: Arc<DashMap<String, RateLimitWindow>>,
}

impl MemoryRateLimitRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitRepository for MemoryRateLimitRepository {
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitWindow, Error> {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateLimitWindow::new(key, now));
        if entry.is_expired_at(now, window) {
            *entry = RateLimitWindow::new(key, now);
        }
        entry.hits += 1;
        Ok(entry.value().clone())
    }

    async fn refund(&self, key: &str) -> Result<(), Error> {
        if let Some(mut window) = self.windows.get_mut(key) {
            window.hits = window.hits.saturating_sub(1);
        }
        Ok(())
    }

    async fn reset(&self, key: &str) -> Result<(), Error> {
        self.windows.remove(key);
        Ok(())
    }

    async fn purge(&self, before: DateTime<Utc>) -> Result<u64, Error> {
        let count = self.windows.len();
        self.windows
            .retain(|_, window| window.window_started_at >= before);
        Ok(count.saturating_sub(self.windows.len()) as u64)
    }
}

/// Sessions keyed by the SHA256 hash of their token.
#[derive(Debug, Default, Clone)]
pub struct MemorySessionRepository {
    sessions: Arc<DashMap<String, Session>>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.sessions
            .insert(session.token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        let token_hash = token.token_hash();
        Ok(self
            .sessions
            .get(&token_hash)
            .filter(|s| token.verify_hash(&s.token_hash))
            .map(|s| Session {
                token: token.clone(),
                ..s.value().clone()
            }))
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.sessions.remove(&token.token_hash());
        Ok(())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error> {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before.saturating_sub(self.sessions.len()) as u64)
    }
}

/// Repository provider backed entirely by process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryRepositoryProvider {
    session: MemorySessionRepository,
    attempts: MemoryAttemptRepository,
    rate_limits: MemoryRateLimitRepository,
}

impl MemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepositoryProvider for MemoryRepositoryProvider {
    type SessionRepo = MemorySessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }
}

impl AttemptRepositoryProvider for MemoryRepositoryProvider {
    type AttemptRepo = MemoryAttemptRepository;

    fn attempts(&self) -> &Self::AttemptRepo {
        &self.attempts
    }
}

impl RateLimitRepositoryProvider for MemoryRepositoryProvider {
    type RateLimitRepo = MemoryRateLimitRepository;

    fn rate_limits(&self) -> &Self::RateLimitRepo {
        &self.rate_limits
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
