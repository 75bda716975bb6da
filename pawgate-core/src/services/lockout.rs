//! Failed-attempt lockout service, keyed by client IP.
//!
//! Each client moves through three states:
//!
//! - **Clean**: no record.
//! - **Warming**: 1 to `max_failed_attempts - 1` consecutive failures.
//! - **Locked**: the failure that reaches `max_failed_attempts` stamps
//!   `lock_until = now + lockout_period`.
//!
//! A successful login from the client deletes its record whatever the state.
//! Expiry is lazy: the first check after `lock_until` deletes the record and
//! reports the client as clean. The hourly sweep started by
//! [`LockoutService::start_cleanup_task`] only bounds memory; correctness does
//! not depend on it.
//!
//! # Example
//!
//! ```rust,ignore
//! use pawgate_core::{LockoutConfig, LockoutService, repositories::MemoryAttemptRepository};
//!
//! let service = LockoutService::new(
//!     Arc::new(MemoryAttemptRepository::new()),
//!     LockoutConfig::default(),
//! );
//!
//! if service.is_locked("192.168.1.200").await? {
//!     // reject with 423
//! }
//!
//! let status = service.record_failed_attempt("192.168.1.200").await?;
//! ```

use std::sync::Arc;

use crate::{
    Clock, Error, SystemClock,
    repositories::AttemptRepository,
    storage::{AttemptRecord, LockoutConfig, LockoutStatus},
};

/// Service for tracking failed logins and locking out clients.
///
/// # Thread Safety
///
/// This service is thread-safe and can be shared across multiple tasks.
/// The underlying repository handles concurrent access appropriately.
pub struct LockoutService<R: AttemptRepository> {
    repository: Arc<R>,
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
}

impl<R: AttemptRepository> LockoutService<R> {
    /// Create a new LockoutService that reads wall clock time.
    pub fn new(repository: Arc<R>, config: LockoutConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Get the current lockout status for a client.
    ///
    /// An elapsed lockout is deleted here and reported as clean.
    pub async fn get_lockout_status(&self, key: &str) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();

        if !self.config.enabled {
            return Ok(LockoutStatus::clean(key, now));
        }

        match self.current_record(key, now).await? {
            Some(record) => Ok(self.status_from(&record, now)),
            None => Ok(LockoutStatus::clean(key, now)),
        }
    }

    /// Check if a client is currently locked out (convenience method).
    pub async fn is_locked(&self, key: &str) -> Result<bool, Error> {
        Ok(self.get_lockout_status(key).await?.is_locked)
    }

    /// Record a failed login attempt and return the updated status.
    ///
    /// The failure that brings the count to `max_failed_attempts` stamps the
    /// lockout expiry. If protection is disabled, this is a no-op that returns
    /// a clean status.
    pub async fn record_failed_attempt(&self, key: &str) -> Result<LockoutStatus, Error> {
        let now = self.clock.now();

        if !self.config.enabled {
            return Ok(LockoutStatus::clean(key, now));
        }

        // Start over if a previous lockout has already run out.
        self.current_record(key, now).await?;

        let mut record = self.repository.record_failure(key, now).await?;

        if record.count >= self.config.max_failed_attempts && record.lock_until.is_none() {
            let lock_until = now + self.config.lockout_period;
            self.repository
                .set_lock_until(key, Some(lock_until))
                .await?;
            record.lock_until = Some(lock_until);

            tracing::warn!(
                ip = %key,
                failed_attempts = record.count,
                locked_until = %lock_until,
                "Too many failed login attempts, locking out client"
            );
        } else {
            tracing::warn!(
                ip = %key,
                failed_attempts = record.count,
                "Failed login attempt"
            );
        }

        Ok(self.status_from(&record, now))
    }

    /// Clear all attempts for a client on successful login.
    pub async fn reset_attempts(&self, key: &str) -> Result<(), Error> {
        self.repository.clear(key).await?;
        Ok(())
    }

    /// Unlock a client regardless of its state.
    ///
    /// # Returns
    ///
    /// `true` if the client was locked, `false` otherwise.
    pub async fn unlock(&self, key: &str) -> Result<bool, Error> {
        let was_locked = self.is_locked(key).await?;
        self.repository.clear(key).await?;
        Ok(was_locked)
    }

    /// Remove expired lockouts and stale warming records.
    pub async fn sweep(&self) -> Result<u64, Error> {
        sweep_attempts(self.repository.as_ref(), self.clock.as_ref(), &self.config).await
    }

    /// Start the background sweep task.
    ///
    /// This spawns a task that runs [`LockoutService::sweep`] every
    /// `config.sweep_interval` until `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(config.sweep_interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match sweep_attempts(repository.as_ref(), clock.as_ref(), &config).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(
                                    count = count,
                                    "Swept expired failed login attempt records"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "Failed to sweep failed login attempt records"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down lockout sweep task");
                        break;
                    }
                }
            }
        })
    }

    async fn current_record(
        &self,
        key: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<AttemptRecord>, Error> {
        match self.repository.get(key).await? {
            Some(record) if record.is_lock_expired_at(now) => {
                self.repository.clear(key).await?;
                tracing::debug!(ip = %key, "Lockout expired");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn status_from(
        &self,
        record: &AttemptRecord,
        now: chrono::DateTime<chrono::Utc>,
    ) -> LockoutStatus {
        let is_locked = record.is_locked_at(now);
        LockoutStatus {
            key: record.key.clone(),
            failed_attempts: record.count,
            is_locked,
            locked_until: if is_locked { record.lock_until } else { None },
            evaluated_at: now,
        }
    }
}

async fn sweep_attempts<R: AttemptRepository + ?Sized>(
    repository: &R,
    clock: &dyn Clock,
    config: &LockoutConfig,
) -> Result<u64, Error> {
    let now = clock.now();
    repository
        .purge(now, now - config.retention_period)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ManualClock, repositories::MemoryAttemptRepository};
    use chrono::Duration;

    fn service_with(
        config: LockoutConfig,
    ) -> (
        LockoutService<MemoryAttemptRepository>,
        Arc<MemoryAttemptRepository>,
        ManualClock,
    ) {
        let repo = Arc::new(MemoryAttemptRepository::new());
        let clock = ManualClock::default();
        let service = LockoutService::with_clock(repo.clone(), config, Arc::new(clock.clone()));
        (service, repo, clock)
    }

    #[tokio::test]
    async fn test_disabled_protection_returns_unlocked() {
        let (service, repo, _) = service_with(LockoutConfig::disabled());

        let status = service.record_failed_attempt("10.0.0.1").await.unwrap();
        assert!(!status.is_locked);
        assert_eq!(status.failed_attempts, 0);
        assert!(repo.is_empty());
        assert!(!service.is_enabled());
    }

    #[tokio::test]
    async fn test_single_attempt_is_warming() {
        let (service, _, _) = service_with(LockoutConfig::default());

        let status = service.record_failed_attempt("10.0.0.1").await.unwrap();
        assert!(!status.is_locked);
        assert_eq!(status.failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_fifth_failure_locks_for_thirty_minutes() {
        let (service, repo, clock) = service_with(LockoutConfig::default());

        for _ in 0..4 {
            let status = service.record_failed_attempt("192.168.1.200").await.unwrap();
            assert!(!status.is_locked);
        }

        let status = service.record_failed_attempt("192.168.1.200").await.unwrap();
        assert!(status.is_locked);
        assert_eq!(status.failed_attempts, 5);
        assert_eq!(
            status.locked_until,
            Some(clock.now() + Duration::minutes(30))
        );
        assert_eq!(status.retry_after_seconds(), Some(30 * 60));

        let record = repo.get("192.168.1.200").await.unwrap().unwrap();
        assert!(record.lock_until.is_some());
    }

    #[tokio::test]
    async fn test_lock_expires_lazily() {
        let (service, repo, clock) = service_with(LockoutConfig::default());

        for _ in 0..5 {
            service.record_failed_attempt("192.168.1.200").await.unwrap();
        }
        assert!(service.is_locked("192.168.1.200").await.unwrap());

        clock.advance(Duration::minutes(31));

        let status = service.get_lockout_status("192.168.1.200").await.unwrap();
        assert!(!status.is_locked);
        assert_eq!(status.failed_attempts, 0);
        assert!(repo.get("192.168.1.200").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_after_expiry_starts_fresh_count() {
        let (service, _, clock) = service_with(LockoutConfig::default());

        for _ in 0..5 {
            service.record_failed_attempt("10.0.0.1").await.unwrap();
        }
        clock.advance(Duration::minutes(30));

        let status = service.record_failed_attempt("10.0.0.1").await.unwrap();
        assert_eq!(status.failed_attempts, 1);
        assert!(!status.is_locked);
    }

    #[tokio::test]
    async fn test_reset_attempts_clears_counter() {
        let (service, _, _) = service_with(LockoutConfig::default());

        for _ in 0..4 {
            service.record_failed_attempt("10.0.0.1").await.unwrap();
        }
        service.reset_attempts("10.0.0.1").await.unwrap();

        // One more failure must not lock after a reset.
        let status = service.record_failed_attempt("10.0.0.1").await.unwrap();
        assert_eq!(status.failed_attempts, 1);
        assert!(!status.is_locked);
    }

    #[tokio::test]
    async fn test_unlock_returns_was_locked() {
        let config = LockoutConfig {
            max_failed_attempts: 2,
            ..LockoutConfig::default()
        };
        let (service, _, _) = service_with(config);

        for _ in 0..2 {
            service.record_failed_attempt("10.0.0.1").await.unwrap();
        }

        assert!(service.unlock("10.0.0.1").await.unwrap());
        assert!(!service.unlock("10.0.0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_clients_tracked_separately() {
        let (service, _, _) = service_with(LockoutConfig::default());

        for _ in 0..5 {
            service.record_failed_attempt("10.0.0.1").await.unwrap();
        }

        assert!(service.is_locked("10.0.0.1").await.unwrap());
        let other = service.get_lockout_status("10.0.0.2").await.unwrap();
        assert!(!other.is_locked);
        assert_eq!(other.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_lockouts() {
        let (service, repo, clock) = service_with(LockoutConfig::default());

        for _ in 0..5 {
            service.record_failed_attempt("10.0.0.1").await.unwrap();
        }
        service.record_failed_attempt("10.0.0.2").await.unwrap();

        clock.advance(Duration::minutes(45));
        assert_eq!(service.sweep().await.unwrap(), 1);
        assert!(repo.get("10.0.0.1").await.unwrap().is_none());
        assert!(repo.get("10.0.0.2").await.unwrap().is_some());

        clock.advance(Duration::hours(24));
        assert_eq!(service.sweep().await.unwrap(), 1);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_shutdown() {
        let (service, _, _) = service_with(LockoutConfig::default());
        let (tx, rx) = tokio::sync::watch::channel(false);

        let handle = service.start_cleanup_task(rx);
        tx.send(true).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("cleanup task did not stop")
            .unwrap();
    }
}
