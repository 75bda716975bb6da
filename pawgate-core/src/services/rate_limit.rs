//! Fixed-window rate limiting for the login endpoint.
//!
//! Every request registers a hit up front through [`RateLimitService::check`].
//! A request that succeeds gives its hit back with [`RateLimitService::refund`],
//! so only requests that do not succeed count towards the limit. This runs in
//! front of, and independently of, the lockout service.

use std::sync::Arc;

use crate::{
    Clock, Error, SystemClock,
    error::AuthError,
    repositories::RateLimitRepository,
    storage::{RateLimitConfig, RateLimitDecision, ceil_seconds},
};

pub struct RateLimitService<R: RateLimitRepository> {
    repository: Arc<R>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl<R: RateLimitRepository> RateLimitService<R> {
    pub fn new(repository: Arc<R>, config: RateLimitConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        repository: Arc<R>,
        config: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `key` and decide whether it may proceed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RateLimited`] with the seconds left in the window
    /// once the client has used up its allowance.
    pub async fn check(&self, key: &str) -> Result<RateLimitDecision, Error> {
        if !self.config.enabled {
            return Ok(RateLimitDecision {
                key: key.to_string(),
                hits: 0,
                remaining: self.config.max_requests,
                resets_at: None,
            });
        }

        let now = self.clock.now();
        let window = self.repository.hit(key, now, self.config.window).await?;
        let resets_at = window.resets_at(self.config.window);

        if window.hits > self.config.max_requests {
            let retry_after = ceil_seconds(resets_at - now).max(1);
            tracing::warn!(
                ip = %key,
                hits = window.hits,
                retry_after = retry_after,
                "Login rate limit exceeded"
            );
            return Err(AuthError::RateLimited { retry_after }.into());
        }

        Ok(RateLimitDecision {
            key: key.to_string(),
            hits: window.hits,
            remaining: self.config.max_requests - window.hits,
            resets_at: Some(resets_at),
        })
    }

    /// Give back the hit taken by [`RateLimitService::check`] for a request that succeeded.
    pub async fn refund(&self, key: &str) -> Result<(), Error> {
        if !self.config.enabled {
            return Ok(());
        }
        self.repository.refund(key).await
    }

    pub async fn reset(&self, key: &str) -> Result<(), Error> {
        self.repository.reset(key).await
    }

    /// Delete windows that have already ended.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let before = self.clock.now() - self.config.window;
        self.repository.purge(before).await
    }

    /// Start a background task that purges ended windows every `every`.
    pub fn start_cleanup_task(
        &self,
        every: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);
        let window = self.config.window;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(every);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.purge(clock.now() - window).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count = count, "Purged ended rate limit windows");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to purge rate limit windows");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down rate limit cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
