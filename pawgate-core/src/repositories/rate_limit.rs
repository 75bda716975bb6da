//! Repository trait for fixed-window rate limit counters.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{Error, storage::RateLimitWindow};

/// Repository for per-client request counters.
#[async_trait]
pub trait RateLimitRepository: Send + Sync + 'static {
    /// Count one request for `key`.
    ///
    /// If the key has no window, or its window started `window` or more before
    /// `now`, a new window starting at `now` is opened with one hit. Otherwise
    /// the hit count of the current window is incremented.
    ///
    /// # Returns
    ///
    /// The window after the hit has been counted.
    async fn hit(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<RateLimitWindow, Error>;

    /// Take back one hit for `key`, never going below zero.
    async fn refund(&self, key: &str) -> Result<(), Error>;

    /// Drop the window for `key`.
    async fn reset(&self, key: &str) -> Result<(), Error>;

    /// Delete windows that started before `before`.
    ///
    /// # Returns
    ///
    /// The number of windows deleted.
    async fn purge(&self, before: DateTime<Utc>) -> Result<u64, Error>;
}
