//! Records and configuration shared by the services and the repositories.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Failed login attempts from one client, keyed by IP address.
///
/// `count` is the number of consecutive failures. `lock_until` is stamped when
/// `count` reaches the configured maximum; once it has elapsed the record must
/// be treated as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub key: String,
    pub count: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub last_failed_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(key: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            count: 0,
            lock_until: None,
            last_failed_at: at,
        }
    }

    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.is_some_and(|until| now < until)
    }

    /// A lockout that has run its course. Warming records never expire this way.
    pub fn is_lock_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.is_some_and(|until| now >= until)
    }
}

/// The lockout state of one client as seen at `evaluated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutStatus {
    pub key: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub evaluated_at: DateTime<Utc>,
}

impl LockoutStatus {
    pub fn clean(key: &str, evaluated_at: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
            evaluated_at,
        }
    }

    /// Whole seconds until the lock lifts, rounded up. `None` when not locked.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        if !self.is_locked {
            return None;
        }
        self.locked_until
            .map(|until| ceil_seconds(until - self.evaluated_at))
    }
}

/// Configuration for failed-attempt lockout.
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    pub enabled: bool,
    /// Consecutive failures that trigger a lockout.
    pub max_failed_attempts: u32,
    /// How long a triggered lockout lasts.
    pub lockout_period: Duration,
    /// Unlocked records with no failure for this long are dropped by the sweep.
    pub retention_period: Duration,
    /// How often the background sweep runs.
    pub sweep_interval: std::time::Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            lockout_period: Duration::minutes(30),
            retention_period: Duration::hours(24),
            sweep_interval: std::time::Duration::from_secs(3600),
        }
    }
}

impl LockoutConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Requests counted against one client in the current fixed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub key: String,
    pub hits: u32,
    pub window_started_at: DateTime<Utc>,
}

impl RateLimitWindow {
    pub fn new(key: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            hits: 0,
            window_started_at: at,
        }
    }

    pub fn resets_at(&self, window: Duration) -> DateTime<Utc> {
        self.window_started_at + window
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now >= self.resets_at(window)
    }
}

/// Configuration for the login rate limiter.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 5,
            window: Duration::minutes(15),
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Outcome of an admitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub key: String,
    pub hits: u32,
    pub remaining: u32,
    pub resets_at: Option<DateTime<Utc>>,
}

pub(crate) fn ceil_seconds(duration: Duration) -> u64 {
    let millis = duration.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}
