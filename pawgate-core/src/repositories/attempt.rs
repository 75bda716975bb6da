//! Repository trait for failed-attempt tracking.
//!
//! This module defines the storage interface behind the lockout service. Keys
//! are client IP addresses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{Error, storage::AttemptRecord};

/// Repository for failed login attempt records.
///
/// The lockout state machine lives in
/// [`LockoutService`](crate::services::LockoutService); implementations only
/// need to make each operation atomic for a single key. A shared backend (such
/// as the SQLite store) makes lockouts consistent across server instances.
#[async_trait]
pub trait AttemptRepository: Send + Sync + 'static {
    /// Get the record for a key, if one exists.
    async fn get(&self, key: &str) -> Result<Option<AttemptRecord>, Error>;

    /// Increment the failure count for a key, creating the record if needed.
    ///
    /// # Arguments
    ///
    /// * `key` - The client key (IP address)
    /// * `at` - The time of the failed attempt
    ///
    /// # Returns
    ///
    /// The record after the increment.
    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<AttemptRecord, Error>;

    /// Set or clear the lockout expiry for a key. A missing record is ignored.
    async fn set_lock_until(
        &self,
        key: &str,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<(), Error>;

    /// Delete the record for a key.
    ///
    /// # Returns
    ///
    /// `true` if a record was deleted.
    async fn clear(&self, key: &str) -> Result<bool, Error>;

    /// Delete records whose lockout has expired by `now`, and unlocked records
    /// whose last failure is older than `stale_before`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn purge(&self, now: DateTime<Utc>, stale_before: DateTime<Utc>) -> Result<u64, Error>;
}
