//! Repository traits for data access layer
//!
//! This module defines the repository interfaces that services use to interact with storage.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus lifecycle methods
//!
//! Two backends ship with pawgate: [`MemoryRepositoryProvider`] in this crate,
//! for a single-instance deployment, and `SqliteRepositoryProvider` in
//! `pawgate-storage-sqlite`, which lets several instances share lockout, rate
//! limit and session state.

pub mod adapter;
pub mod attempt;
pub mod memory;
pub mod rate_limit;
pub mod session;

pub use adapter::{AttemptRepositoryAdapter, RateLimitRepositoryAdapter, SessionRepositoryAdapter};
pub use attempt::AttemptRepository;
pub use memory::{
    MemoryAttemptRepository, MemoryRateLimitRepository, MemoryRepositoryProvider,
    MemorySessionRepository,
};
pub use rate_limit::RateLimitRepository;
pub use session::SessionRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for session repository access.
pub trait SessionRepositoryProvider: Send + Sync + 'static {
    /// The session repository implementation type
    type SessionRepo: SessionRepository;

    /// Get the session repository
    fn session(&self) -> &Self::SessionRepo;
}

/// Provider trait for failed-attempt repository access.
pub trait AttemptRepositoryProvider: Send + Sync + 'static {
    /// The failed-attempt repository implementation type
    type AttemptRepo: AttemptRepository;

    /// Get the failed-attempt repository
    fn attempts(&self) -> &Self::AttemptRepo;
}

/// Provider trait for rate limit repository access.
pub trait RateLimitRepositoryProvider: Send + Sync + 'static {
    /// The rate limit repository implementation type
    type RateLimitRepo: RateLimitRepository;

    /// Get the rate limit repository
    fn rate_limits(&self) -> &Self::RateLimitRepo;
}

/// Provider trait that storage implementations must implement to provide all repositories.
///
/// # Implementing a Custom Storage Backend
///
/// 1. Implement each individual `*Repository` trait for your backend
/// 2. Implement each individual `*RepositoryProvider` trait
/// 3. Implement the `RepositoryProvider` trait with `migrate()` and `health_check()`
///
/// # Example
///
/// ```rust,ignore
/// use pawgate_core::repositories::*;
///
/// struct RedisStorage { /* ... */ }
///
/// impl AttemptRepositoryProvider for RedisStorage {
///     type AttemptRepo = RedisAttemptRepository;
///     fn attempts(&self) -> &Self::AttemptRepo { &self.attempts }
/// }
///
/// // ... implement other provider traits ...
///
/// #[async_trait]
/// impl RepositoryProvider for RedisStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    SessionRepositoryProvider + AttemptRepositoryProvider + RateLimitRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
