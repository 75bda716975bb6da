//! # Pawgate
//!
//! Pawgate guards the admin area of a website with a single administrator
//! account configured through environment variables. It checks credentials,
//! locks out clients that keep guessing, rate limits the login endpoint and
//! issues server-side sessions.
//!
//! Lockout and rate limit state are keyed by client IP address and live
//! behind the repository traits in `pawgate-core`. The in-memory backend suits
//! a single server; the SQLite backend lets several instances share state.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pawgate::PawgateBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from ADMIN_USERNAME / ADMIN_PASSWORD
//!     let pawgate = PawgateBuilder::new()
//!         .with_memory_storage()
//!         .build()
//!         .await?;
//!
//!     let (identity, session) = pawgate
//!         .login("admin@example.com", "secret", "203.0.113.7", None)
//!         .await?;
//!     println!("{} logged in, token {}", identity.username, session.token);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use chrono::Duration;
use pawgate_core::{
    Clock, LockoutService, RateLimitService, SessionService,
    error::{AuthError, ValidationError},
    repositories::{AttemptRepositoryAdapter, RateLimitRepositoryAdapter, SessionRepositoryAdapter},
};
use tokio::{sync::watch, task::JoinHandle};

mod builder;
mod error;

pub use builder::{NoStorage, PawgateBuilder, PawgateBuilderError, WithStorage};
pub use error::PawgateError;

/// Re-export core types from pawgate_core
pub use pawgate_core::{
    AdminIdentity, CredentialPair, CredentialVerifier, EnvCredentialVerifier, LockoutConfig,
    LockoutStatus, ManualClock, MemoryRepositoryProvider, RateLimitConfig, RepositoryProvider,
    Session, SessionToken, SystemClock,
};

#[cfg(feature = "sqlite")]
pub use pawgate_storage_sqlite::SqliteRepositoryProvider;

/// The configuration for admin sessions.
///
/// # Example
///
/// ```rust
/// use pawgate::SessionConfig;
/// use chrono::Duration;
///
/// let config = SessionConfig::default().expires_in(Duration::hours(8));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// The duration until the session expires
    pub expires_in: Duration,
    /// How often expired sessions are removed from storage
    pub cleanup_interval: std::time::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expires_in: Duration::hours(24),
            cleanup_interval: std::time::Duration::from_secs(60 * 60),
        }
    }
}

impl SessionConfig {
    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = duration;
        self
    }

    pub fn cleanup_interval(mut self, interval: std::time::Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

/// The admin authentication coordinator.
///
/// `Pawgate` owns the credential verifier and the lockout, rate limit and
/// session services, all built on one repository provider. Build it once with
/// [`PawgateBuilder`] and share it behind an `Arc`.
pub struct Pawgate<R: RepositoryProvider> {
    repositories: Arc<R>,
    credentials: Arc<dyn CredentialVerifier>,
    lockout_service: Arc<LockoutService<AttemptRepositoryAdapter<R>>>,
    rate_limit_service: Arc<RateLimitService<RateLimitRepositoryAdapter<R>>>,
    session_service: Arc<SessionService<SessionRepositoryAdapter<R>>>,
    session_config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl<R: RepositoryProvider> Pawgate<R> {
    pub(crate) fn from_parts(
        repositories: Arc<R>,
        credentials: Arc<dyn CredentialVerifier>,
        lockout_config: LockoutConfig,
        rate_limit_config: RateLimitConfig,
        session_config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lockout_service = Arc::new(LockoutService::with_clock(
            Arc::new(AttemptRepositoryAdapter::new(repositories.clone())),
            lockout_config,
            clock.clone(),
        ));
        let rate_limit_service = Arc::new(RateLimitService::with_clock(
            Arc::new(RateLimitRepositoryAdapter::new(repositories.clone())),
            rate_limit_config,
            clock.clone(),
        ));
        let session_service = Arc::new(SessionService::with_clock(
            Arc::new(SessionRepositoryAdapter::new(repositories.clone())),
            clock.clone(),
        ));

        Self {
            repositories,
            credentials,
            lockout_service,
            rate_limit_service,
            session_service,
            session_config,
            clock,
        }
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    pub async fn migrate(&self) -> Result<(), PawgateError> {
        self.repositories
            .migrate()
            .await
            .map_err(|e| PawgateError::Storage(e.to_string()))
    }

    pub async fn health_check(&self) -> Result<(), PawgateError> {
        self.repositories
            .health_check()
            .await
            .map_err(|e| PawgateError::Storage(e.to_string()))
    }

    /// Log the admin in from `ip`.
    ///
    /// The checks run in this order, and the first that fails decides the error:
    ///
    /// 1. Both fields present ([`PawgateError::Validation`]). Neither the rate
    ///    limit nor the lockout record is touched.
    /// 2. Rate limit for `ip` ([`AuthError::RateLimited`]).
    /// 3. Lockout for `ip` ([`AuthError::AccountLocked`]).
    /// 4. Credentials still configured ([`PawgateError::Configuration`]).
    /// 5. Credentials match ([`AuthError::InvalidCredentials`], recorded as a
    ///    failed attempt).
    ///
    /// On success the failed-attempt record for `ip` is cleared, the rate
    /// limit hit is given back and a new session is created.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip: &str,
        user_agent: Option<String>,
    ) -> Result<(AdminIdentity, Session), PawgateError> {
        if username.is_empty() || password.is_empty() {
            return Err(pawgate_core::Error::from(ValidationError::MissingCredentials).into());
        }

        self.rate_limit_service.check(ip).await?;

        let status = self.lockout_service.get_lockout_status(ip).await?;
        if status.is_locked {
            tracing::warn!(ip = %ip, "Login attempt from locked out client");
            return Err(AuthError::AccountLocked {
                retry_after: status.retry_after_seconds().unwrap_or(1),
            }
            .into());
        }

        if let Err(e) = self.credentials.ensure_ready().await {
            tracing::error!(error = %e, "Admin credentials are not available");
            return Err(PawgateError::Configuration(e.to_string()));
        }

        if !self.credentials.verify(username, password).await? {
            self.lockout_service.record_failed_attempt(ip).await?;
            return Err(AuthError::InvalidCredentials.into());
        }

        self.lockout_service.reset_attempts(ip).await?;

        let identity = AdminIdentity::new(username, self.clock.now());
        let session = self
            .session_service
            .create_session(
                identity.clone(),
                user_agent,
                Some(ip.to_string()),
                self.session_config.expires_in,
            )
            .await?;

        self.rate_limit_service.refund(ip).await?;

        tracing::info!(ip = %ip, username = %identity.username, "Admin logged in");
        Ok((identity, session))
    }

    /// Destroy the session for `token`. Unknown tokens are not an error.
    pub async fn logout(&self, token: &SessionToken) -> Result<(), PawgateError> {
        self.session_service
            .delete_session(token)
            .await
            .map_err(|e| PawgateError::Storage(e.to_string()))?;
        tracing::debug!("Admin session destroyed");
        Ok(())
    }

    /// Resolve a session token to its live session.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthenticated`] if the token is unknown or expired.
    pub async fn get_session(&self, token: &SessionToken) -> Result<Session, PawgateError> {
        self.session_service
            .get_session(token)
            .await?
            .ok_or(PawgateError::Auth(AuthError::Unauthenticated))
    }

    pub async fn current_identity(
        &self,
        token: &SessionToken,
    ) -> Result<AdminIdentity, PawgateError> {
        Ok(self.get_session(token).await?.identity)
    }

    pub async fn lockout_status(&self, ip: &str) -> Result<LockoutStatus, PawgateError> {
        Ok(self.lockout_service.get_lockout_status(ip).await?)
    }

    /// Lift a lockout and forget the client's rate limit window.
    ///
    /// Returns `true` if the client was locked out.
    pub async fn unlock(&self, ip: &str) -> Result<bool, PawgateError> {
        let was_locked = self.lockout_service.unlock(ip).await?;
        self.rate_limit_service.reset(ip).await?;
        if was_locked {
            tracing::info!(ip = %ip, "Client unlocked");
        }
        Ok(was_locked)
    }

    /// Spawn the lockout sweep, rate limit purge and session cleanup tasks.
    ///
    /// All three stop when `shutdown` changes.
    pub fn start_maintenance_tasks(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let sweep_interval = self.lockout_service.config().sweep_interval;
        vec![
            self.lockout_service.start_cleanup_task(shutdown.clone()),
            self.rate_limit_service
                .start_cleanup_task(sweep_interval, shutdown.clone()),
            self.session_service
                .start_cleanup_task(self.session_config.cleanup_interval, shutdown),
        ]
    }
}
