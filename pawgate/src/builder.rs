//! Builder for constructing [`Pawgate`] instances
//!
//! Storage must be chosen before anything else; the type-state markers
//! [`NoStorage`] and [`WithStorage`] make [`PawgateBuilder::build`] available
//! only once it has been.
//!
//! # Example
//!
//! ```rust,no_run
//! use pawgate::PawgateBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pawgate = PawgateBuilder::new()
//!         .with_sqlite("sqlite://pawgate.db")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     pawgate.health_check().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use chrono::Duration;
use pawgate_core::{
    Clock, CredentialVerifier, EnvCredentialVerifier, LockoutConfig, MemoryRepositoryProvider,
    RateLimitConfig, RepositoryProvider, SystemClock,
};

use crate::{Pawgate, SessionConfig};

/// Errors that can occur when building a Pawgate instance.
#[derive(Debug, thiserror::Error)]
pub enum PawgateBuilderError {
    /// Failed to connect to storage backend
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Failed to run database migrations
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Admin credentials or other settings are missing or invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no storage has been configured yet.
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

/// A type-safe builder for constructing [`Pawgate`] instances.
///
/// Unless [`PawgateBuilder::with_credentials`] is called, `build` loads the
/// admin credentials from the environment and fails if they are missing.
pub struct PawgateBuilder<Storage> {
    storage: Storage,
    credentials: Option<Arc<dyn CredentialVerifier>>,
    session_config: SessionConfig,
    lockout_config: LockoutConfig,
    rate_limit_config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    apply_migrations: bool,
}

impl Default for PawgateBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl PawgateBuilder<NoStorage> {
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            credentials: None,
            session_config: SessionConfig::default(),
            lockout_config: LockoutConfig::default(),
            rate_limit_config: RateLimitConfig::default(),
            clock: Arc::new(SystemClock),
            apply_migrations: false,
        }
    }

    /// Use an already constructed repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> PawgateBuilder<WithStorage<R>> {
        PawgateBuilder {
            storage: WithStorage { repositories },
            credentials: self.credentials,
            session_config: self.session_config,
            lockout_config: self.lockout_config,
            rate_limit_config: self.rate_limit_config,
            clock: self.clock,
            apply_migrations: self.apply_migrations,
        }
    }

    /// Keep all state in process memory.
    pub fn with_memory_storage(self) -> PawgateBuilder<WithStorage<MemoryRepositoryProvider>> {
        self.with_repositories(Arc::new(MemoryRepositoryProvider::new()))
    }
}

#[cfg(feature = "sqlite")]
impl PawgateBuilder<NoStorage> {
    /// Connect to SQLite at `url`, creating the database file if needed.
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<PawgateBuilder<WithStorage<crate::SqliteRepositoryProvider>>, PawgateBuilderError>
    {
        let repositories = pawgate_storage_sqlite::connect(url)
            .await
            .map_err(|e| PawgateBuilderError::StorageConnection(e.to_string()))?;

        Ok(self.with_repositories(Arc::new(repositories)))
    }

    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> PawgateBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

impl<R: RepositoryProvider> PawgateBuilder<WithStorage<R>> {
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialVerifier>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_session_expiry(mut self, duration: Duration) -> Self {
        self.session_config.expires_in = duration;
        self
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn with_lockout(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit_config = config;
        self
    }

    /// Replace the wall clock, e.g. with a `ManualClock` in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    pub async fn build(self) -> Result<Pawgate<R>, PawgateBuilderError> {
        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => Arc::new(
                EnvCredentialVerifier::from_env()
                    .map_err(|e| PawgateBuilderError::InvalidConfiguration(e.to_string()))?,
            ),
        };

        if self.apply_migrations {
            self.storage
                .repositories
                .migrate()
                .await
                .map_err(|e| PawgateBuilderError::Migration(e.to_string()))?;
        }

        Ok(Pawgate::from_parts(
            self.storage.repositories,
            credentials,
            self.lockout_config,
            self.rate_limit_config,
            self.session_config,
            self.clock,
        ))
    }
}
