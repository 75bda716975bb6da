use pawgate_core::error::{AuthError, ConfigurationError};

/// Errors returned by the [`Pawgate`](crate::Pawgate) facade.
///
/// Authentication failures keep their structured form so the HTTP layer can
/// pick a status code and a `Retry-After` value. Everything the caller cannot
/// act on collapses into [`PawgateError::Storage`].
#[derive(Debug, thiserror::Error)]
pub enum PawgateError {
    /// Error during authentication
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The request was missing or had malformed fields
    #[error("{0}")]
    Validation(String),
    /// The server cannot authenticate anyone until it is reconfigured
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Error when interacting with storage
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PawgateError {
    /// Seconds the client should wait before retrying, for lockouts and rate limits.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            PawgateError::Auth(AuthError::AccountLocked { retry_after })
            | PawgateError::Auth(AuthError::RateLimited { retry_after }) => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<pawgate_core::Error> for PawgateError {
    fn from(error: pawgate_core::Error) -> Self {
        match error {
            pawgate_core::Error::Auth(e) => PawgateError::Auth(e),
            pawgate_core::Error::Validation(e) => PawgateError::Validation(e.to_string()),
            pawgate_core::Error::Configuration(e) => PawgateError::Configuration(e.to_string()),
            other => PawgateError::Storage(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for PawgateError {
    fn from(error: ConfigurationError) -> Self {
        PawgateError::Configuration(error.to_string())
    }
}
