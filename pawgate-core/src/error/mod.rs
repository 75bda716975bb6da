use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Cryptographic error: {0}")]
    Crypto(#[from] CryptoError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately the same for an unknown username and a wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Too many failed login attempts, try again in {retry_after} seconds")]
    AccountLocked { retry_after: u64 },

    #[error("Too many login requests, try again in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Not authenticated")]
    Unauthenticated,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    /// Username or password was empty.
    #[error("Username and password are required")]
    MissingCredentials,
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Admin credentials are not configured (set {primary} or {legacy})")]
    MissingCredentials {
        primary: &'static str,
        legacy: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Seconds a client should wait before retrying, for lockout and rate limit errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::Auth(AuthError::AccountLocked { retry_after })
            | Error::Auth(AuthError::RateLimited { retry_after }) => Some(*retry_after),
            _ => None,
        }
    }
}
