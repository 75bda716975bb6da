//! Core functionality for the pawgate admin authentication gate
//!
//! This crate contains the domain types shared by every other pawgate crate:
//! the admin identity and session structs, the error taxonomy, the credential
//! verifier, and the services that implement failed-attempt lockout, login
//! rate limiting and session management.
//!
//! Services never talk to storage directly. They go through the repository
//! traits in [`repositories`], which have an in-memory implementation here and
//! a SQLite implementation in `pawgate-storage-sqlite`.
//!
//! See [`AdminIdentity`] for the authenticated identity, [`Session`] for the
//! server-side session and [`services`] for the lockout, rate limit and session
//! services.
pub mod clock;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod repositories;
pub mod services;
pub mod session;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialPair, CredentialVerifier, EnvCredentialVerifier};
pub use error::Error;
pub use identity::AdminIdentity;
pub use repositories::{
    AttemptRepository, MemoryRepositoryProvider, RateLimitRepository, RepositoryProvider,
    SessionRepository,
};
pub use services::{LockoutService, RateLimitService, SessionService};
pub use session::{Session, SessionToken};
pub use storage::{
    AttemptRecord, LockoutConfig, LockoutStatus, RateLimitConfig, RateLimitDecision,
    RateLimitWindow,
};
