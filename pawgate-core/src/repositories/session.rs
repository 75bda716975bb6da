use crate::{Error, Session, session::SessionToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository for session data access
#[async_trait]
pub trait SessionRepository: Send + Sync + 'static {
    /// Create a new session
    async fn create(&self, session: Session) -> Result<Session, Error>;

    /// Find a session by token
    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error>;

    /// Delete a session by token
    async fn delete(&self, token: &SessionToken) -> Result<(), Error>;

    /// Delete sessions that expired before `now`, returning how many were removed
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, Error>;
}
