use crate::{
    AdminIdentity, Clock, Error, Session, SystemClock, repositories::SessionRepository,
    session::SessionToken,
};
use chrono::Duration;
use std::sync::Arc;

/// Service for session management operations
pub struct SessionService<R: SessionRepository> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R: SessionRepository> SessionService<R> {
    /// Create a new SessionService with the given repository
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_clock(repository, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Create a new session for the admin
    pub async fn create_session(
        &self,
        identity: AdminIdentity,
        user_agent: Option<String>,
        ip_address: Option<String>,
        expires_in: Duration,
    ) -> Result<Session, Error> {
        let now = self.clock.now();
        let session = Session::new(identity, user_agent, ip_address, now, now + expires_in);

        self.repository.create(session).await
    }

    /// Get a session by token. Expired sessions are deleted and reported as absent.
    pub async fn get_session(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        let session = self.repository.find_by_token(token).await?;

        if let Some(ref s) = session {
            if s.is_expired_at(self.clock.now()) {
                self.repository.delete(token).await?;
                return Ok(None);
            }
        }

        Ok(session)
    }

    /// Delete a session
    pub async fn delete_session(&self, token: &SessionToken) -> Result<(), Error> {
        self.repository.delete(token).await
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, Error> {
        self.repository.cleanup_expired(self.clock.now()).await
    }

    /// Start a background task that removes expired sessions every `every`.
    pub fn start_cleanup_task(
        &self,
        every: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(every);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.cleanup_expired(clock.now()).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count = count, "Removed expired admin sessions");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to remove expired admin sessions");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down session cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
