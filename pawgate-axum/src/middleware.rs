use std::sync::Arc;

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::{SignedCookieJar, cookie::Key};
use pawgate::{AdminIdentity, Pawgate, PawgateError, RepositoryProvider};
use pawgate_core::error::AuthError;

use crate::{
    error::ApiError,
    extractors::session_token,
    types::{CookieConfig, TrustProxy},
};

/// Shared state for the admin routes and the auth middleware.
pub struct AdminState<R: RepositoryProvider> {
    pub pawgate: Arc<Pawgate<R>>,
    pub cookie_config: CookieConfig,
    pub key: Key,
    pub trust_proxy: TrustProxy,
}

impl<R: RepositoryProvider> Clone for AdminState<R> {
    fn clone(&self) -> Self {
        Self {
            pawgate: self.pawgate.clone(),
            cookie_config: self.cookie_config.clone(),
            key: self.key.clone(),
            trust_proxy: self.trust_proxy,
        }
    }
}

impl<R: RepositoryProvider> FromRef<AdminState<R>> for Key {
    fn from_ref(state: &AdminState<R>) -> Self {
        state.key.clone()
    }
}

impl<R: RepositoryProvider> FromRef<AdminState<R>> for CookieConfig {
    fn from_ref(state: &AdminState<R>) -> Self {
        state.cookie_config.clone()
    }
}

impl<R: RepositoryProvider> FromRef<AdminState<R>> for TrustProxy {
    fn from_ref(state: &AdminState<R>) -> Self {
        state.trust_proxy
    }
}

async fn resolve_identity<R>(
    state: &AdminState<R>,
    jar: &SignedCookieJar,
) -> Result<Option<AdminIdentity>, PawgateError>
where
    R: RepositoryProvider,
{
    let Some(token) = session_token(jar, &state.cookie_config) else {
        return Ok(None);
    };
    match state.pawgate.current_identity(&token).await {
        Ok(identity) => Ok(Some(identity)),
        Err(PawgateError::Auth(AuthError::Unauthenticated)) => {
            tracing::debug!("Unknown or expired admin session");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Attach the admin identity to the request when a valid session cookie is present.
///
/// Never rejects; handlers decide with [`OptionalAdminUser`](crate::OptionalAdminUser).
pub async fn auth_middleware<R>(
    State(state): State<AdminState<R>>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    match resolve_identity(&state, &jar).await {
        Ok(Some(identity)) => {
            request.extensions_mut().insert(identity);
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "Failed to load admin session");
        }
    }

    next.run(request).await
}

/// Gate for protected routes: 401 unless the request carries a live admin session.
pub async fn require_auth<R>(
    State(state): State<AdminState<R>>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    R: RepositoryProvider,
{
    let identity = resolve_identity(&state, &jar)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
