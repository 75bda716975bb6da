use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{
    SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use pawgate::RepositoryProvider;

use crate::{
    error::{ApiError, Result},
    extractors::{OptionalAdminUser, SessionTokenFromCookie},
    middleware::{AdminState, auth_middleware},
    types::*,
};

/// Admin API routes, relative to the prefix they are nested under.
pub fn create_router<R>(state: AdminState<R>) -> Router
where
    R: RepositoryProvider + 'static,
{
    Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/user", get(user_handler))
        .route("/health", get(health_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<R>,
        ))
        .with_state(state)
}

fn session_cookie(config: &CookieConfig, token: String) -> Cookie<'static> {
    let same_site = match config.same_site {
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::Lax => SameSite::Lax,
        CookieSameSite::None => SameSite::None,
    };

    Cookie::build((config.name.clone(), token))
        .path(config.path.clone())
        .http_only(config.http_only)
        .secure(config.secure)
        .same_site(same_site)
        .max_age(time::Duration::seconds(config.max_age.num_seconds()))
        .build()
}

async fn login_handler<R>(
    State(state): State<AdminState<R>>,
    jar: SignedCookieJar,
    connection_info: ConnectionInfo,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    // An unreadable body is treated like one with both fields missing.
    let LoginRequest { username, password } = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable login request body");
            LoginRequest::default()
        }
    };

    // Lockout and rate limiting are keyed by address, never by a shared fallback.
    let Some(client) = connection_info.ip else {
        tracing::error!(
            "Client address unavailable; serve with connect info or enable proxy trust"
        );
        return Err(ApiError::Configuration(
            "client address unavailable".to_string(),
        ));
    };
    let (identity, session) = state
        .pawgate
        .login(&username, &password, &client, connection_info.user_agent)
        .await?;

    let jar = jar.add(session_cookie(
        &state.cookie_config,
        session.token.into_inner(),
    ));

    Ok((jar, Json(identity)))
}

async fn logout_handler<R>(
    State(state): State<AdminState<R>>,
    jar: SignedCookieJar,
    SessionTokenFromCookie(session_token): SessionTokenFromCookie,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    if let Some(session_token) = session_token {
        state.pawgate.logout(&session_token).await?;
    }

    let jar = jar.remove(
        Cookie::build((state.cookie_config.name.clone(), ""))
            .path(state.cookie_config.path.clone()),
    );

    Ok((
        jar,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

async fn user_handler(OptionalAdminUser(identity): OptionalAdminUser) -> Result<impl IntoResponse> {
    identity.map(Json).ok_or(ApiError::Unauthorized)
}

async fn health_handler<R>(State(state): State<AdminState<R>>) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.pawgate.health_check().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
