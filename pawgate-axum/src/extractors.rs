use std::net::SocketAddr;

use axum::{
    Extension, RequestPartsExt,
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, request::Parts},
};
use axum_extra::{
    TypedHeader,
    extract::{SignedCookieJar, cookie::Key},
    headers::UserAgent,
};
use pawgate::{AdminIdentity, SessionToken};

use crate::{
    error::ApiError,
    types::{ConnectionInfo, CookieConfig, TrustProxy},
};

/// Client address from proxy headers: the first `X-Forwarded-For` entry, then `X-Real-IP`.
pub(crate) fn forwarded_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl<S> FromRequestParts<S> for ConnectionInfo
where
    S: Send + Sync,
    TrustProxy: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .extract::<Option<TypedHeader<UserAgent>>>()
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid user agent header"))?
            .map(|ua| ua.to_string());

        let TrustProxy(trust_proxy) = TrustProxy::from_ref(state);
        let forwarded = if trust_proxy {
            forwarded_client_ip(&parts.headers)
        } else {
            None
        };

        let ip = match forwarded {
            Some(ip) => Some(ip),
            None => parts
                .extract::<ConnectInfo<SocketAddr>>()
                .await
                .ok()
                .map(|ConnectInfo(addr)| addr.ip().to_string()),
        };

        Ok(ConnectionInfo { ip, user_agent })
    }
}

/// The logged-in admin. Rejects with 401 when the request has no session.
pub struct AdminUser(pub AdminIdentity);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(identity): Extension<AdminIdentity> =
            parts.extract().await.map_err(|_| ApiError::Unauthorized)?;

        Ok(AdminUser(identity))
    }
}

pub struct OptionalAdminUser(pub Option<AdminIdentity>);

impl<S> FromRequestParts<S> for OptionalAdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<AdminIdentity>().cloned();

        Ok(OptionalAdminUser(identity))
    }
}

/// Session token from the signed session cookie. Tampered cookies read as absent.
pub struct SessionTokenFromCookie(pub Option<SessionToken>);

impl<S> FromRequestParts<S> for SessionTokenFromCookie
where
    S: Send + Sync,
    Key: FromRef<S>,
    CookieConfig: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::<Key>::from_headers(&parts.headers, Key::from_ref(state));
        let cookie_config = CookieConfig::from_ref(state);

        Ok(SessionTokenFromCookie(session_token(&jar, &cookie_config)))
    }
}

pub(crate) fn session_token(
    jar: &SignedCookieJar,
    cookie_config: &CookieConfig,
) -> Option<SessionToken> {
    jar.get(&cookie_config.name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .map(SessionToken::from)
}
