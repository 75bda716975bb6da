//! # Pawgate Axum Integration
//!
//! Axum routes and middleware for the pawgate admin login gate.
//!
//! | Route                     | Description                                   |
//! | ------------------------- | --------------------------------------------- |
//! | `POST /api/admin/login`   | Log in, set the signed session cookie.        |
//! | `POST /api/admin/logout`  | Destroy the session and clear the cookie.     |
//! | `GET /api/admin/user`     | The logged-in admin, or 401.                  |
//! | `GET /api/admin/health`   | Storage health check and crate version.       |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{Router, routing::get};
//! use pawgate::PawgateBuilder;
//! use pawgate_axum::{AdminUser, CookieConfig, admin_routes, cookie_key_from_secret};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pawgate = Arc::new(PawgateBuilder::new().with_memory_storage().build().await?);
//!
//!     let app: Router = admin_routes(pawgate)
//!         .with_cookie_config(CookieConfig::development())
//!         .with_cookie_key(cookie_key_from_secret("change me"))
//!         .protect(Router::new().route("/api/posts", get(list_posts)))
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//!
//! async fn list_posts(AdminUser(admin): AdminUser) -> String {
//!     format!("posts visible to {}", admin.username)
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use axum_extra::extract::cookie::Key;
pub use error::{ApiError, CONFIGURATION_ERROR_MESSAGE, Result};
pub use extractors::{AdminUser, OptionalAdminUser, SessionTokenFromCookie};
pub use middleware::{AdminState, auth_middleware, require_auth};
pub use routes::create_router;
pub use types::{
    ConnectionInfo, CookieConfig, CookieSameSite, HealthResponse, LoginRequest, MessageResponse,
    TrustProxy,
};

use axum::Router;
use pawgate::{Pawgate, RepositoryProvider};
use sha2::{Digest, Sha512};
use std::sync::Arc;

/// Path the admin API is served under.
pub const ADMIN_API_PREFIX: &str = "/api/admin";

/// Derive the cookie signing key from a secret of any length.
pub fn cookie_key_from_secret(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

/// Create the admin routes for your Axum application.
///
/// # Example
///
/// ```rust,no_run
/// # use axum::Router;
/// # use pawgate::{Pawgate, RepositoryProvider};
/// # use std::sync::Arc;
/// # fn example<R: RepositoryProvider + 'static>(pawgate: Arc<Pawgate<R>>) {
/// let app: Router = pawgate_axum::admin_routes(pawgate).build();
/// # }
/// ```
pub fn admin_routes<R>(pawgate: Arc<Pawgate<R>>) -> AdminRouterBuilder<R>
where
    R: RepositoryProvider + 'static,
{
    AdminRouterBuilder {
        pawgate,
        cookie_config: CookieConfig::default(),
        key: None,
        trust_proxy: TrustProxy::default(),
        protected: Vec::new(),
    }
}

/// Builder for configuring the admin routes
pub struct AdminRouterBuilder<R: RepositoryProvider> {
    pawgate: Arc<Pawgate<R>>,
    cookie_config: CookieConfig,
    key: Option<Key>,
    trust_proxy: TrustProxy,
    protected: Vec<Router>,
}

impl<R: RepositoryProvider + 'static> AdminRouterBuilder<R> {
    pub fn with_cookie_config(mut self, config: CookieConfig) -> Self {
        self.cookie_config = config;
        self
    }

    /// Key used to sign the session cookie. Without one a random key is
    /// generated and sessions do not survive a restart.
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.key = Some(key);
        self
    }

    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    pub fn trust_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy = TrustProxy(trust);
        self
    }

    /// Serve `routes` behind [`require_auth`].
    pub fn protect(mut self, routes: Router) -> Self {
        self.protected.push(routes);
        self
    }

    /// Build the router with the configured options
    pub fn build(self) -> Router {
        let key = self.key.unwrap_or_else(|| {
            tracing::warn!("No cookie signing key configured, generating a random one");
            Key::generate()
        });

        let state = AdminState {
            pawgate: self.pawgate,
            cookie_config: self.cookie_config,
            key,
            trust_proxy: self.trust_proxy,
        };

        let mut router = Router::new().nest(ADMIN_API_PREFIX, create_router(state.clone()));
        for routes in self.protected {
            router = router.merge(routes.route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_auth::<R>,
            )));
        }
        router
    }
}

impl<R: RepositoryProvider + 'static> From<AdminRouterBuilder<R>> for Router {
    fn from(builder: AdminRouterBuilder<R>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_key_is_stable_per_secret() {
        let a = cookie_key_from_secret("secret");
        let b = cookie_key_from_secret("secret");
        let c = cookie_key_from_secret("other");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
