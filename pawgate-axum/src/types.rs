use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Body of `POST /login`. Missing fields deserialize as empty strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Client address and user agent of a request.
///
/// `ip` is `None` when neither trusted proxy headers nor the socket address
/// are available, i.e. the router was served without connect info.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Whether `X-Forwarded-For` and `X-Real-IP` are believed.
///
/// Only enable this behind a reverse proxy that overwrites those headers,
/// otherwise any client can pick its own lockout key.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustProxy(pub bool);

#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "pawgate.sid".to_string(),
            http_only: true,
            secure: true,
            same_site: CookieSameSite::Lax,
            path: "/".to_string(),
            max_age: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum CookieSameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl CookieConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Cookie settings for plain-HTTP development servers.
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}
