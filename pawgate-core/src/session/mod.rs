//! Session management
//!
//! A session is created when the admin logs in and is looked up on every
//! protected request through the token carried in the session cookie.
//!
//! | Field        | Type             | Description                                            |
//! | ------------ | ---------------- | ------------------------------------------------------ |
//! | `token`      | `SessionToken`   | The opaque token handed to the client.                 |
//! | `token_hash` | `String`         | SHA256 of the token; the only form that is stored.     |
//! | `identity`   | `AdminIdentity`  | The authenticated admin.                               |
//! | `user_agent` | `Option<String>` | The user agent of the client that created the session. |
//! | `ip_address` | `Option<String>` | The IP address of the client that created the session. |
//! | `created_at` | `DateTime`       | The timestamp when the session was created.            |
//! | `expires_at` | `DateTime`       | The timestamp when the session will expire.            |

use std::fmt;

use chrono::{DateTime, Utc};

use crate::{
    AdminIdentity,
    crypto::{generate_secure_token, hash_token, verify_token_hash},
};

/// Opaque session token with 256 bits of entropy.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap an existing token string, e.g. one read from a cookie.
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    pub fn new_random() -> Self {
        SessionToken(generate_secure_token())
    }

    /// A placeholder for sessions loaded from storage, where only the hash is known.
    pub fn empty() -> Self {
        SessionToken(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn token_hash(&self) -> String {
        hash_token(&self.0)
    }

    pub fn verify_hash(&self, stored_hash: &str) -> bool {
        verify_token_hash(&self.0, stored_hash)
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        SessionToken(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([redacted])")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub token_hash: String,
    pub identity: AdminIdentity,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        identity: AdminIdentity,
        user_agent: Option<String>,
        ip_address: Option<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let token = SessionToken::new_random();
        let token_hash = token.token_hash();
        Self {
            token,
            token_hash,
            identity,
            user_agent,
            ip_address,
            created_at,
            expires_at,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
