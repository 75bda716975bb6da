//! The authenticated admin identity
//!
//! This is what a session carries and what the login and "current user"
//! endpoints return. It never contains a secret.
//!
//! | Field        | Type       | Description                                  |
//! | ------------ | ---------- | -------------------------------------------- |
//! | `id`         | `String`   | Always `"admin"` for the environment admin.  |
//! | `username`   | `String`   | The username that logged in.                 |
//! | `created_at` | `DateTime` | When the identity was established (login).   |
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const ADMIN_ID: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl AdminIdentity {
    pub fn new(username: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ADMIN_ID.to_string(),
            username: username.into(),
            created_at,
        }
    }
}
