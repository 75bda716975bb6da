//! Admin credential loading and verification
//!
//! The admin console has a single administrator whose credentials come from the
//! process environment. The primary pair is `ADMIN_USERNAME` / `ADMIN_PASSWORD`;
//! deployments that predate it may still set the legacy pair `ADMIN_EMAIL` /
//! `ADMIN_PASS`. A pair is only used when both halves are present and
//! non-empty, and the primary pair always wins.
//!
//! The password is hashed with argon2 when it is loaded and the plaintext is
//! dropped. Verification goes through the [`CredentialVerifier`] trait so that
//! the login flow does not care where credentials come from.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    Error,
    crypto::{constant_time_compare, hash_password, verify_password},
    error::{ConfigurationError, CryptoError},
};

pub const USERNAME_VAR: &str = "ADMIN_USERNAME";
pub const PASSWORD_VAR: &str = "ADMIN_PASSWORD";
pub const LEGACY_USERNAME_VAR: &str = "ADMIN_EMAIL";
pub const LEGACY_PASSWORD_VAR: &str = "ADMIN_PASS";

/// Looks up a configuration key, returning `None` when it is unset.
pub type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A username/password pair read from configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub username: String,
    password: String,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Load the pair from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load the pair through an arbitrary key lookup, primary pair first.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let read = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let (Some(username), Some(password)) = (read(USERNAME_VAR), read(PASSWORD_VAR)) {
            return Ok(Self::new(username, password));
        }

        if let (Some(username), Some(password)) =
            (read(LEGACY_USERNAME_VAR), read(LEGACY_PASSWORD_VAR))
        {
            tracing::warn!(
                "Using legacy {LEGACY_USERNAME_VAR}/{LEGACY_PASSWORD_VAR} admin credentials, \
                 rename them to {USERNAME_VAR}/{PASSWORD_VAR}"
            );
            return Ok(Self::new(username, password));
        }

        Err(ConfigurationError::MissingCredentials {
            primary: "ADMIN_USERNAME/ADMIN_PASSWORD",
            legacy: "ADMIN_EMAIL/ADMIN_PASS",
        }
        .into())
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Checks a submitted username and password.
#[async_trait]
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Confirm the credential source is still usable.
    ///
    /// Called once per login attempt before [`CredentialVerifier::verify`]. A
    /// failure is a server configuration fault for that request only.
    async fn ensure_ready(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Returns `Ok(false)` for any mismatch, without saying which half was wrong.
    async fn verify(&self, username: &str, password: &str) -> Result<bool, Error>;
}

/// Verifies against the single admin configured in the environment.
pub struct EnvCredentialVerifier {
    username: String,
    password_hash: String,
    source: Option<Lookup>,
}

impl EnvCredentialVerifier {
    /// Load credentials from the process environment.
    ///
    /// Fails with [`ConfigurationError::MissingCredentials`] when neither pair
    /// is set; callers are expected to treat that as fatal at startup.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(Arc::new(|key: &str| std::env::var(key).ok()))
    }

    /// Load credentials through `lookup`, keeping it to re-check readiness later.
    pub fn from_lookup(lookup: Lookup) -> Result<Self, Error> {
        let pair = CredentialPair::from_lookup(lookup.as_ref())?;
        let mut verifier = Self::from_pair(pair);
        verifier.source = Some(lookup);
        Ok(verifier)
    }

    /// Build a verifier from an already loaded pair. It is always ready.
    pub fn from_pair(pair: CredentialPair) -> Self {
        let password_hash = hash_password(pair.password());
        tracing::debug!(username = %pair.username, "Loaded admin credentials");
        Self {
            username: pair.username,
            password_hash,
            source: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for EnvCredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentialVerifier")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for EnvCredentialVerifier {
    async fn ensure_ready(&self) -> Result<(), Error> {
        match &self.source {
            Some(lookup) => CredentialPair::from_lookup(lookup.as_ref()).map(|_| ()),
            None => Ok(()),
        }
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, Error> {
        let username_matches =
            constant_time_compare(username.as_bytes(), self.username.as_bytes());

        // The hash is checked even for an unknown username so both failures take
        // the same time.
        let password = password.to_string();
        let hash = self.password_hash.clone();
        let password_matches =
            tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .map_err(|e| CryptoError::PasswordHash(e.to_string()))??;

        Ok(username_matches && password_matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> Lookup {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(move |key: &str| map.get(key).cloned())
    }

    #[test]
    fn test_primary_pair_is_loaded() {
        let lookup = lookup_from(&[
            (USERNAME_VAR, "admin@test.com"),
            (PASSWORD_VAR, "secure-password-123"),
            (LEGACY_USERNAME_VAR, "old@test.com"),
            (LEGACY_PASSWORD_VAR, "old-password"),
        ]);
        let pair = CredentialPair::from_lookup(lookup.as_ref()).unwrap();
        assert_eq!(pair.username, "admin@test.com");
        assert_eq!(pair.password(), "secure-password-123");
    }

    #[test]
    fn test_legacy_pair_is_fallback() {
        let lookup = lookup_from(&[
            (LEGACY_USERNAME_VAR, "old@test.com"),
            (LEGACY_PASSWORD_VAR, "old-password"),
        ]);
        let pair = CredentialPair::from_lookup(lookup.as_ref()).unwrap();
        assert_eq!(pair.username, "old@test.com");
    }

    #[test]
    fn test_half_pairs_are_not_mixed() {
        let lookup = lookup_from(&[
            (USERNAME_VAR, "admin@test.com"),
            (LEGACY_PASSWORD_VAR, "old-password"),
        ]);
        let err = CredentialPair::from_lookup(lookup.as_ref()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let lookup = lookup_from(&[(USERNAME_VAR, ""), (PASSWORD_VAR, "")]);
        assert!(CredentialPair::from_lookup(lookup.as_ref()).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let pair = CredentialPair::new("admin", "hunter2");
        let rendered = format!("{pair:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_verify_accepts_exact_pair_only() {
        let verifier = EnvCredentialVerifier::from_pair(CredentialPair::new(
            "admin@test.com",
            "secure-password-123",
        ));

        assert!(
            verifier
                .verify("admin@test.com", "secure-password-123")
                .await
                .unwrap()
        );
        assert!(
            !verifier
                .verify("admin@test.com", "wrong-password")
                .await
                .unwrap()
        );
        assert!(
            !verifier
                .verify("someone@test.com", "secure-password-123")
                .await
                .unwrap()
        );
        assert!(
            !verifier
                .verify("ADMIN@test.com", "secure-password-123")
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_ensure_ready_detects_removed_credentials() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let present = Arc::new(AtomicBool::new(true));
        let flag = present.clone();
        let lookup: Lookup = Arc::new(move |key: &str| {
            if !flag.load(Ordering::SeqCst) {
                return None;
            }
            match key {
                USERNAME_VAR => Some("admin".to_string()),
                PASSWORD_VAR => Some("password".to_string()),
                _ => None,
            }
        });

        let verifier = EnvCredentialVerifier::from_lookup(lookup).unwrap();
        assert!(verifier.ensure_ready().await.is_ok());

        present.store(false, Ordering::SeqCst);
        let err = verifier.ensure_ready().await.unwrap_err();
        assert!(err.is_configuration_error());
    }
}
