//! Cryptographic utilities for credentials and session tokens
//!
//! Session tokens are 256-bit random values. Only their SHA256 hash is ever
//! stored, and lookups compare hashes in constant time via the `subtle` crate.
//!
//! The admin password is hashed with argon2 (through `password-auth`) as soon
//! as it is read from the environment, so the plaintext never outlives startup.
//!
//! See: <https://cheatsheetseries.owasp.org/cheatsheets/Authentication_Cheat_Sheet.html#compare-password-hashes-using-safe-functions>

use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{Error, error::CryptoError};

/// Generate a cryptographically secure random token.
///
/// This produces a 256-bit (32-byte) random token encoded as URL-safe base64
/// (43 characters).
///
/// # Panics
///
/// Panics if the OS random number generator fails. This indicates a critical
/// system failure (e.g., /dev/urandom unavailable) from which recovery is not
/// possible for security-sensitive operations.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Hash a token for storage. Returns the hex-encoded SHA256 digest.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a token against a stored hash with constant-time comparison.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_token(token);
    constant_time_compare(computed_hash.as_bytes(), stored_hash.as_bytes())
}

/// Perform constant-time comparison of two byte slices.
///
/// Slices of different length compare unequal immediately; only the length is
/// leaked, never the position of the first differing byte.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hash a password using argon2 with a random salt.
pub fn hash_password(password: &str) -> String {
    password_auth::generate_hash(password)
}

/// Verify a password against an argon2 hash produced by [`hash_password`].
///
/// A mismatch is `Ok(false)`; only a malformed hash is an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    match password_auth::verify_password(password, hash) {
        Ok(()) => Ok(true),
        Err(password_auth::VerifyError::PasswordInvalid) => Ok(false),
        Err(e) => Err(CryptoError::PasswordHash(e.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_token() {
        let token = "test_token_12345";
        let hash = hash_token(token);

        assert!(verify_token_hash(token, &hash));
        assert!(!verify_token_hash("wrong_token", &hash));
    }

    #[test]
    fn test_hash_produces_hex_string() {
        let hash = hash_token("test_token");

        // SHA256 produces 32 bytes = 64 hex chars
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_secure_token_is_unique() {
        let a = generate_secure_token();
        let b = generate_secure_token();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(constant_time_compare(b"", b""));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"short", b"longer_string"));
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("secure-password-123");
        assert_ne!(hash, "secure-password-123");
        assert!(verify_password("secure-password-123", &hash).unwrap());
        assert!(!verify_password("secure-password-124", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_rejects_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
