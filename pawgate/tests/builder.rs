//! Tests for the Pawgate builder

use std::sync::Arc;

use pawgate::{CredentialPair, EnvCredentialVerifier, PawgateBuilder, PawgateBuilderError};

fn credentials() -> Arc<EnvCredentialVerifier> {
    Arc::new(EnvCredentialVerifier::from_pair(CredentialPair::new(
        "admin@test.com",
        "secure-password-123",
    )))
}

#[tokio::test]
async fn test_builder_with_memory_storage() {
    let pawgate = PawgateBuilder::new()
        .with_memory_storage()
        .with_credentials(credentials())
        .build()
        .await
        .expect("Failed to build Pawgate");

    pawgate.health_check().await.expect("Health check failed");
    assert_eq!(pawgate.session_config().expires_in, chrono::Duration::hours(24));
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_with_sqlite() {
    let pawgate = PawgateBuilder::new()
        .with_sqlite("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite")
        .with_credentials(credentials())
        .apply_migrations(true)
        .build()
        .await
        .expect("Failed to build Pawgate");

    pawgate.health_check().await.expect("Health check failed");

    let (identity, session) = pawgate
        .login("admin@test.com", "secure-password-123", "127.0.0.1", None)
        .await
        .expect("Login failed");
    let current = pawgate
        .current_identity(&session.token)
        .await
        .expect("Session not found");
    assert_eq!(current.username, identity.username);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_manual_migration() {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to SQLite");

    let pawgate = PawgateBuilder::new()
        .with_sqlite_pool(pool)
        .with_credentials(credentials())
        .build()
        .await
        .expect("Failed to build Pawgate");

    pawgate.migrate().await.expect("Migration failed");
    pawgate.migrate().await.expect("Second migration failed");
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_builder_rejects_bad_database_url() {
    let result = PawgateBuilder::new()
        .with_sqlite("postgres://localhost/nope")
        .await;
    assert!(matches!(
        result,
        Err(PawgateBuilderError::StorageConnection(_))
    ));
}
