//! End-to-end tests for the admin API

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use chrono::Duration;
use pawgate::{
    CredentialPair, EnvCredentialVerifier, ManualClock, PawgateBuilder, RateLimitConfig,
};
use pawgate_axum::{AdminUser, CookieConfig, admin_routes, cookie_key_from_secret};
use serde_json::{Value, json};
use tower::ServiceExt;

const USERNAME: &str = "admin@test.com";
const PASSWORD: &str = "secure-password-123";
const CLIENT: &str = "192.168.1.200";

struct TestApp {
    router: Router,
    clock: ManualClock,
}

async fn posts(AdminUser(admin): AdminUser) -> String {
    format!("posts for {}", admin.username)
}

async fn setup_with(rate_limit: RateLimitConfig) -> TestApp {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let clock = ManualClock::default();
    let pawgate = PawgateBuilder::new()
        .with_memory_storage()
        .with_credentials(Arc::new(EnvCredentialVerifier::from_pair(
            CredentialPair::new(USERNAME, PASSWORD),
        )))
        .with_rate_limit(rate_limit)
        .with_clock(Arc::new(clock.clone()))
        .build()
        .await
        .expect("Failed to build Pawgate");

    let router = admin_routes(Arc::new(pawgate))
        .with_cookie_config(CookieConfig::development())
        .with_cookie_key(cookie_key_from_secret("test-secret"))
        .trust_proxy(true)
        .protect(Router::new().route("/api/posts", get(posts)))
        .build();

    TestApp { router, clock }
}

async fn setup() -> TestApp {
    setup_with(RateLimitConfig::default()).await
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn login_from(&self, ip: &str, body: Value) -> Response {
        self.send(
            Request::post("/api/admin/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", ip)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> Response {
        self.login_from(CLIENT, json!({ "username": username, "password": password }))
            .await
    }

    async fn get_with_cookie(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::get(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("No Set-Cookie header")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn test_login_success_returns_identity_without_password() {
    let app = setup().await;

    let response = app.login(USERNAME, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("pawgate.sid="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=86400"));

    let body = body_json(response).await;
    assert_eq!(body["id"], "admin");
    assert_eq!(body["username"], USERNAME);
    assert!(body.get("createdAt").is_some());
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_missing_fields_return_400_without_counting_failures() {
    let app = setup().await;

    for body in [
        json!({ "username": USERNAME }),
        json!({ "password": PASSWORD }),
        json!({ "username": "", "password": "" }),
        json!({}),
    ] {
        let response = app.login_from(CLIENT, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Username and password are required", "code": 400 })
        );
    }

    // Four failures still leave room before the lockout and the rate limit
    for _ in 0..4 {
        let response = app.login(USERNAME, "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(app.login(USERNAME, PASSWORD).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_repeated_empty_submissions_stay_bad_requests() {
    let app = setup().await;

    for _ in 0..8 {
        let response = app.login("", "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
    assert_eq!(app.login(USERNAME, PASSWORD).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_body_is_a_bad_request() {
    let app = setup().await;
    let response = app
        .send(
            Request::post("/api/admin/login")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-forwarded-for", CLIENT)
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_username_and_password_are_indistinguishable() {
    let app = setup().await;

    let bad_user = app.login("nobody@test.com", PASSWORD).await;
    let bad_password = app.login(USERNAME, "wrong-password").await;

    assert_eq!(bad_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(bad_password.status(), StatusCode::UNAUTHORIZED);

    let bad_user = body_bytes(bad_user).await;
    let bad_password = body_bytes(bad_password).await;
    assert_eq!(bad_user, bad_password);
    assert_eq!(
        serde_json::from_slice::<Value>(&bad_user).unwrap(),
        json!({ "error": "Invalid credentials", "code": 401 })
    );
}

#[tokio::test]
async fn test_sixth_attempt_is_blocked() {
    let app = setup().await;

    for _ in 0..5 {
        let response = app.login(USERNAME, "wrong").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.login(USERNAME, PASSWORD).await;
    assert!(matches!(
        response.status(),
        StatusCode::LOCKED | StatusCode::TOO_MANY_REQUESTS
    ));
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let body = body_json(response).await;
    assert!(body["retryAfter"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_lockout_answers_423_when_rate_limit_is_off() {
    let app = setup_with(RateLimitConfig::disabled()).await;

    for _ in 0..5 {
        app.login(USERNAME, "wrong").await;
    }

    let response = app.login(USERNAME, PASSWORD).await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    assert_eq!(response.headers()[header::RETRY_AFTER], "1800");
    assert_eq!(
        body_json(response).await["error"],
        "Too many failed login attempts, try again in 1800 seconds"
    );
}

#[tokio::test]
async fn test_other_clients_are_not_blocked() {
    let app = setup().await;

    for _ in 0..5 {
        app.login(USERNAME, "wrong").await;
    }

    let response = app
        .login_from(
            "10.0.0.1",
            json!({ "username": USERNAME, "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_success_resets_failure_counter() {
    let app = setup().await;

    for _ in 0..4 {
        app.login(USERNAME, "wrong").await;
    }
    assert_eq!(app.login(USERNAME, PASSWORD).await.status(), StatusCode::OK);

    // A lockout would need five fresh failures now
    let response = app.login(USERNAME, "wrong").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_lockout_is_evaluated_fresh_after_thirty_one_minutes() {
    let app = setup().await;

    for _ in 0..5 {
        app.login(USERNAME, "wrong").await;
    }
    assert_ne!(app.login(USERNAME, PASSWORD).await.status(), StatusCode::OK);

    app.clock.advance(Duration::minutes(31));
    assert_eq!(app.login(USERNAME, PASSWORD).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_user_endpoint_follows_session() {
    let app = setup().await;

    let response = app.get_with_cookie("/api/admin/user", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = session_cookie(&app.login(USERNAME, PASSWORD).await);
    let response = app.get_with_cookie("/api/admin/user", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], USERNAME);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = setup().await;
    let cookie = session_cookie(&app.login(USERNAME, PASSWORD).await);

    let response = app
        .send(
            Request::post("/api/admin/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cleared.starts_with("pawgate.sid="));
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Logged out successfully" })
    );

    let response = app.get_with_cookie("/api/admin/user", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_cookie_is_rejected() {
    let app = setup().await;
    let cookie = session_cookie(&app.login(USERNAME, PASSWORD).await);
    let tampered = format!("{cookie}x");

    let response = app.get_with_cookie("/api/admin/user", Some(&tampered)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_expires_after_a_day() {
    let app = setup().await;
    let cookie = session_cookie(&app.login(USERNAME, PASSWORD).await);

    app.clock.advance(Duration::hours(24));
    let response = app.get_with_cookie("/api/admin/user", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let app = setup().await;

    let response = app.get_with_cookie("/api/posts", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Not authenticated", "code": 401 })
    );

    let cookie = session_cookie(&app.login(USERNAME, PASSWORD).await);
    let response = app.get_with_cookie("/api/posts", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"posts for admin@test.com");
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let response = app.get_with_cookie("/api/admin/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_login_refused_when_client_address_is_unknown() {
    let pawgate = PawgateBuilder::new()
        .with_memory_storage()
        .with_credentials(Arc::new(EnvCredentialVerifier::from_pair(
            CredentialPair::new(USERNAME, PASSWORD),
        )))
        .build()
        .await
        .unwrap();
    let router = admin_routes(Arc::new(pawgate))
        .with_cookie_key(cookie_key_from_secret("test-secret"))
        .build();

    for password in ["wrong", PASSWORD] {
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "username": USERNAME, "password": password }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Server configuration error", "code": 500 })
        );
    }
}

#[tokio::test]
async fn test_socket_address_used_without_proxy_trust() {
    use axum::extract::connect_info::MockConnectInfo;
    use std::net::SocketAddr;

    let pawgate = PawgateBuilder::new()
        .with_memory_storage()
        .with_credentials(Arc::new(EnvCredentialVerifier::from_pair(
            CredentialPair::new(USERNAME, PASSWORD),
        )))
        .build()
        .await
        .unwrap();
    let router = admin_routes(Arc::new(pawgate))
        .with_cookie_key(cookie_key_from_secret("test-secret"))
        .build()
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

    // Rotating X-Forwarded-For does not dodge the limit
    for i in 0..6 {
        let response = router
            .clone()
            .oneshot(
                Request::post("/api/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header("x-forwarded-for", format!("10.0.0.{i}"))
                    .body(Body::from(
                        json!({ "username": USERNAME, "password": "wrong" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        if i < 5 {
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        } else {
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }
}
