//! Integration tests for login, logout and login throttling.

#![allow(clippy::unwrap_used)]

use adak_integration_tests::{CookieJar, TEST_PASSWORD, TestApp};
use axum::http::StatusCode;
use chrono::TimeDelta;
use serde_json::json;

const EMAIL: &str = "ada@example.com";

fn credentials(password: &str) -> serde_json::Value {
    json!({ "email": EMAIL, "password": password })
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health", &mut CookieJar::new()).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, b"ok");
    assert!(response.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_login_sets_session_authorization_and_cart_cookies() {
    let app = TestApp::new();
    let user_id = app.register("ada", EMAIL).await;

    let mut jar = CookieJar::new();
    let response = app
        .post("/auth/login", &mut jar, &credentials(TEST_PASSWORD))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["user_id"], user_id);

    let sid = jar.get("SID").unwrap();
    assert_eq!(sid.len(), 32);
    assert!(app.state.sessions().is_active(sid));
    assert!(jar.get("UID").unwrap().starts_with(&format!("{user_id}.")));
    assert_eq!(jar.get("CID").unwrap().len(), 32);

    let set_cookie: Vec<_> = response
        .headers
        .get_all("set-cookie")
        .iter()
        .map(|v| v.to_str().unwrap().to_owned())
        .collect();
    assert_eq!(set_cookie.len(), 3);
    for cookie in set_cookie {
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Strict"), "{cookie}");
        assert!(cookie.contains("Path=/"), "{cookie}");
    }
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;

    let response = app
        .post(
            "/auth/login",
            &mut CookieJar::new(),
            &json!({ "email": "  ADA@Example.com ", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejected_while_logged_in() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;
    let mut jar = app.login(EMAIL).await;

    let response = app
        .post("/auth/login", &mut jar, &credentials(TEST_PASSWORD))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.state.sessions().len(), 1);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;

    let wrong_password = app
        .post("/auth/login", &mut CookieJar::new(), &credentials("nope-nope-nope"))
        .await;
    let unknown_email = app
        .post(
            "/auth/login",
            &mut CookieJar::new(),
            &json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.json(), unknown_email.json());
}

#[tokio::test]
async fn test_failed_logins_back_off_linearly() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;
    let mut jar = CookieJar::new();

    let first = app.post("/auth/login", &mut jar, &credentials("wrong-one")).await;
    assert_eq!(first.status, StatusCode::UNAUTHORIZED);

    // Even the right password is refused until the backoff elapses.
    let throttled = app
        .post("/auth/login", &mut jar, &credentials(TEST_PASSWORD))
        .await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(throttled.header("retry-after"), Some("2"));

    app.clock.advance(TimeDelta::seconds(2));
    let second = app.post("/auth/login", &mut jar, &credentials("wrong-two")).await;
    assert_eq!(second.status, StatusCode::UNAUTHORIZED);

    let throttled = app
        .post("/auth/login", &mut jar, &credentials(TEST_PASSWORD))
        .await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(throttled.header("retry-after"), Some("4"));

    app.clock.advance(TimeDelta::seconds(3));
    let still_throttled = app
        .post("/auth/login", &mut jar, &credentials(TEST_PASSWORD))
        .await;
    assert_eq!(still_throttled.header("retry-after"), Some("1"));

    app.clock.advance(TimeDelta::seconds(1));
    let ok = app
        .post("/auth/login", &mut jar, &credentials(TEST_PASSWORD))
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(app.state.throttle().failures(EMAIL), 0);
}

#[tokio::test]
async fn test_throttle_is_per_identity() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;
    app.register("grace", "grace@example.com").await;

    let failed = app
        .post("/auth/login", &mut CookieJar::new(), &credentials("wrong"))
        .await;
    assert_eq!(failed.status, StatusCode::UNAUTHORIZED);

    let other = app
        .post(
            "/auth/login",
            &mut CookieJar::new(),
            &json!({ "email": "grace@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(other.status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_destroys_session_and_clears_cookies() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;
    let mut jar = app.login(EMAIL).await;
    let sid = jar.get("SID").unwrap().to_owned();

    let response = app.post("/auth/logout", &mut jar, &json!({})).await;

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(!app.state.sessions().is_active(&sid));
    assert!(jar.get("SID").is_none());
    assert!(jar.get("UID").is_none());
    assert!(jar.get("CID").is_none());

    // The old token no longer grants access.
    let mut stale = CookieJar::new();
    stale.set("SID", &sid);
    let response = app.get("/users", &mut stale).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let app = TestApp::new();
    let response = app
        .post("/auth/logout", &mut CookieJar::new(), &json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_idle_session_expires_after_sweep() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;
    let mut jar = app.login(EMAIL).await;

    app.clock.advance(TimeDelta::hours(121));
    let swept = app
        .state
        .sessions()
        .sweep_expired(app.state.config().session.max_idle);
    assert_eq!(swept, 1);

    let response = app.get("/users", &mut jar).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_activity_keeps_session_alive() {
    let app = TestApp::new();
    app.register("ada", EMAIL).await;
    let mut jar = app.login(EMAIL).await;
    let max_idle = app.state.config().session.max_idle;

    for _ in 0..3 {
        app.clock.advance(TimeDelta::hours(100));
        assert_eq!(app.get("/users", &mut jar).await.status, StatusCode::OK);
        assert_eq!(app.state.sessions().sweep_expired(max_idle), 0);
    }
}
