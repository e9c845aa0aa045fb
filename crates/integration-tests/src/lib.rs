//! Integration tests for the Adak storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p adak-integration-tests
//! ```
//!
//! The tests drive the real router in-process with `tower::ServiceExt::oneshot`.
//! No server, no network. Time is a [`ManualClock`], so backoff and expiry are
//! exercised by advancing it instead of sleeping.
//!
//! # Test Categories
//!
//! - `auth` - Login, logout and throttling
//! - `users` - Registration, listing and account deletion
//! - `cart` - Cart routes

use std::collections::BTreeMap;
use std::sync::Arc;

use adak_storefront::config::StorefrontConfig;
use adak_storefront::routes;
use adak_storefront::services::auth::Argon2Verifier;
use adak_storefront::services::clock::ManualClock;
use adak_storefront::state::AppState;
use argon2::Params;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

/// Token secret used by every test app.
pub const TEST_TOKEN_SECRET: &str = "kX9#mP2$vL7@nQ4&wR8*jT3!hY6^bF1z";

/// Default password used by the helpers.
pub const TEST_PASSWORD: &str = "correct horse battery";

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A response with its body already read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Parse the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// Value of a header, if present and ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Minimal client-side cookie jar.
///
/// Applies `Set-Cookie` headers from responses: a cookie with an empty value
/// or `Max-Age=0` is removed, anything else replaces the stored value.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value of a cookie.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Set a cookie by hand.
    pub fn set(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_owned(), value.to_owned());
    }

    /// Drop a cookie by hand.
    pub fn remove(&mut self, name: &str) {
        self.cookies.remove(name);
    }

    /// Apply the `Set-Cookie` headers of a response.
    pub fn update(&mut self, headers: &HeaderMap) {
        for raw in headers.get_all(header::SET_COOKIE) {
            let Ok(raw) = raw.to_str() else { continue };
            let mut attributes = raw.split(';').map(str::trim);
            let Some((name, value)) = attributes.next().and_then(|pair| pair.split_once('='))
            else {
                continue;
            };
            let expired = attributes.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));

            if value.is_empty() || expired {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_owned(), value.to_owned());
            }
        }
    }

    fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// An in-process storefront with a controllable clock.
pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    router: Router,
}

impl TestApp {
    /// Build a fresh app. Must be called inside a tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if the test Argon2 parameters are rejected.
    #[must_use]
    pub fn new() -> Self {
        let config = StorefrontConfig::new(
            "http://localhost:3000",
            SecretString::from(TEST_TOKEN_SECRET.to_string()),
        );
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid start time");
        let clock = Arc::new(ManualClock::new(start));
        let params = Params::new(8, 1, 1, None).expect("valid argon2 params");
        let state = AppState::with_parts(
            config,
            clock.clone(),
            Arc::new(Argon2Verifier::with_params(params)),
        );
        let router = routes::app(state.clone());

        Self {
            state,
            clock,
            router,
        }
    }

    /// Send a request, carrying and updating `jar`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the router fails.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        jar: &mut CookieJar,
        body: Option<&Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = jar.header_value() {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .expect("readable body")
            .to_vec();
        jar.update(&headers);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// GET helper.
    pub async fn get(&self, uri: &str, jar: &mut CookieJar) -> TestResponse {
        self.send(Method::GET, uri, jar, None).await
    }

    /// POST helper with a JSON body.
    pub async fn post(&self, uri: &str, jar: &mut CookieJar, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, jar, Some(body)).await
    }

    /// DELETE helper.
    pub async fn delete(&self, uri: &str, jar: &mut CookieJar) -> TestResponse {
        self.send(Method::DELETE, uri, jar, None).await
    }

    /// Register an account and return its id.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 201.
    pub async fn register(&self, username: &str, email: &str) -> i64 {
        let response = self
            .post(
                "/users",
                &mut CookieJar::new(),
                &serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": TEST_PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "register {email}");
        response.json()["id"].as_i64().expect("numeric user id")
    }

    /// Log in with [`TEST_PASSWORD`] and return the resulting cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if login does not return 200.
    pub async fn login(&self, email: &str) -> CookieJar {
        let mut jar = CookieJar::new();
        let response = self
            .post(
                "/auth/login",
                &mut jar,
                &serde_json::json!({ "email": email, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login {email}");
        jar
    }

    /// Register and log in in one go.
    pub async fn signed_in(&self, username: &str, email: &str) -> (i64, CookieJar) {
        let id = self.register(username, email).await;
        let jar = self.login(email).await;
        (id, jar)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a JSON amount (serialized as a decimal string) for exact comparison.
///
/// # Panics
///
/// Panics if the value is not a decimal string.
#[must_use]
pub fn amount(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal amount: {value}"))
}
