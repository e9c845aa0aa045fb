//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Health check
//!
//! # Auth
//! POST   /auth/login                 - Login (sets SID, UID, CID cookies)
//! POST   /auth/logout                - Logout (clears cookies)
//!
//! # Accounts
//! POST   /users                      - Register
//! GET    /users                      - List accounts (requires session)
//! GET    /users/{id}                 - Account detail (requires session)
//! DELETE /users/{id}                 - Delete account (requires session + UID)
//!
//! # Cart (requires session + CID)
//! GET    /cart                       - Full snapshot
//! GET    /cart/items                 - Items only
//! GET    /cart/size                  - Distinct product count
//! GET    /cart/checkout              - Checkout snapshot
//! POST   /cart/add/{quantity}        - Add a product (JSON body)
//! DELETE /cart/items/{product_id}    - Remove a product
//! POST   /cart/reset                 - Empty the cart
//! GET    /cart/brand/{brand}         - Filter by brand
//! GET    /cart/category/{category}   - Filter by category
//! GET    /cart/type/{type}           - Filter by product type
//! GET    /cart/total/{min}/{max}     - Filter by line total
//! GET    /cart/weight/{min}/{max}    - Filter by line weight
//! ```

pub mod auth;
pub mod cart;
pub mod users;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{auth_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the account routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(users::register).get(users::list))
        .route("/{id}", get(users::show).delete(users::delete))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", get(cart::items))
        .route("/size", get(cart::size))
        .route("/checkout", get(cart::checkout))
        .route("/add/{quantity}", post(cart::add))
        .route("/items/{product_id}", delete(cart::remove))
        .route("/reset", post(cart::reset))
        .route("/brand/{brand}", get(cart::by_brand))
        .route("/category/{category}", get(cart::by_category))
        .route("/type/{type}", get(cart::by_type))
        .route("/total/{min}/{max}", get(cart::by_total))
        .route("/weight/{min}/{max}", get(cart::by_weight))
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

fn router(auth: Router<AppState>, state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth)
        .nest("/users", user_routes())
        .nest("/cart", cart_routes())
        .layer(CookieManagerLayer::new())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Build the full application router.
///
/// Auth endpoints are only guarded by the per-identity login throttle here.
/// The binary serves [`rate_limited_app`] instead.
pub fn app(state: AppState) -> Router {
    router(auth_routes(), state)
}

/// Build the application router with the per-IP limiter on `/auth`.
///
/// Must be served with `into_make_service_with_connect_info::<SocketAddr>()`
/// when the service is not behind a proxy that sets client IP headers.
pub fn rate_limited_app(state: AppState) -> Router {
    router(auth_routes().layer(auth_rate_limiter()), state)
}
