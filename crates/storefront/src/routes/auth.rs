//! Authentication route handlers.
//!
//! Login hands the client three cookies: the session token (`SID`), the signed
//! authorization token (`UID`) and the cart id (`CID`). Logout removes all three.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use tracing::instrument;

use adak_core::UserId;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::OptionalSession;
use crate::middleware::auth::{clear_login_cookies, login_cookie, session_token};
use crate::models::session::cookie_names;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response body. The tokens themselves travel as cookies.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
}

/// Log in with email and password.
///
/// POST /auth/login
///
/// # Errors
///
/// - 400 if the caller already holds an active session
/// - 429 with `Retry-After` while the identity is backing off
/// - 401 for a wrong email or password
#[instrument(skip(state, current, cookies, form))]
pub async fn login(
    State(state): State<AppState>,
    OptionalSession(current): OptionalSession,
    cookies: Cookies,
    Json(form): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    if current.is_some() {
        return Err(AppError::Auth(AuthError::AlreadyLoggedIn));
    }

    let outcome = state.auth().login(&form.email, &form.password)?;

    let config = state.config();
    cookies.add(login_cookie(cookie_names::SESSION, outcome.session_token, config));
    cookies.add(login_cookie(
        cookie_names::AUTHORIZATION,
        outcome.authorization_token,
        config,
    ));
    cookies.add(login_cookie(
        cookie_names::CART,
        outcome.cart_id.to_string(),
        config,
    ));
    set_sentry_user(&outcome.user_id, None);

    Ok(Json(LoginResponse {
        user_id: outcome.user_id,
    }))
}

/// Log out.
///
/// POST /auth/logout
///
/// Always succeeds; logging out without a session only clears cookies.
#[instrument(skip(state, cookies))]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> StatusCode {
    if let Some(token) = session_token(&cookies) {
        state.auth().logout(&token);
    }
    clear_login_cookies(&cookies);
    clear_sentry_user();

    if state.janitor().request_sweep() {
        tracing::debug!("session sweep requested");
    }

    StatusCode::NO_CONTENT
}
