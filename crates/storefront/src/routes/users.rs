//! Account route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::instrument;

use adak_core::UserId;

use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::RequireSession;
use crate::middleware::auth::{authorization_token, clear_login_cookies};
use crate::models::PublicUser;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Register an account. Its cart is created alongside.
///
/// POST /users
///
/// # Errors
///
/// - 400 for a bad username, email or password
/// - 409 if the email is taken
#[instrument(skip(state, form))]
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>)> {
    let user = state
        .auth()
        .register(&form.username, &form.email, &form.password)?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

/// List accounts.
///
/// GET /users
#[instrument(skip(state, _user))]
pub async fn list(
    State(state): State<AppState>,
    RequireSession(_user): RequireSession,
) -> Json<Vec<PublicUser>> {
    Json(state.users().list().iter().map(PublicUser::from).collect())
}

/// Get one account.
///
/// GET /users/{id}
///
/// # Errors
///
/// Returns 404 if no such account.
#[instrument(skip(state, _user))]
pub async fn show(
    State(state): State<AppState>,
    RequireSession(_user): RequireSession,
    Path(id): Path<UserId>,
) -> Result<Json<PublicUser>> {
    state
        .users()
        .get_by_id(id)
        .map(|user| Json(PublicUser::from(&user)))
        .ok_or_else(|| AppError::NotFound("User".to_string()))
}

/// Delete an account, its cart and its sessions.
///
/// DELETE /users/{id}
///
/// Needs an active session and an authorization cookie naming `{id}`.
///
/// # Errors
///
/// - 401 without a session or authorization token
/// - 403 if the token names another account
#[instrument(skip(state, user, cookies), fields(current_user = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSession(user): RequireSession,
    cookies: Cookies,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    let token = authorization_token(&cookies);
    state.auth().delete_account(id, token.as_deref())?;

    clear_login_cookies(&cookies);
    clear_sentry_user();
    state.janitor().request_sweep();

    Ok(StatusCode::NO_CONTENT)
}
