//! Authentication extractors and cookie helpers.
//!
//! The session cookie (`SID`) is looked up in the session registry on every
//! request; a hit refreshes the session's last activity.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_cookies::cookie::{SameSite, time::Duration};
use tower_cookies::{Cookie, Cookies};

use crate::config::StorefrontConfig;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::models::session::cookie_names;
use crate::state::AppState;
use crate::store::carts::SharedCart;

/// Extractor that requires an active session.
///
/// Rejects with 401 if the session cookie is missing or unknown, or if the
/// account behind it no longer exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(user): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireSession(pub CurrentUser);

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = request_cookies(parts, state).await?;
        current_user(&cookies, state)
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Please log in to continue".to_string()))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireSession`, this does not reject the request if there is no
/// active session.
pub struct OptionalSession(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = request_cookies(parts, state).await?;
        Ok(Self(current_user(&cookies, state)))
    }
}

/// Extractor for cart routes: an active session plus the cart cookie.
///
/// The cart cookie must name the cart of the account behind the session.
pub struct CartSession {
    pub user: CurrentUser,
    pub cart: SharedCart,
}

impl FromRequestParts<AppState> for CartSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireSession(user) = RequireSession::from_request_parts(parts, state).await?;
        let cookies = request_cookies(parts, state).await?;

        let cart_id = cookies
            .get(cookie_names::CART)
            .ok_or_else(|| AppError::Unauthorized("Missing cart cookie".to_string()))?;
        if cart_id.value() != user.cart_id.as_str() {
            return Err(AppError::Forbidden(
                "Cart does not belong to this account".to_string(),
            ));
        }

        let cart = state
            .carts()
            .get(&user.cart_id)
            .ok_or_else(|| AppError::NotFound("Cart".to_string()))?;

        Ok(Self { user, cart })
    }
}

async fn request_cookies(parts: &mut Parts, state: &AppState) -> Result<Cookies, AppError> {
    Cookies::from_request_parts(parts, state)
        .await
        .map_err(|(_, msg)| AppError::Internal(msg.to_string()))
}

fn current_user(cookies: &Cookies, state: &AppState) -> Option<CurrentUser> {
    let token = cookies.get(cookie_names::SESSION)?;
    let email = state.sessions().touch(token.value())?;
    let user = state.users().get_by_email(&email)?;

    set_sentry_user(&user.id, Some(user.email.as_str()));
    Some(CurrentUser {
        id: user.id,
        email: user.email,
        cart_id: user.cart_id,
    })
}

/// Value of the session cookie, if present.
#[must_use]
pub fn session_token(cookies: &Cookies) -> Option<String> {
    cookies.get(cookie_names::SESSION).map(|c| c.value().to_owned())
}

/// Value of the authorization cookie, if present.
#[must_use]
pub fn authorization_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(cookie_names::AUTHORIZATION)
        .map(|c| c.value().to_owned())
}

/// Build a login cookie: `HttpOnly`, `SameSite=Strict`, `Path=/`, living as
/// long as an idle session does.
#[must_use]
pub fn login_cookie(
    name: &'static str,
    value: String,
    config: &StorefrontConfig,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .secure(config.cookies_secure())
        .max_age(Duration::seconds(config.session.max_idle.num_seconds()))
        .build()
}

/// Tell the client to drop every login cookie.
pub fn clear_login_cookies(cookies: &Cookies) {
    for name in cookie_names::ALL {
        cookies.remove(Cookie::build((name, "")).path("/").build());
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[test]
    fn test_login_cookie_attributes() {
        let config =
            StorefrontConfig::new("https://shop.test", SecretString::from("x".repeat(32)));
        let cookie = login_cookie(cookie_names::SESSION, "token".to_string(), &config);

        assert_eq!(cookie.name(), "SID");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(Duration::hours(120)));
    }

    #[test]
    fn test_login_cookie_not_secure_over_http() {
        let config =
            StorefrontConfig::new("http://localhost", SecretString::from("x".repeat(32)));
        let cookie = login_cookie(cookie_names::CART, "cart".to_string(), &config);
        assert_eq!(cookie.secure(), Some(false));
    }
}
