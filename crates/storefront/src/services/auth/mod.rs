//! Authentication service.
//!
//! Login runs throttle check, credential verification, session creation and
//! token minting, in that order. Every failed attempt for an identity counts
//! towards its backoff, whether the account exists or not, and both cases
//! produce the same `InvalidCredentials` error.

mod error;
pub mod password;
pub mod throttle;
pub mod token;

pub use error::AuthError;
pub use password::{Argon2Verifier, CredentialVerifier};
pub use throttle::{LoginThrottle, Throttled};
pub use token::{TokenError, TokenIssuer};

use tracing::{info, instrument, warn};

use adak_core::{CartId, Email, UserId};

use crate::models::user::User;
use crate::services::clock::Clock;
use crate::services::session::SessionRegistry;
use crate::store::RepositoryError;
use crate::store::carts::CartStore;
use crate::store::users::{NewUser, UserRepository};

/// Maximum username length, in characters.
const MAX_USERNAME_LENGTH: usize = 64;

/// Length of a freshly minted cart id.
const CART_ID_LENGTH: usize = 32;

/// Everything the client needs after a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: UserId,
    /// Value for the session cookie.
    pub session_token: String,
    /// Value for the authorization cookie.
    pub authorization_token: String,
    /// Value for the cart cookie.
    pub cart_id: CartId,
}

/// Authentication service.
///
/// Borrows the long-lived registries from the application state; build one
/// per request with `AppState::auth`.
pub struct AuthService<'a> {
    pub(crate) users: &'a UserRepository,
    pub(crate) carts: &'a CartStore,
    pub(crate) sessions: &'a SessionRegistry,
    pub(crate) throttle: &'a LoginThrottle,
    pub(crate) tokens: &'a TokenIssuer,
    pub(crate) verifier: &'a dyn CredentialVerifier,
    pub(crate) clock: &'a dyn Clock,
}

impl AuthService<'_> {
    /// Register a new account and create its cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` for an empty or overlong username.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = validate_username(username)?;
        let email = Email::parse(email)?;
        password::validate_password(password)?;

        let password_hash = self.verifier.hash(password)?;
        let cart_id = CartId::new(token::random_token(CART_ID_LENGTH));

        let user = self
            .users
            .create(NewUser {
                username,
                email,
                cart_id: cart_id.clone(),
                password_hash,
                created_at: self.clock.now(),
            })
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
            })?;
        self.carts.create(cart_id);

        info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Throttled` while the identity is backing off.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::Token` if the authorization token cannot be signed.
    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let identity = throttle_key(email);
        self.throttle.check_allowed(&identity)?;

        let Some((user, password_hash)) = Email::parse(email)
            .ok()
            .and_then(|email| self.users.get_password_hash(&email))
        else {
            return Err(self.fail(&identity));
        };

        if !self.verifier.verify(&password_hash, password) {
            return Err(self.fail(&identity));
        }

        self.throttle.reset(&identity);

        let authorization_token = self.tokens.sign(user.id)?;
        let session_token = self.sessions.create(&user.email);

        info!(user_id = %user.id, "login succeeded");
        Ok(LoginOutcome {
            user_id: user.id,
            session_token,
            authorization_token,
            cart_id: user.cart_id,
        })
    }

    /// End a session. Unknown tokens are ignored.
    pub fn logout(&self, session_token: &str) {
        self.sessions.destroy(session_token);
    }

    /// Delete an account, its cart and all its sessions.
    ///
    /// `authorization_token` must name `target`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is missing, invalid, or for
    /// another account. Returns `AuthError::UserNotFound` if no such account.
    #[instrument(skip(self, authorization_token))]
    pub fn delete_account(
        &self,
        target: UserId,
        authorization_token: Option<&str>,
    ) -> Result<User, AuthError> {
        self.tokens.check_permits(target, authorization_token)?;

        let user = self
            .users
            .delete(target)
            .map_err(|_| AuthError::UserNotFound)?;
        self.carts.delete(&user.cart_id);
        let sessions = self.sessions.destroy_all_for(&user.email);

        info!(user_id = %user.id, sessions, "account deleted");
        Ok(user)
    }

    fn fail(&self, identity: &str) -> AuthError {
        let backoff = self.throttle.record_failure(identity);
        warn!(backoff_secs = backoff.num_seconds(), "login failed");
        AuthError::InvalidCredentials
    }
}

/// The throttle key for a login attempt: the normalized email when it parses,
/// otherwise the trimmed, lowercased input.
fn throttle_key(email: &str) -> String {
    Email::parse(email).map_or_else(|_| email.trim().to_lowercase(), Email::into_inner)
}

fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidInput("username is required".to_owned()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    Ok(username.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use argon2::Params;
    use chrono::TimeDelta;
    use secrecy::SecretString;

    use super::*;
    use crate::services::auth::throttle::DEFAULT_BACKOFF_UNIT;
    use crate::services::clock::ManualClock;

    struct Fixture {
        clock: Arc<ManualClock>,
        users: UserRepository,
        carts: CartStore,
        sessions: SessionRegistry,
        throttle: LoginThrottle,
        tokens: TokenIssuer,
        verifier: Argon2Verifier,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Arc::new(ManualClock::default());
            Self {
                users: UserRepository::new(),
                carts: CartStore::new(),
                sessions: SessionRegistry::new(clock.clone()),
                throttle: LoginThrottle::new(DEFAULT_BACKOFF_UNIT, clock.clone()),
                tokens: TokenIssuer::new(SecretString::from(
                    "kJ8#mP2$vL9@nQ4&wR7*xT1!yU6^zA3%".to_string(),
                )),
                verifier: Argon2Verifier::with_params(Params::new(8, 1, 1, None).unwrap()),
                clock,
            }
        }

        fn auth(&self) -> AuthService<'_> {
            AuthService {
                users: &self.users,
                carts: &self.carts,
                sessions: &self.sessions,
                throttle: &self.throttle,
                tokens: &self.tokens,
                verifier: &self.verifier,
                clock: self.clock.as_ref(),
            }
        }
    }

    #[test]
    fn test_register_creates_account_and_cart() {
        let f = Fixture::new();
        let user = f.auth().register("sam", "Sam@X.com", "password123").unwrap();

        assert_eq!(user.email.as_str(), "sam@x.com");
        assert_eq!(user.cart_id.as_str().len(), CART_ID_LENGTH);
        assert!(f.carts.get(&user.cart_id).is_some());
    }

    #[test]
    fn test_register_validation() {
        let f = Fixture::new();
        let auth = f.auth();

        assert!(matches!(
            auth.register("  ", "a@x.com", "password123"),
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            auth.register("sam", "not-an-email", "password123"),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("sam", "a@x.com", "short"),
            Err(AuthError::WeakPassword(_))
        ));

        auth.register("sam", "a@x.com", "password123").unwrap();
        assert!(matches!(
            auth.register("sam2", "a@x.com", "password456"),
            Err(AuthError::UserAlreadyExists)
        ));
        assert_eq!(f.carts.len(), 1);
    }

    #[test]
    fn test_login_success() {
        let f = Fixture::new();
        let user = f.auth().register("sam", "a@x.com", "password123").unwrap();

        let outcome = f.auth().login("A@x.com", "password123").unwrap();
        assert_eq!(outcome.user_id, user.id);
        assert_eq!(outcome.cart_id, user.cart_id);
        assert!(f.sessions.is_active(&outcome.session_token));
        assert_eq!(f.tokens.verify(&outcome.authorization_token).unwrap(), user.id);
    }

    #[test]
    fn test_unknown_user_and_wrong_password_look_the_same() {
        let f = Fixture::new();
        f.auth().register("sam", "a@x.com", "password123").unwrap();

        let wrong = f.auth().login("a@x.com", "wrong-password").unwrap_err();
        let unknown = f.auth().login("b@x.com", "password123").unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert!(matches!(unknown, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_failures_throttle_then_reset_on_success() {
        let f = Fixture::new();
        f.auth().register("sam", "a@x.com", "password123").unwrap();

        assert!(matches!(
            f.auth().login("a@x.com", "wrong-password"),
            Err(AuthError::InvalidCredentials)
        ));
        // Even the right password is refused inside the window.
        let Err(AuthError::Throttled(throttled)) = f.auth().login("a@x.com", "password123") else {
            panic!("expected throttled");
        };
        assert_eq!(throttled.retry_after, TimeDelta::seconds(2));

        f.clock.advance(TimeDelta::seconds(2));
        assert!(f.auth().login("a@x.com", "wrong-password").is_err());
        let Err(AuthError::Throttled(throttled)) = f.auth().login("a@x.com", "password123") else {
            panic!("expected throttled");
        };
        assert_eq!(throttled.retry_after, TimeDelta::seconds(4));

        f.clock.advance(TimeDelta::seconds(4));
        assert!(f.auth().login("a@x.com", "password123").is_ok());
        assert_eq!(f.throttle.failures("a@x.com"), 0);
    }

    #[test]
    fn test_unknown_identities_are_throttled_too() {
        let f = Fixture::new();
        assert!(f.auth().login("ghost@x.com", "whatever1").is_err());
        assert!(matches!(
            f.auth().login("GHOST@x.com", "whatever1"),
            Err(AuthError::Throttled(_))
        ));
    }

    #[test]
    fn test_logout_destroys_session() {
        let f = Fixture::new();
        f.auth().register("sam", "a@x.com", "password123").unwrap();
        let outcome = f.auth().login("a@x.com", "password123").unwrap();

        f.auth().logout(&outcome.session_token);
        assert!(!f.sessions.is_active(&outcome.session_token));
        f.auth().logout(&outcome.session_token);
    }

    #[test]
    fn test_delete_account_requires_matching_token() {
        let f = Fixture::new();
        let sam = f.auth().register("sam", "a@x.com", "password123").unwrap();
        let kim = f.auth().register("kim", "b@x.com", "password123").unwrap();
        let sam_login = f.auth().login("a@x.com", "password123").unwrap();

        assert!(matches!(
            f.auth().delete_account(kim.id, Some(&sam_login.authorization_token)),
            Err(AuthError::Token(TokenError::AccountMismatch))
        ));
        assert!(matches!(
            f.auth().delete_account(sam.id, None),
            Err(AuthError::Token(TokenError::Missing))
        ));

        let deleted = f
            .auth()
            .delete_account(sam.id, Some(&sam_login.authorization_token))
            .unwrap();
        assert_eq!(deleted.id, sam.id);
        assert!(f.users.get_by_id(sam.id).is_none());
        assert!(f.carts.get(&sam.cart_id).is_none());
        assert!(!f.sessions.is_active(&sam_login.session_token));
        assert!(f.users.get_by_id(kim.id).is_some());
    }
}
