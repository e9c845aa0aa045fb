//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::auth::{
    Argon2Verifier, AuthService, CredentialVerifier, LoginThrottle, TokenIssuer,
};
use crate::services::clock::{Clock, SystemClock};
use crate::services::session::{SessionJanitor, SessionRegistry};
use crate::store::carts::CartStore;
use crate::store::users::UserRepository;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// registries and configuration. The registries are built here, once, and
/// only ever reached through this state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    clock: Arc<dyn Clock>,
    sessions: Arc<SessionRegistry>,
    throttle: Arc<LoginThrottle>,
    janitor: SessionJanitor,
    tokens: TokenIssuer,
    verifier: Arc<dyn CredentialVerifier>,
    users: UserRepository,
    carts: CartStore,
}

impl AppState {
    /// Create the production state: wall clock and default Argon2id costs.
    ///
    /// Spawns the session janitor, so it must be called inside a tokio runtime.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock), Arc::new(Argon2Verifier::new()))
    }

    /// Create a state with an explicit clock and credential verifier.
    ///
    /// Spawns the session janitor, so it must be called inside a tokio runtime.
    #[must_use]
    pub fn with_parts(
        config: StorefrontConfig,
        clock: Arc<dyn Clock>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let sessions = Arc::new(SessionRegistry::new(Arc::clone(&clock)));
        let throttle = Arc::new(LoginThrottle::new(config.login_backoff, Arc::clone(&clock)));
        let janitor = SessionJanitor::spawn(
            Arc::clone(&sessions),
            Arc::clone(&throttle),
            Arc::clone(&clock),
            config.session,
        );
        let tokens = TokenIssuer::new(config.token_secret.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                clock,
                sessions,
                throttle,
                janitor,
                tokens,
                verifier,
                users: UserRepository::new(),
                carts: CartStore::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    #[must_use]
    pub fn throttle(&self) -> &LoginThrottle {
        &self.inner.throttle
    }

    #[must_use]
    pub fn janitor(&self) -> &SessionJanitor {
        &self.inner.janitor
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    #[must_use]
    pub fn users(&self) -> &UserRepository {
        &self.inner.users
    }

    #[must_use]
    pub fn carts(&self) -> &CartStore {
        &self.inner.carts
    }

    /// Authentication service over this state's registries.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService {
            users: &self.inner.users,
            carts: &self.inner.carts,
            sessions: &self.inner.sessions,
            throttle: &self.inner.throttle,
            tokens: &self.inner.tokens,
            verifier: self.inner.verifier.as_ref(),
            clock: self.inner.clock.as_ref(),
        }
    }
}
