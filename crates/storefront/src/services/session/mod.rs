//! In-memory session registry.
//!
//! Maps opaque session tokens to the identity that logged in and the time the
//! session was last used. One identity may hold several sessions (one per
//! browser). Every operation, the presence check included, takes the same
//! exclusive lock because the presence check also refreshes last activity.
//!
//! ```text
//! absent --create--> active --is_active--> active (refreshed)
//!                      |
//!                      +--destroy | sweep_expired--> absent
//! ```

mod janitor;

pub use janitor::{JanitorConfig, SessionJanitor};

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use adak_core::Email;

use crate::services::auth::token::{SESSION_TOKEN_LENGTH, random_token};
use crate::services::clock::Clock;

/// Default idle time after which a session is swept.
pub const DEFAULT_MAX_IDLE: TimeDelta = TimeDelta::hours(120);

#[derive(Debug, Clone)]
struct SessionEntry {
    email: Email,
    last_seen: DateTime<Utc>,
}

/// Session token -> identity + last activity.
pub struct SessionRegistry {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Start a session for `email` and return its token.
    pub fn create(&self, email: &Email) -> String {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        // Never hand out a live token twice.
        let token = loop {
            let candidate = random_token(SESSION_TOKEN_LENGTH);
            if !entries.contains_key(&candidate) {
                break candidate;
            }
        };

        entries.insert(
            token.clone(),
            SessionEntry {
                email: email.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(sessions = entries.len(), "session created");
        token
    }

    /// Identity behind `token`, refreshing its last activity.
    #[must_use]
    pub fn touch(&self, token: &str) -> Option<Email> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(token)?;
        entry.last_seen = now;
        Some(entry.email.clone())
    }

    /// Whether `token` names a live session. Refreshes last activity.
    #[must_use]
    pub fn is_active(&self, token: &str) -> bool {
        self.touch(token).is_some()
    }

    /// End a session. Unknown tokens are ignored.
    pub fn destroy(&self, token: &str) {
        self.entries.lock().remove(token);
    }

    /// End every session held by `email`. Returns how many were removed.
    pub fn destroy_all_for(&self, email: &Email) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| &entry.email != email);
        before - entries.len()
    }

    /// Remove sessions idle for longer than `max_idle`.
    ///
    /// Exactly the entries with `last_seen < now - max_idle` are removed.
    /// Returns how many were removed. A cutoff before the earliest
    /// representable time removes nothing.
    pub fn sweep_expired(&self, max_idle: TimeDelta) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub_signed(max_idle) else {
            return 0;
        };
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_seen >= cutoff);
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
