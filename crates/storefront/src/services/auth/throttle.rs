//! Per-identity login failure throttle.
//!
//! Each consecutive failure for an identity pushes its next allowed attempt
//! out to `now + failures x unit`, a linear backoff (2s, 4s, 6s, ... with the
//! default unit). A successful login clears the entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use crate::services::clock::Clock;

/// Default backoff unit.
pub const DEFAULT_BACKOFF_UNIT: TimeDelta = TimeDelta::seconds(2);

/// Returned while an identity is inside its backoff window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    /// Time remaining until the next attempt is accepted.
    pub retry_after: TimeDelta,
}

impl fmt::Display for Throttled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "too many failed login attempts, retry in {}s",
            self.retry_after_secs()
        )
    }
}

impl std::error::Error for Throttled {}

impl Throttled {
    /// `retry_after` rounded up to whole seconds, for the `Retry-After` header.
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let millis = self.retry_after.num_milliseconds().max(0);
        u64::try_from(millis).map_or(0, |ms| ms.div_ceil(1000))
    }
}

#[derive(Debug, Clone, Copy)]
struct ThrottleEntry {
    failures: u32,
    next_allowed: DateTime<Utc>,
}

/// Failure counter and backoff deadline per identity.
///
/// Every operation is a single critical section, so two concurrent failures
/// for the same identity always count twice.
pub struct LoginThrottle {
    unit: TimeDelta,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, ThrottleEntry>>,
}

impl LoginThrottle {
    #[must_use]
    pub fn new(unit: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            unit,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Succeeds unless `identity` is inside its backoff window.
    ///
    /// # Errors
    ///
    /// Returns [`Throttled`] with the remaining wait.
    pub fn check_allowed(&self, identity: &str) -> Result<(), Throttled> {
        let now = self.clock.now();
        let entries = self.entries.lock();

        match entries.get(identity) {
            Some(entry) if now < entry.next_allowed => Err(Throttled {
                retry_after: entry.next_allowed - now,
            }),
            _ => Ok(()),
        }
    }

    /// Count a failed attempt and extend the backoff.
    ///
    /// Returns the backoff now in force.
    pub fn record_failure(&self, identity: &str) -> TimeDelta {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let entry = entries
            .entry(identity.to_owned())
            .or_insert(ThrottleEntry {
                failures: 0,
                next_allowed: now,
            });
        entry.failures = entry.failures.saturating_add(1);

        let backoff = i32::try_from(entry.failures)
            .ok()
            .and_then(|n| self.unit.checked_mul(n))
            .unwrap_or(TimeDelta::MAX);
        let deadline = now
            .checked_add_signed(backoff)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        entry.next_allowed = entry.next_allowed.max(deadline);

        tracing::debug!(
            failures = entry.failures,
            backoff_secs = backoff.num_seconds(),
            "login failure recorded"
        );
        backoff
    }

    /// Forget all failures for `identity`.
    pub fn reset(&self, identity: &str) {
        self.entries.lock().remove(identity);
    }

    /// Number of consecutive failures on record for `identity`.
    #[must_use]
    pub fn failures(&self, identity: &str) -> u32 {
        self.entries.lock().get(identity).map_or(0, |e| e.failures)
    }

    /// Drop entries whose backoff ended more than `older_than` ago.
    ///
    /// Keeps the map from growing without bound under credential stuffing.
    /// Returns the number of entries removed.
    pub fn prune_stale(&self, older_than: TimeDelta) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub_signed(older_than) else {
            return 0;
        };
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.next_allowed >= cutoff);
        before - entries.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::clock::ManualClock;

    fn throttle() -> (Arc<ManualClock>, LoginThrottle) {
        let clock = Arc::new(ManualClock::default());
        let throttle = LoginThrottle::new(DEFAULT_BACKOFF_UNIT, clock.clone());
        (clock, throttle)
    }

    #[test]
    fn test_unknown_identity_is_allowed() {
        let (_, throttle) = throttle();
        assert!(throttle.check_allowed("a@x.com").is_ok());
        assert_eq!(throttle.failures("a@x.com"), 0);
    }

    #[test]
    fn test_linear_backoff() {
        let (_, throttle) = throttle();

        assert_eq!(throttle.record_failure("a@x.com"), TimeDelta::seconds(2));
        let err = throttle.check_allowed("a@x.com").unwrap_err();
        assert_eq!(err.retry_after, TimeDelta::seconds(2));
        assert_eq!(err.retry_after_secs(), 2);

        assert_eq!(throttle.record_failure("a@x.com"), TimeDelta::seconds(4));
        let err = throttle.check_allowed("a@x.com").unwrap_err();
        assert_eq!(err.retry_after, TimeDelta::seconds(4));

        assert_eq!(throttle.record_failure("a@x.com"), TimeDelta::seconds(6));
    }

    #[test]
    fn test_allowed_again_after_backoff_elapses() {
        let (clock, throttle) = throttle();
        for _ in 0..3 {
            throttle.record_failure("a@x.com");
        }

        clock.advance(TimeDelta::seconds(5));
        let err = throttle.check_allowed("a@x.com").unwrap_err();
        assert_eq!(err.retry_after, TimeDelta::seconds(1));

        clock.advance(TimeDelta::seconds(1));
        assert!(throttle.check_allowed("a@x.com").is_ok());
    }

    #[test]
    fn test_reset_clears_backoff() {
        let (_, throttle) = throttle();
        throttle.record_failure("a@x.com");
        throttle.record_failure("a@x.com");
        throttle.reset("a@x.com");

        assert!(throttle.check_allowed("a@x.com").is_ok());
        assert_eq!(throttle.record_failure("a@x.com"), TimeDelta::seconds(2));
    }

    #[test]
    fn test_identities_are_independent() {
        let (_, throttle) = throttle();
        throttle.record_failure("a@x.com");
        assert!(throttle.check_allowed("b@x.com").is_ok());
    }

    #[test]
    fn test_deadline_never_moves_backwards() {
        let (clock, throttle) = throttle();
        for _ in 0..5 {
            throttle.record_failure("a@x.com");
        }
        let first = throttle.check_allowed("a@x.com").unwrap_err().retry_after;

        // A later failure still lands at or after the previous deadline.
        clock.advance(TimeDelta::seconds(1));
        throttle.record_failure("a@x.com");
        let second = throttle.check_allowed("a@x.com").unwrap_err().retry_after;
        assert!(second + TimeDelta::seconds(1) >= first);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let throttled = Throttled {
            retry_after: TimeDelta::milliseconds(1_200),
        };
        assert_eq!(throttled.retry_after_secs(), 2);
        assert_eq!(throttled.to_string(), "too many failed login attempts, retry in 2s");
    }

    #[test]
    fn test_prune_stale_entries() {
        let (clock, throttle) = throttle();
        throttle.record_failure("old@x.com");
        clock.advance(TimeDelta::hours(200));
        throttle.record_failure("new@x.com");

        assert_eq!(throttle.prune_stale(TimeDelta::hours(120)), 1);
        assert_eq!(throttle.failures("old@x.com"), 0);
        assert_eq!(throttle.failures("new@x.com"), 1);

        assert_eq!(throttle.prune_stale(TimeDelta::MAX), 0);
        assert_eq!(throttle.failures("new@x.com"), 1);
    }

    #[test]
    fn test_concurrent_failures_all_counted() {
        let (_, throttle) = throttle();
        let throttle = Arc::new(throttle);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        throttle.record_failure("a@x.com");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(throttle.failures("a@x.com"), 200);
    }
}
