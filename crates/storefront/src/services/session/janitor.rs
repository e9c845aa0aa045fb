//! Background sweeper for idle sessions.
//!
//! A single tokio task owns every sweep. It wakes on a fixed cadence and when
//! signalled through [`SessionJanitor::request_sweep`]. A request is accepted
//! only if more than `sweep_interval` passed since the most recent sweep,
//! periodic or requested. Because there is one task there is never more than
//! one sweep in flight.
//! The requesting handler never waits for the sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::SessionRegistry;
use crate::services::auth::LoginThrottle;
use crate::services::clock::Clock;

/// Sweep timings.
#[derive(Debug, Clone, Copy)]
pub struct JanitorConfig {
    /// Sessions idle longer than this are removed.
    pub max_idle: TimeDelta,
    /// Minimum gap between the last sweep and an accepted on-demand one.
    pub sweep_interval: TimeDelta,
    /// Cadence of the periodic sweep.
    pub sweep_period: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            max_idle: super::DEFAULT_MAX_IDLE,
            sweep_interval: TimeDelta::seconds(30),
            sweep_period: Duration::from_secs(3600),
        }
    }
}

/// Handle to the sweeper task. Aborts the task when dropped.
pub struct SessionJanitor {
    notify: Arc<Notify>,
    clock: Arc<dyn Clock>,
    sweep_interval: TimeDelta,
    last_sweep: Arc<Mutex<Option<DateTime<Utc>>>>,
    task: JoinHandle<()>,
}

impl SessionJanitor {
    /// Spawn the sweeper on the current tokio runtime.
    ///
    /// Each sweep also prunes throttle entries that have been quiet for
    /// `max_idle`.
    #[must_use]
    pub fn spawn(
        sessions: Arc<SessionRegistry>,
        throttle: Arc<LoginThrottle>,
        clock: Arc<dyn Clock>,
        config: JanitorConfig,
    ) -> Self {
        let notify = Arc::new(Notify::new());
        let wake = Arc::clone(&notify);
        let last_sweep = Arc::new(Mutex::new(None));
        let swept_at = Arc::clone(&last_sweep);
        let task_clock = Arc::clone(&clock);
        let period = config.sweep_period.max(Duration::from_secs(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = wake.notified() => {}
                }

                *swept_at.lock() = Some(task_clock.now());

                let sessions_removed = sessions.sweep_expired(config.max_idle);
                let throttles_removed = throttle.prune_stale(config.max_idle);
                debug!(
                    sessions_removed,
                    throttles_removed,
                    sessions_left = sessions.len(),
                    "session sweep finished"
                );
            }
        });

        info!(
            max_idle_hours = config.max_idle.num_hours(),
            period_secs = period.as_secs(),
            "session janitor started"
        );

        Self {
            notify,
            clock,
            sweep_interval: config.sweep_interval,
            last_sweep,
            task,
        }
    }

    /// Ask for a sweep without waiting for it.
    ///
    /// Returns `false` if the most recent sweep, or the sweep an earlier
    /// accepted request is waiting for, was within `sweep_interval`; the
    /// request is then dropped.
    pub fn request_sweep(&self) -> bool {
        let now = self.clock.now();
        let mut last = self.last_sweep.lock();

        if let Some(previous) = *last
            && now - previous <= self.sweep_interval
        {
            return false;
        }

        *last = Some(now);
        self.notify.notify_one();
        true
    }

    /// Stop the sweeper.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for SessionJanitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
