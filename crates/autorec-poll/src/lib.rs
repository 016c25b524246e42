//! Poll cadence scheduler for autorec.
//!
//! A room monitor asks the platform for the room's status every
//! `check_interval`, retries sooner (`retry_delay`) after a failed fetch,
//! and can be paused and resumed without being torn down. This crate owns
//! that timing; what a "poll" actually does is up to the caller.
//!
//! # Integration
//!
//! The scheduler sits inside a monitor task's `tokio::select!` loop next
//! to its control channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         changed = control.changed() => { /* pause, resume, set_interval */ }
//!         info = scheduler.wait_for_poll() => {
//!             match source.fetch(room_id).await {
//!                 Ok(status) => scheduler.record_success(),
//!                 Err(_) => scheduler.record_failure(),
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! [`PollScheduler::wait_for_poll`] is cancel-safe: it only mutates state
//! after its sleep completes, so losing a `select!` race costs nothing.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a poll scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Regular delay between two polls.
    pub interval: Duration,
    /// Delay before the next poll after a failed one.
    pub retry_delay: Duration,
    /// Random delay (0..max) added before the first poll and after each
    /// resume, so rooms restored at the same instant do not poll in lockstep.
    pub initial_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            retry_delay: Duration::from_secs(2),
            initial_jitter: Duration::from_millis(1_000),
        }
    }
}

impl PollConfig {
    /// Shortest interval accepted. Anything lower hammers the platform API.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Shortest retry delay accepted.
    pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);

    /// Config with the given interval and retry delay, default jitter.
    pub fn new(interval: Duration, retry_delay: Duration) -> Self {
        Self {
            interval,
            retry_delay,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PollScheduler::new`] and the setters.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                min_ms = Self::MIN_INTERVAL.as_millis() as u64,
                "poll interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        if self.retry_delay < Self::MIN_RETRY_DELAY {
            warn!(
                retry_ms = self.retry_delay.as_millis() as u64,
                min_ms = Self::MIN_RETRY_DELAY.as_millis() as u64,
                "poll retry delay below minimum, clamping"
            );
            self.retry_delay = Self::MIN_RETRY_DELAY;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Poll info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`PollScheduler::wait_for_poll`] each time a poll is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollInfo {
    /// Monotonically increasing poll number (starts at 1).
    pub poll: u64,
    /// `true` if this poll was scheduled by [`PollScheduler::record_failure`].
    pub retry: bool,
}

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollMetrics {
    pub total_polls: u64,
    pub total_failures: u64,
    /// Failures since the last success. Reset by `record_success`.
    pub consecutive_failures: u32,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Decides when the next status poll of one room is due.
pub struct PollScheduler {
    config: PollConfig,
    next_poll: Instant,
    paused: bool,
    poll_count: u64,
    retry_pending: bool,
    metrics: PollMetrics,
}

impl PollScheduler {
    /// Create a scheduler. The first poll is due after the start jitter.
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();
        let next_poll = Instant::now() + jitter(config.initial_jitter);

        debug!(
            interval_s = config.interval.as_secs(),
            retry_ms = config.retry_delay.as_millis() as u64,
            "poll scheduler created"
        );

        Self {
            config,
            next_poll,
            paused: false,
            poll_count: 0,
            retry_pending: false,
            metrics: PollMetrics::default(),
        }
    }

    /// Wait until the next poll is due.
    ///
    /// While paused this future pends forever; `select!` keeps serving
    /// its other branches.
    pub async fn wait_for_poll(&mut self) -> PollInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        time::sleep_until(self.next_poll).await;

        self.poll_count += 1;
        self.metrics.total_polls += 1;
        let retry = std::mem::take(&mut self.retry_pending);
        // Assume success; record_failure pulls the next poll in.
        self.next_poll = Instant::now() + self.config.interval;

        trace!(poll = self.poll_count, retry, "poll due");

        PollInfo {
            poll: self.poll_count,
            retry,
        }
    }

    /// Record that the last poll succeeded.
    pub fn record_success(&mut self) {
        self.metrics.consecutive_failures = 0;
    }

    /// Record that the last poll failed. The next poll is due after the
    /// retry delay instead of the full interval.
    pub fn record_failure(&mut self) {
        self.metrics.total_failures += 1;
        self.metrics.consecutive_failures = self.metrics.consecutive_failures.saturating_add(1);
        self.retry_pending = true;
        self.next_poll = Instant::now() + self.config.retry_delay;
        debug!(
            failures = self.metrics.consecutive_failures,
            retry_ms = self.config.retry_delay.as_millis() as u64,
            "poll failed, retrying early"
        );
    }

    /// Stop producing polls until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(poll = self.poll_count, "poll scheduler paused");
        }
    }

    /// Resume after a pause. The next poll is due promptly (after jitter)
    /// rather than a full interval later. Idempotent.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_poll = Instant::now() + jitter(self.config.initial_jitter);
            debug!(poll = self.poll_count, "poll scheduler resumed");
        }
    }

    /// Change the regular interval without restarting.
    ///
    /// A shorter interval takes effect immediately (a pending poll is
    /// pulled in); a longer one applies from the next poll on.
    pub fn set_interval(&mut self, interval: Duration) {
        let config = PollConfig {
            interval,
            ..self.config.clone()
        }
        .validated();
        self.config.interval = config.interval;

        if !self.retry_pending {
            let candidate = Instant::now() + self.config.interval;
            if candidate < self.next_poll {
                self.next_poll = candidate;
            }
        }
        debug!(interval_s = self.config.interval.as_secs(), "poll interval changed");
    }

    /// Change the retry delay used after failures.
    pub fn set_retry_delay(&mut self, retry_delay: Duration) {
        let config = PollConfig {
            retry_delay,
            ..self.config.clone()
        }
        .validated();
        self.config.retry_delay = config.retry_delay;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn retry_delay(&self) -> Duration {
        self.config.retry_delay
    }

    /// Time left until the next poll (zero if overdue).
    pub fn time_until_next(&self) -> Duration {
        self.next_poll.saturating_duration_since(Instant::now())
    }

    pub fn metrics(&self) -> &PollMetrics {
        &self.metrics
    }
}

fn jitter(max: Duration) -> Duration {
    let max_us = max.as_micros() as u64;
    if max_us == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(rand::rng().random_range(0..max_us))
}
