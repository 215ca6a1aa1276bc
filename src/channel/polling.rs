//! Polling cadence for remote runs.

use std::time::Duration;

/// Timing knobs for run polling and message synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPollingOptions {
    /// Wait used for the first `run_polling_backoff_threshold` polls.
    pub run_polling_backoff: Duration,
    /// Steady-state wait once the threshold has been passed.
    pub run_polling_interval: Duration,
    /// Number of polls that use `run_polling_backoff`.
    pub run_polling_backoff_threshold: u32,
    /// Wait between attempts to fetch a message the service has not exposed yet.
    pub message_synchronization_delay: Duration,
    /// Total attempts for a message fetch that keeps returning not-found.
    pub message_fetch_attempts: u32,
}

impl Default for RunPollingOptions {
    fn default() -> Self {
        Self {
            run_polling_backoff: Duration::from_millis(500),
            run_polling_interval: Duration::from_secs(1),
            run_polling_backoff_threshold: 2,
            message_synchronization_delay: Duration::from_millis(500),
            message_fetch_attempts: 4,
        }
    }
}

impl RunPollingOptions {
    /// Wait before the poll numbered `poll_count` (zero based).
    pub fn interval_for(&self, poll_count: u32) -> Duration {
        if poll_count < self.run_polling_backoff_threshold {
            self.run_polling_backoff
        } else {
            self.run_polling_interval
        }
    }
}
