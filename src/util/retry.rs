//! Bounded retry with optional exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ColloquyError;

use super::cancel::sleep_or_cancel;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Backoff multiplier; `1.0` keeps the delay fixed.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that waits the same `delay` between every attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: delay,
            max_backoff: delay,
            multiplier: 1.0,
        }
    }

    /// Execute an async operation, retrying errors that report [`ColloquyError::is_retryable`].
    pub async fn execute<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, ColloquyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ColloquyError>>,
    {
        self.execute_when(cancel, ColloquyError::is_retryable, operation)
            .await
    }

    /// Execute an async operation, retrying only errors accepted by `should_retry`.
    ///
    /// Returns the last error once attempts are exhausted. Cancellation during a
    /// wait surfaces as [`ColloquyError::OperationCancelled`] and is never retried.
    pub async fn execute_when<F, Fut, T, P>(
        &self,
        cancel: &CancellationToken,
        should_retry: P,
        mut operation: F,
    ) -> Result<T, ColloquyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ColloquyError>>,
        P: Fn(&ColloquyError) -> bool,
    {
        let mut backoff = self.initial_backoff;
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let retryable = !matches!(e, ColloquyError::OperationCancelled) && should_retry(&e);
                    if !retryable || attempt >= max_attempts {
                        return Err(e);
                    }

                    tracing::debug!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "retrying after error"
                    );

                    sleep_or_cancel(backoff, cancel).await?;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }
    }
}
