//! Cooperative cancellation helpers.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ColloquyError;

/// Race a fallible future against a cancellation token.
///
/// Cancellation wins ties so a cancelled turn never starts another remote call.
pub async fn with_cancellation<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, ColloquyError>>,
) -> Result<T, ColloquyError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ColloquyError::OperationCancelled),
        result = future => result,
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub async fn sleep_or_cancel(
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), ColloquyError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ColloquyError::OperationCancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
