//! Utility modules: bounded retry and cooperative cancellation.

pub mod cancel;
pub mod retry;

pub use cancel::with_cancellation;
pub use retry::RetryPolicy;
