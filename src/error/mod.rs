//! Error types for Colloquy.

pub mod unified;

pub use unified::{ErrorCategory, ErrorDetails};

use thiserror::Error;

use crate::service::RunStatus;

/// Primary error type for all Colloquy operations.
#[derive(Error, Debug)]
pub enum ColloquyError {
    #[error("Agent unavailable: {0} has been deleted")]
    AgentUnavailable(String),

    #[error("Run {run_id} ended with status {status}: {}", detail.as_deref().unwrap_or("no error detail"))]
    RunTerminated {
        run_id: String,
        status: RunStatus,
        detail: Option<String>,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Malformed arguments for {tool_name}: {message}")]
    MalformedArguments { tool_name: String, message: String },

    #[error("Tool execution error in {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Operation cancelled")]
    OperationCancelled,

    #[error("Turn limit of {0} reached without termination")]
    TurnLimitExceeded(usize),

    #[error("No eligible agent: {0}")]
    NoEligibleAgent(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<ErrorDetails>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
}

impl ColloquyError {
    /// Create an API error without details.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error with structured details.
    pub fn api_with_details(status: u16, message: impl Into<String>, details: ErrorDetails) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Shorthand for a 404 from the remote service.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::api(404, message)
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(err) if err.is_timeout() => ErrorCategory::Timeout,
            Self::Network(_) => ErrorCategory::Network,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                404 => ErrorCategory::NotFound,
                408 => ErrorCategory::Timeout,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::UnknownTool(_)
            | Self::MalformedArguments { .. }
            | Self::ToolExecution { .. }
            | Self::DuplicateTool(_) => ErrorCategory::ToolExecution,
            Self::RunTerminated { .. } => ErrorCategory::Run,
            Self::OperationCancelled => ErrorCategory::Cancelled,
            Self::AgentUnavailable(_)
            | Self::TurnLimitExceeded(_)
            | Self::NoEligibleAgent(_) => ErrorCategory::Conversation,
            Self::InvalidArgument(_) | Self::UnsupportedOperation(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether this is a transient remote failure worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Whether the remote service reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ColloquyError>;
