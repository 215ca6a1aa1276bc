//! Error classification and remote error details.

use serde::{Deserialize, Serialize};

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    NotFound,
    Api,
    Configuration,
    Serialization,
    ToolExecution,
    Run,
    Cancelled,
    Conversation,
    Unknown,
}

/// Structured details returned in a remote error body.
///
/// Parsed from `{"error": {"message": .., "type": .., "code": .., "param": ..}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default, skip_deserializing)]
    pub request_id: Option<String>,
}
