//! Remote run service contract and its OpenAI Assistants implementation.

pub mod http;
pub mod openai;
pub mod types;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::agent::AgentDefinition;
use crate::error::{ColloquyError, Result};

pub use openai::OpenAiAssistantsService;
pub use types::*;

/// Where a service sends its requests.
///
/// Two services with equal bindings can safely share a remote thread.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceBinding {
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub transport: Option<TransportBinding>,
}

/// A custom HTTP transport configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportBinding {
    pub base_address: Option<String>,
    /// Extra headers sent on every request; ordered so keys derive stably.
    pub headers: BTreeMap<String, String>,
}

/// Request/response operations of a remote run service.
///
/// There are no push notifications: polling [`RunService::retrieve_run`] is
/// the only way to observe progress.
#[async_trait]
pub trait RunService: Send + Sync {
    /// Endpoint/transport identity used to derive channel keys.
    fn binding(&self) -> &ServiceBinding;

    async fn create_thread(&self) -> Result<String>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    async fn create_message(&self, thread_id: &str, message: &NewMessage) -> Result<()>;

    async fn create_run(&self, thread_id: &str, options: &RunOptions) -> Result<Run>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// All steps of a run in the order the service reports them.
    async fn list_run_steps(&self, thread_id: &str, run_id: &str) -> Result<Vec<RunStep>>;

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run>;

    async fn retrieve_message(&self, thread_id: &str, message_id: &str) -> Result<ThreadMessage>;

    /// One page of messages, newest first, starting after `after`.
    async fn list_messages(&self, thread_id: &str, after: Option<&str>) -> Result<MessagePage>;

    async fn create_assistant(
        &self,
        _definition: &AgentDefinition,
        _tools: &[ToolDefinition],
    ) -> Result<AssistantInfo> {
        Err(ColloquyError::UnsupportedOperation(
            "create_assistant".to_string(),
        ))
    }

    async fn retrieve_assistant(&self, _assistant_id: &str) -> Result<AssistantInfo> {
        Err(ColloquyError::UnsupportedOperation(
            "retrieve_assistant".to_string(),
        ))
    }

    async fn delete_assistant(&self, _assistant_id: &str) -> Result<()> {
        Err(ColloquyError::UnsupportedOperation(
            "delete_assistant".to_string(),
        ))
    }
}
