//! Resolution and execution of remote tool-call requests.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::arguments::ToolArguments;
use super::provider::{qualified_name, ProviderToolAdapter};
use super::tool::{Tool, ToolExecutionContext};
use crate::agent::Agent;
use crate::error::{ColloquyError, Result};
use crate::service::{FunctionDefinition, ToolCallRequest, ToolDefinition, ToolOutput};
use crate::util::with_cancellation;

/// The merged tool set of one agent, addressable by qualified name.
#[derive(Clone, Default)]
pub struct ToolInvoker {
    entries: Vec<(String, Arc<dyn Tool>)>,
    index: HashMap<String, usize>,
}

impl ToolInvoker {
    /// Build from `(qualified_name, tool)` pairs; names must be unique.
    pub fn new(entries: impl IntoIterator<Item = (String, Arc<dyn Tool>)>) -> Result<Self> {
        let mut invoker = Self::default();
        for (name, tool) in entries {
            if invoker.index.contains_key(&name) {
                return Err(ColloquyError::DuplicateTool(name));
            }
            invoker.index.insert(name.clone(), invoker.entries.len());
            invoker.entries.push((name, tool));
        }
        Ok(invoker)
    }

    /// Merge the agent's own tools (plain names) with every tool of its
    /// attached providers (`<provider>-<function>`).
    pub async fn for_agent(agent: &Agent) -> Result<Self> {
        let mut entries: Vec<(String, Arc<dyn Tool>)> = agent
            .tools()
            .iter()
            .map(|tool| (tool.name().to_string(), Arc::clone(tool)))
            .collect();

        for provider in agent.providers() {
            for tool in provider.list_tools().await? {
                let name = qualified_name(provider.name(), &tool.name);
                let adapter: Arc<dyn Tool> =
                    Arc::new(ProviderToolAdapter::new(Arc::clone(provider), tool));
                entries.push((name, adapter));
            }
        }

        let invoker = Self::new(entries)?;
        debug!(agent_id = %agent.id(), tools = invoker.len(), "merged agent tools");
        Ok(invoker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Qualified names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn resolve(&self, qualified_name: &str) -> Result<Arc<dyn Tool>> {
        self.index
            .get(qualified_name)
            .map(|&i| Arc::clone(&self.entries[i].1))
            .ok_or_else(|| ColloquyError::UnknownTool(qualified_name.to_string()))
    }

    /// Function definitions advertised to a run, keyed by qualified name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .iter()
            .map(|(name, tool)| ToolDefinition::Function {
                function: FunctionDefinition {
                    name: name.clone(),
                    description: tool.description().to_string(),
                    parameters: tool.parameters().schema.clone(),
                },
            })
            .collect()
    }

    /// Execute one call. Failures propagate; nothing is swallowed here.
    pub async fn execute(
        &self,
        request: &ToolCallRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let tool = self.resolve(&request.qualified_name)?;
        let args = ToolArguments::parse(&request.arguments_json).map_err(|message| {
            ColloquyError::MalformedArguments {
                tool_name: request.qualified_name.clone(),
                message,
            }
        })?;
        let ctx = ToolExecutionContext {
            tool_call_id: Some(request.call_id.clone()),
            qualified_name: Some(request.qualified_name.clone()),
            cancel: cancel.clone(),
        };

        debug!(call_id = %request.call_id, tool = %request.qualified_name, "executing tool");
        let value = with_cancellation(cancel, tool.execute(&args, &ctx))
            .await
            .map_err(|err| match err {
                ColloquyError::OperationCancelled | ColloquyError::ToolExecution { .. } => err,
                other => ColloquyError::ToolExecution {
                    tool_name: request.qualified_name.clone(),
                    message: other.to_string(),
                },
            })?;

        let output = match value {
            serde_json::Value::String(text) => text,
            other => serde_json::to_string(&other)?,
        };
        Ok(ToolOutput {
            tool_call_id: request.call_id.clone(),
            output,
        })
    }

    /// Execute a batch concurrently and wait for all of it.
    ///
    /// The first failure fails the batch; calls already running are left to
    /// finish on their own tasks. Outputs keep request order.
    pub async fn execute_batch(
        self: &Arc<Self>,
        requests: Vec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolOutput>> {
        let handles = requests.into_iter().map(|request| {
            let invoker = Arc::clone(self);
            let cancel = cancel.clone();
            let tool_name = request.qualified_name.clone();
            let handle = tokio::spawn(async move { invoker.execute(&request, &cancel).await });
            async move {
                handle.await.map_err(|err| ColloquyError::ToolExecution {
                    tool_name,
                    message: format!("tool task failed: {err}"),
                })?
            }
        });
        future::try_join_all(handles).await
    }
}

impl std::fmt::Debug for ToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolInvoker")
            .field("tools", &self.names().collect::<Vec<_>>())
            .finish()
    }
}
