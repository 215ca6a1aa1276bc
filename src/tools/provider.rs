//! Capability providers: named groups of tools attached to an agent.

use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::{Tool, ToolExecutionContext};
use super::types::ToolParameters;
use crate::error::{ColloquyError, Result};

/// Separates the provider name from the function name in a merged tool key.
pub const FUNCTION_NAME_DELIMITER: &str = "-";

/// Compose the key a provider's function is advertised under.
pub fn qualified_name(provider: &str, function: &str) -> String {
    format!("{provider}{FUNCTION_NAME_DELIMITER}{function}")
}

/// A tool as described by its provider.
#[derive(Debug, Clone)]
pub struct ProvidedTool {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

/// A named source of tools, listed on first use per agent.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider name; becomes the prefix of every merged tool key.
    fn name(&self) -> &str;

    /// List available tools.
    async fn list_tools(&self) -> Result<Vec<ProvidedTool>>;

    /// Execute a tool by its unqualified name.
    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value>;
}

/// A fixed set of in-process tools exposed as a provider.
pub struct ToolSet {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }
}

#[async_trait]
impl ToolProvider for ToolSet {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ProvidedTool>> {
        Ok(self
            .tools
            .iter()
            .map(|tool| ProvidedTool {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters().clone(),
            })
            .collect())
    }

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .ok_or_else(|| ColloquyError::UnknownTool(qualified_name(&self.name, name)))?;
        tool.execute(args, ctx).await
    }
}

/// Exposes one [`ProvidedTool`] through the [`Tool`] trait, routing execution
/// back to its provider.
pub struct ProviderToolAdapter {
    provider: Arc<dyn ToolProvider>,
    tool: ProvidedTool,
}

impl ProviderToolAdapter {
    pub fn new(provider: Arc<dyn ToolProvider>, tool: ProvidedTool) -> Self {
        Self { provider, tool }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

#[async_trait]
impl Tool for ProviderToolAdapter {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> &str {
        &self.tool.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.tool.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value> {
        self.provider.execute_tool(&self.tool.name, args, ctx).await
    }
}
