//! Run-based agent: a remote assistant plus the tools this process executes for it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::channel::RunPollingOptions;
use crate::error::{ColloquyError, Result};
use crate::service::RunService;
use crate::tools::{Tool, ToolInvoker, ToolProvider};

use super::definition::{AgentDefinition, HostedTool};

/// A conversational participant backed by a remote assistant.
///
/// Identity fields and tools are fixed at construction. The only mutable
/// state is the deleted flag.
pub struct Agent {
    id: String,
    definition: AgentDefinition,
    tools: Vec<Arc<dyn Tool>>,
    providers: Vec<Arc<dyn ToolProvider>>,
    service: Arc<dyn RunService>,
    polling: RunPollingOptions,
    deleted: AtomicBool,
}

impl Agent {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.definition.name.as_deref()
    }

    /// Name used as message author: the display name, else the id.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(&self.id)
    }

    pub fn instructions(&self) -> Option<&str> {
        self.definition.instructions.as_deref()
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    /// Tools declared directly on the agent.
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Attached capability providers.
    pub fn providers(&self) -> &[Arc<dyn ToolProvider>] {
        &self.providers
    }

    pub fn hosted_tools(&self) -> &[HostedTool] {
        &self.definition.hosted_tools
    }

    /// The service that creates this agent's channels and runs.
    pub fn service(&self) -> &Arc<dyn RunService> {
        &self.service
    }

    pub fn polling(&self) -> &RunPollingOptions {
        &self.polling
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    /// Delete the remote assistant. Afterwards every invocation fails with
    /// [`ColloquyError::AgentUnavailable`]. Deleting twice is a no-op.
    pub async fn delete(&self) -> Result<()> {
        if self.is_deleted() {
            return Ok(());
        }
        self.service.delete_assistant(&self.id).await?;
        self.deleted.store(true, Ordering::Release);
        debug!(agent_id = %self.id, "deleted assistant");
        Ok(())
    }

    pub(crate) fn ensure_available(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(ColloquyError::AgentUnavailable(self.id.clone()));
        }
        Ok(())
    }
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Agent {}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("name", &self.definition.name)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("deleted", &self.is_deleted())
            .finish()
    }
}

/// Assembles an [`Agent`] and binds it to a remote assistant.
pub struct AgentBuilder {
    service: Arc<dyn RunService>,
    definition: AgentDefinition,
    tools: Vec<Arc<dyn Tool>>,
    providers: Vec<Arc<dyn ToolProvider>>,
    polling: RunPollingOptions,
}

impl AgentBuilder {
    pub fn new(service: Arc<dyn RunService>, definition: AgentDefinition) -> Self {
        Self {
            service,
            definition,
            tools: Vec::new(),
            providers: Vec::new(),
            polling: RunPollingOptions::default(),
        }
    }

    /// Add a tool.
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Attach a capability provider; its tools are advertised as `<provider>-<function>`.
    pub fn with_provider(mut self, provider: impl ToolProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn with_shared_provider(mut self, provider: Arc<dyn ToolProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_polling(mut self, polling: RunPollingOptions) -> Self {
        self.polling = polling;
        self
    }

    fn into_agent(self, id: String) -> Agent {
        Agent {
            id,
            definition: self.definition,
            tools: self.tools,
            providers: self.providers,
            service: self.service,
            polling: self.polling,
            deleted: AtomicBool::new(false),
        }
    }

    /// Create the assistant remotely and return an agent bound to it.
    pub async fn create(self) -> Result<Arc<Agent>> {
        let mut agent = self.into_agent(String::new());
        let invoker = ToolInvoker::for_agent(&agent).await?;

        let mut tools = invoker.definitions();
        tools.extend(agent.hosted_tools().iter().map(|t| t.definition()));

        let info = agent
            .service
            .create_assistant(&agent.definition, &tools)
            .await?;
        agent.id = info.id;
        Ok(Arc::new(agent))
    }

    /// Bind to an existing assistant without a remote call.
    pub async fn attach(self, id: impl Into<String>) -> Result<Arc<Agent>> {
        let agent = self.into_agent(id.into());
        ToolInvoker::for_agent(&agent).await?;
        Ok(Arc::new(agent))
    }

    /// Bind to an existing assistant, taking name and instructions from the
    /// remote record.
    pub async fn retrieve(mut self, id: impl Into<String>) -> Result<Arc<Agent>> {
        let id = id.into();
        let info = self.service.retrieve_assistant(&id).await?;
        let hosted_tools = std::mem::take(&mut self.definition.hosted_tools);
        self.definition = AgentDefinition {
            hosted_tools,
            ..AgentDefinition::from_remote(&info)
        };
        self.attach(id).await
    }
}
