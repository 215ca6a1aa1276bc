//! The [`Tool`] seam and [`FunctionTool`], a tool backed by an async closure.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::Result;

/// Per-call details handed to a tool while a run waits on it.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutionContext {
    /// Remote call id this execution answers.
    pub tool_call_id: Option<String>,
    /// Key the run used to address the tool, `<provider>-<function>` for
    /// provider tools.
    pub qualified_name: Option<String>,
    /// Fires when the surrounding turn is cancelled.
    pub cancel: CancellationToken,
}

/// A function the remote run can call.
///
/// A string result is submitted verbatim; any other value is submitted as
/// its JSON text.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique within the agent, or within its provider.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value>;
}

type Handler =
    dyn Fn(ToolArguments, ToolExecutionContext) -> BoxFuture<'static, Result<serde_json::Value>>
        + Send
        + Sync;

/// An agent-owned tool defined inline.
///
/// ```no_run
/// use colloquy::tools::{FunctionTool, ToolParameters};
///
/// let double = FunctionTool::new(
///     "double",
///     "Double a number",
///     ToolParameters::object().integer("n", "Number", true).build(),
///     |args, _ctx| async move { Ok(serde_json::json!(args.get_i64("n")? * 2)) },
/// );
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    run: Arc<Handler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        run: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            run: Arc::new(move |args, ctx| Box::pin(run(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(
        &self,
        args: &ToolArguments,
        ctx: &ToolExecutionContext,
    ) -> Result<serde_json::Value> {
        (self.run)(args.clone(), ctx.clone()).await
    }
}

impl fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
