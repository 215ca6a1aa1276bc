//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentBuilder, AgentDefinition, HostedTool};
pub use crate::channel::{ChannelRegistry, RunChannel, RunPollingOptions};
pub use crate::chat::{GroupChat, GroupChatSettings};
pub use crate::config::ColloquyConfig;
pub use crate::error::{ColloquyError, Result};
pub use crate::service::{OpenAiAssistantsService, RunService};
pub use crate::strategy::{
    AggregateTermination, NeverTermination, PredicateTermination, RegexTermination,
    RuleSelection, SelectionStrategy, SequentialSelection, TerminationStrategy,
};
pub use crate::tools::{FunctionTool, Tool, ToolArguments, ToolParameters, ToolProvider, ToolSet};
pub use crate::types::{ChatMessage, ContentItem, Role};
