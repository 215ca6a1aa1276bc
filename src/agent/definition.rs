//! Descriptive settings of a remote assistant.

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::service::ToolDefinition;

/// Tools executed by the remote service itself rather than by this process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HostedTool {
    CodeInterpreter,
    FileSearch,
}

impl HostedTool {
    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::CodeInterpreter => ToolDefinition::CodeInterpreter,
            Self::FileSearch => ToolDefinition::FileSearch,
        }
    }
}

/// Everything needed to create an assistant remotely.
///
/// ```
/// use colloquy::agent::{AgentDefinition, HostedTool};
///
/// let definition = AgentDefinition::builder()
///     .model("gpt-4o")
///     .name("Reviewer")
///     .instructions("Review the draft and list concrete problems.")
///     .hosted_tools(vec![HostedTool::CodeInterpreter])
///     .build();
/// assert_eq!(definition.name.as_deref(), Some("Reviewer"));
/// ```
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct AgentDefinition {
    #[builder(into)]
    pub model: String,
    #[builder(into)]
    pub name: Option<String>,
    #[builder(into)]
    pub description: Option<String>,
    #[builder(into)]
    pub instructions: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[builder(default)]
    #[serde(default)]
    pub hosted_tools: Vec<HostedTool>,
}

impl AgentDefinition {
    /// Definition of an assistant that already exists remotely.
    pub(crate) fn from_remote(info: &crate::service::AssistantInfo) -> Self {
        Self {
            model: info.model.clone().unwrap_or_default(),
            name: info.name.clone(),
            description: info.description.clone(),
            instructions: info.instructions.clone(),
            ..Self::default()
        }
    }
}
