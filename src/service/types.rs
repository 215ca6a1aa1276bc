//! Records exchanged with the remote run service.
//!
//! Field names follow the Assistants v2 wire format so the HTTP service can
//! deserialize responses directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::Role;

/// Lifecycle status of a remote run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this client does not know about; polled like a pending one.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Still executing remotely; keep polling.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            Self::Queued | Self::InProgress | Self::Cancelling | Self::Unknown
        )
    }

    /// Ended without success.
    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            Self::Expired | Self::Failed | Self::Cancelled | Self::Incomplete
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Completed || self.is_terminal_failure()
    }
}

/// A remote run as returned by create/retrieve/submit calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl Run {
    pub fn new(id: impl Into<String>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
            status,
            required_action: None,
            last_error: None,
        }
    }

    /// Tool calls the run is blocked on, if any.
    pub fn required_tool_calls(&self) -> Vec<ToolCallRequest> {
        self.required_action
            .as_ref()
            .and_then(|action| action.submit_tool_outputs.as_ref())
            .map(|outputs| outputs.tool_calls.iter().map(ToolCallRequest::from).collect())
            .unwrap_or_default()
    }

    /// Human-readable failure detail (`code: message`).
    pub fn error_detail(&self) -> Option<String> {
        self.last_error.as_ref().map(|err| match &err.code {
            Some(code) => format!("{code}: {}", err.message),
            None => err.message.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequiredAction {
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputsAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitToolOutputsAction {
    pub tool_calls: Vec<FunctionToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// A function call as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
    /// Set once the output has been submitted.
    #[serde(default)]
    pub output: Option<String>,
}

/// One tool call the remote side asked us to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub qualified_name: String,
    pub arguments_json: String,
}

impl From<&FunctionToolCall> for ToolCallRequest {
    fn from(call: &FunctionToolCall) -> Self {
        Self {
            call_id: call.id.clone(),
            qualified_name: call.function.name.clone(),
            arguments_json: call.function.arguments.clone(),
        }
    }
}

/// Output of one executed tool call, paired by `tool_call_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolOutput {
    pub tool_call_id: String,
    pub output: String,
}

/// A remote record of one action taken during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunStep {
    pub id: String,
    #[serde(default)]
    pub status: RunStepStatus,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub completed_at: Option<DateTime<Utc>>,
    pub step_details: StepDetails,
}

impl RunStep {
    /// The message id, for a completed message-creation step.
    pub fn created_message_id(&self) -> Option<&str> {
        match &self.step_details {
            StepDetails::MessageCreation { message_creation } if self.completed_at.is_some() => {
                Some(message_creation.message_id.as_str())
            }
            _ => None,
        }
    }

    /// Function calls of an in-progress tool-call step.
    pub fn pending_function_calls(&self) -> Vec<ToolCallRequest> {
        if self.status != RunStepStatus::InProgress {
            return Vec::new();
        }
        match &self.step_details {
            StepDetails::ToolCalls { tool_calls } => tool_calls
                .iter()
                .filter_map(|call| match call {
                    StepToolCall::Function { id, function } => Some(ToolCallRequest {
                        call_id: id.clone(),
                        qualified_name: function.name.clone(),
                        arguments_json: function.arguments.clone(),
                    }),
                    StepToolCall::CodeInterpreter { .. }
                    | StepToolCall::FileSearch { .. }
                    | StepToolCall::Other => None,
                })
                .collect(),
            StepDetails::MessageCreation { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStepStatus {
    InProgress,
    Cancelled,
    Failed,
    Completed,
    Expired,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepDetails {
    MessageCreation { message_creation: MessageCreation },
    ToolCalls { tool_calls: Vec<StepToolCall> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageCreation {
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepToolCall {
    Function { id: String, function: FunctionCall },
    CodeInterpreter { id: String },
    FileSearch { id: String },
    #[serde(other)]
    Other,
}

/// A message stored on a remote thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<MessageContent>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    ImageFile { image_file: FileRef },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<TextAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextAnnotation {
    FileCitation {
        text: String,
        #[serde(default)]
        start_index: Option<u32>,
        #[serde(default)]
        end_index: Option<u32>,
        file_citation: FileRef,
    },
    FilePath {
        text: String,
        #[serde(default)]
        start_index: Option<u32>,
        #[serde(default)]
        end_index: Option<u32>,
        file_path: FileRef,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRef {
    pub file_id: String,
}

/// One page of thread messages, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MessagePage {
    pub data: Vec<ThreadMessage>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

/// A message to append to a thread.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewMessage {
    pub role: Role,
    pub content: Vec<NewMessageContent>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NewMessageContent {
    Text { text: String },
    ImageFile { image_file: FileRef },
}

/// Parameters for starting a run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunOptions {
    pub assistant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
}

/// A tool advertised to the remote run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    Function { function: FunctionDefinition },
    CodeInterpreter,
    FileSearch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Remote assistant metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
