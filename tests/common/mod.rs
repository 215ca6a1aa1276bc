//! Shared test helpers and a scripted run service.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use colloquy::agent::{Agent, AgentBuilder, AgentDefinition};
use colloquy::error::{ColloquyError, Result};
use colloquy::service::*;
use colloquy::tools::{FunctionTool, ToolParameters};
use colloquy::types::Role;

/// What the next `retrieve_run` call returns.
#[derive(Debug, Clone)]
pub enum Poll {
    Status(RunStatus),
    /// `requires_action` with the calls carried on the run itself, as
    /// `(call_id, name, arguments)`.
    RequiresActionWith(Vec<(String, String, String)>),
    /// A transient read failure (HTTP 503).
    Unavailable,
    /// A non-retryable failure (HTTP 400).
    BadRequest,
    Failed(String),
}

#[derive(Default)]
struct State {
    polls: VecDeque<Poll>,
    last_status: Option<RunStatus>,
    steps: HashMap<RunStatus, Vec<RunStep>>,
    messages: HashMap<String, ThreadMessage>,
    missing_fetches: HashMap<String, usize>,
    broken_messages: HashSet<String>,
    rejected_texts: HashSet<String>,
    fetches: HashMap<String, usize>,
    created_messages: Vec<(String, NewMessage)>,
    runs: Vec<(String, RunOptions)>,
    submissions: Vec<Vec<ToolOutput>>,
    history_pages: HashMap<Option<String>, MessagePage>,
    assistant_names: HashMap<String, String>,
    created_assistants: Vec<(AgentDefinition, Vec<ToolDefinition>)>,
    deleted_threads: Vec<String>,
    deleted_assistants: Vec<String>,
}

/// In-memory [`RunService`] driven by a script.
///
/// Without scripted polls every run completes on the first poll. With
/// `auto_reply` each completed run that has no scripted steps creates one
/// message `msg_<run id>` reading `"<assistant id>: reply <n>"`.
pub struct FakeRunService {
    binding: ServiceBinding,
    state: Mutex<State>,
    auto_reply: bool,
    create_thread_delay: Duration,
    pub threads_created: AtomicUsize,
    pub polls_made: AtomicUsize,
    pub assistant_lookups: AtomicUsize,
}

impl Default for FakeRunService {
    fn default() -> Self {
        Self {
            binding: ServiceBinding::default(),
            state: Mutex::new(State::default()),
            auto_reply: false,
            create_thread_delay: Duration::ZERO,
            threads_created: AtomicUsize::new(0),
            polls_made: AtomicUsize::new(0),
            assistant_lookups: AtomicUsize::new(0),
        }
    }
}

impl FakeRunService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binding(mut self, binding: ServiceBinding) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_auto_reply(mut self) -> Self {
        self.auto_reply = true;
        self
    }

    pub fn with_create_thread_delay(mut self, delay: Duration) -> Self {
        self.create_thread_delay = delay;
        self
    }

    pub fn script_polls(&self, polls: impl IntoIterator<Item = Poll>) {
        self.state.lock().unwrap().polls.extend(polls);
    }

    pub fn steps_when(&self, status: RunStatus, steps: Vec<RunStep>) {
        self.state.lock().unwrap().steps.insert(status, steps);
    }

    pub fn add_message(&self, message: ThreadMessage) {
        self.state
            .lock()
            .unwrap()
            .messages
            .insert(message.id.clone(), message);
    }

    /// Answer not-found for the first `times` fetches of `message_id`.
    pub fn hide_message(&self, message_id: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .missing_fetches
            .insert(message_id.to_string(), times);
    }

    /// Answer every fetch of `message_id` with a server error.
    pub fn break_message(&self, message_id: &str) {
        self.state
            .lock()
            .unwrap()
            .broken_messages
            .insert(message_id.to_string());
    }

    /// Fail the next append of a message reading `text` with a server error.
    pub fn reject_message_once(&self, text: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_texts
            .insert(text.to_string());
    }

    pub fn add_history_page(&self, after: Option<&str>, page: MessagePage) {
        self.state
            .lock()
            .unwrap()
            .history_pages
            .insert(after.map(str::to_string), page);
    }

    pub fn name_assistant(&self, id: &str, name: &str) {
        self.state
            .lock()
            .unwrap()
            .assistant_names
            .insert(id.to_string(), name.to_string());
    }

    pub fn fetches_of(&self, message_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .fetches
            .get(message_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn runs(&self) -> Vec<(String, RunOptions)> {
        self.state.lock().unwrap().runs.clone()
    }

    /// Messages appended to threads, as `(thread_id, text)`.
    pub fn created_texts(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .created_messages
            .iter()
            .map(|(thread, message)| {
                let text = message
                    .content
                    .iter()
                    .filter_map(|c| match c {
                        NewMessageContent::Text { text } => Some(text.as_str()),
                        NewMessageContent::ImageFile { .. } => None,
                    })
                    .collect::<Vec<_>>()
                    .join("");
                (thread.clone(), text)
            })
            .collect()
    }

    pub fn created_roles(&self) -> Vec<Role> {
        self.state
            .lock()
            .unwrap()
            .created_messages
            .iter()
            .map(|(_, message)| message.role)
            .collect()
    }

    pub fn created_assistants(&self) -> Vec<(AgentDefinition, Vec<ToolDefinition>)> {
        self.state.lock().unwrap().created_assistants.clone()
    }

    pub fn deleted_threads(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_threads.clone()
    }

    pub fn deleted_assistants(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_assistants.clone()
    }
}

#[async_trait]
impl RunService for FakeRunService {
    fn binding(&self) -> &ServiceBinding {
        &self.binding
    }

    async fn create_thread(&self) -> Result<String> {
        if !self.create_thread_delay.is_zero() {
            tokio::time::sleep(self.create_thread_delay).await;
        }
        let n = self.threads_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("thread_{n}"))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .deleted_threads
            .push(thread_id.to_string());
        Ok(())
    }

    async fn create_message(&self, thread_id: &str, message: &NewMessage) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let text: String = message
            .content
            .iter()
            .filter_map(|c| match c {
                NewMessageContent::Text { text } => Some(text.as_str()),
                NewMessageContent::ImageFile { .. } => None,
            })
            .collect();
        if state.rejected_texts.remove(&text) {
            return Err(ColloquyError::api(503, "service unavailable"));
        }
        state
            .created_messages
            .push((thread_id.to_string(), message.clone()));
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str, options: &RunOptions) -> Result<Run> {
        let mut state = self.state.lock().unwrap();
        let id = format!("run_{}", state.runs.len() + 1);
        state.runs.push((id.clone(), options.clone()));
        state.last_status = Some(RunStatus::Queued);
        Ok(Run::new(id, RunStatus::Queued))
    }

    async fn retrieve_run(&self, _thread_id: &str, run_id: &str) -> Result<Run> {
        self.polls_made.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let poll = state
            .polls
            .pop_front()
            .unwrap_or(Poll::Status(RunStatus::Completed));
        match poll {
            Poll::Status(status) => {
                state.last_status = Some(status);
                Ok(Run::new(run_id, status))
            }
            Poll::RequiresActionWith(calls) => {
                state.last_status = Some(RunStatus::RequiresAction);
                let tool_calls: Vec<_> = calls
                    .iter()
                    .map(|(id, name, arguments)| {
                        serde_json::json!({
                            "id": id,
                            "type": "function",
                            "function": { "name": name, "arguments": arguments }
                        })
                    })
                    .collect();
                let run = serde_json::from_value(serde_json::json!({
                    "id": run_id,
                    "status": "requires_action",
                    "required_action": {
                        "type": "submit_tool_outputs",
                        "submit_tool_outputs": { "tool_calls": tool_calls }
                    }
                }))
                .unwrap();
                Ok(run)
            }
            Poll::Unavailable => Err(ColloquyError::api(503, "service unavailable")),
            Poll::BadRequest => Err(ColloquyError::api(400, "bad request")),
            Poll::Failed(message) => {
                state.last_status = Some(RunStatus::Failed);
                let mut run = Run::new(run_id, RunStatus::Failed);
                run.last_error = Some(RunError {
                    code: Some("server_error".into()),
                    message,
                });
                Ok(run)
            }
        }
    }

    async fn list_run_steps(&self, _thread_id: &str, run_id: &str) -> Result<Vec<RunStep>> {
        let mut state = self.state.lock().unwrap();
        let status = state.last_status.unwrap_or(RunStatus::Queued);
        if let Some(steps) = state.steps.get(&status) {
            return Ok(steps.clone());
        }
        if self.auto_reply && status == RunStatus::Completed {
            let message_id = format!("msg_{run_id}");
            let assistant = state
                .runs
                .iter()
                .find(|(id, _)| id == run_id)
                .map(|(_, options)| options.assistant_id.clone())
                .unwrap_or_default();
            let n = state.runs.len();
            let message = assistant_message(&message_id, &format!("{assistant}: reply {n}"));
            state.messages.insert(message_id.clone(), message);
            return Ok(vec![message_step(&format!("step_{run_id}"), &message_id, n as i64)]);
        }
        Ok(Vec::new())
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push(outputs.to_vec());
        state.last_status = Some(RunStatus::Queued);
        Ok(Run::new(run_id, RunStatus::Queued))
    }

    async fn retrieve_message(&self, _thread_id: &str, message_id: &str) -> Result<ThreadMessage> {
        let mut state = self.state.lock().unwrap();
        *state.fetches.entry(message_id.to_string()).or_default() += 1;
        if state.broken_messages.contains(message_id) {
            return Err(ColloquyError::api(500, "internal error"));
        }
        if let Some(remaining) = state.missing_fetches.get_mut(message_id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ColloquyError::not_found(format!("No message found with id '{message_id}'")));
            }
        }
        state
            .messages
            .get(message_id)
            .cloned()
            .ok_or_else(|| ColloquyError::not_found(message_id.to_string()))
    }

    async fn list_messages(&self, _thread_id: &str, after: Option<&str>) -> Result<MessagePage> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .history_pages
            .get(&after.map(str::to_string))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_assistant(
        &self,
        definition: &AgentDefinition,
        tools: &[ToolDefinition],
    ) -> Result<AssistantInfo> {
        let mut state = self.state.lock().unwrap();
        state
            .created_assistants
            .push((definition.clone(), tools.to_vec()));
        Ok(AssistantInfo {
            id: format!("asst_{}", state.created_assistants.len()),
            name: definition.name.clone(),
            model: Some(definition.model.clone()),
            instructions: definition.instructions.clone(),
            description: definition.description.clone(),
        })
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo> {
        self.assistant_lookups.fetch_add(1, Ordering::SeqCst);
        let name = self
            .state
            .lock()
            .unwrap()
            .assistant_names
            .get(assistant_id)
            .cloned();
        Ok(AssistantInfo {
            id: assistant_id.to_string(),
            name,
            model: Some("gpt-4o".into()),
            instructions: None,
            description: None,
        })
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .deleted_assistants
            .push(assistant_id.to_string());
        Ok(())
    }
}

pub fn message_step(step_id: &str, message_id: &str, completed_at: i64) -> RunStep {
    serde_json::from_value(serde_json::json!({
        "id": step_id,
        "status": "completed",
        "completed_at": completed_at,
        "step_details": {
            "type": "message_creation",
            "message_creation": { "message_id": message_id }
        }
    }))
    .unwrap()
}

/// An in-progress tool-call step; `calls` are `(call_id, name, arguments)`.
pub fn tool_step(step_id: &str, calls: &[(&str, &str, &str)]) -> RunStep {
    let tool_calls: Vec<_> = calls
        .iter()
        .map(|(id, name, arguments)| {
            serde_json::json!({
                "id": id,
                "type": "function",
                "function": { "name": name, "arguments": arguments }
            })
        })
        .collect();
    serde_json::from_value(serde_json::json!({
        "id": step_id,
        "status": "in_progress",
        "completed_at": null,
        "step_details": { "type": "tool_calls", "tool_calls": tool_calls }
    }))
    .unwrap()
}

pub fn assistant_message(id: &str, text: &str) -> ThreadMessage {
    ThreadMessage {
        id: id.to_string(),
        role: Role::Assistant,
        assistant_id: Some("asst_1".into()),
        run_id: None,
        content: vec![MessageContent::Text {
            text: TextContent {
                value: text.to_string(),
                annotations: Vec::new(),
            },
        }],
        created_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
    }
}

pub fn user_message(id: &str, text: &str) -> ThreadMessage {
    ThreadMessage {
        role: Role::User,
        assistant_id: None,
        ..assistant_message(id, text)
    }
}

/// Polling options with round numbers so paused-clock tests read easily.
pub fn test_polling() -> colloquy::channel::RunPollingOptions {
    colloquy::channel::RunPollingOptions {
        run_polling_backoff: Duration::from_millis(100),
        run_polling_interval: Duration::from_millis(1000),
        run_polling_backoff_threshold: 2,
        message_synchronization_delay: Duration::from_millis(250),
        message_fetch_attempts: 4,
    }
}

/// A tool that doubles `n`.
pub fn double_tool() -> FunctionTool {
    FunctionTool::new(
        "double",
        "Double a number",
        ToolParameters::object().integer("n", "Number", true).build(),
        |args, _ctx| async move { Ok(serde_json::json!(args.get_i64("n")? * 2)) },
    )
}

/// A tool that always fails.
pub fn broken_tool() -> FunctionTool {
    FunctionTool::new(
        "broken",
        "Always fails",
        ToolParameters::empty(),
        |_args, _ctx| async move {
            Err(ColloquyError::InvalidArgument("disk on fire".into()))
        },
    )
}

pub async fn attach_agent(service: &Arc<FakeRunService>, id: &str, name: &str) -> Arc<Agent> {
    let service: Arc<dyn RunService> = Arc::clone(service) as Arc<dyn RunService>;
    AgentBuilder::new(
        service,
        AgentDefinition::builder()
            .model("gpt-4o")
            .name(name)
            .instructions(format!("You are {name}."))
            .build(),
    )
    .with_polling(test_polling())
    .attach(id)
    .await
    .unwrap()
}
