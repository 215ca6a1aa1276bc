//! Multi-agent conversation loop.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agent::Agent;
use crate::channel::{ChannelRegistry, RunChannel};
use crate::error::{ColloquyError, Result};
use crate::strategy::{NeverTermination, SelectionStrategy, SequentialSelection, TerminationStrategy};
use crate::types::ChatMessage;

const DEFAULT_MAX_TURNS: usize = 10;

/// How a [`GroupChat`] picks speakers and when it stops.
#[derive(Clone)]
pub struct GroupChatSettings {
    pub selection: Arc<dyn SelectionStrategy>,
    pub termination: Arc<dyn TerminationStrategy>,
    /// Turns one `invoke` may take before failing with
    /// [`ColloquyError::TurnLimitExceeded`].
    pub max_turns: usize,
}

impl Default for GroupChatSettings {
    fn default() -> Self {
        Self {
            selection: Arc::new(SequentialSelection::new()),
            termination: Arc::new(NeverTermination),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl GroupChatSettings {
    pub fn with_selection(mut self, selection: impl SelectionStrategy + 'static) -> Self {
        self.selection = Arc::new(selection);
        self
    }

    pub fn with_termination(mut self, termination: impl TerminationStrategy + 'static) -> Self {
        self.termination = Arc::new(termination);
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }
}

impl std::fmt::Debug for GroupChatSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupChatSettings")
            .field("max_turns", &self.max_turns)
            .finish_non_exhaustive()
    }
}

/// Shared history plus how much of it each channel has already been sent.
#[derive(Default)]
struct ChatState {
    history: Vec<ChatMessage>,
    /// Channel key to number of history entries present on its thread.
    synced: HashMap<String, usize>,
    complete: bool,
}

impl ChatState {
    /// History the channel has not seen, and the index it starts at.
    fn unseen(&self, key: &str) -> (Vec<ChatMessage>, usize) {
        let from = self.synced.get(key).copied().unwrap_or(0).min(self.history.len());
        (self.history[from..].to_vec(), from)
    }
}

/// A conversation between several agents, one turn at a time.
pub struct GroupChat {
    id: String,
    agents: Mutex<Vec<Arc<Agent>>>,
    settings: GroupChatSettings,
    registry: ChannelRegistry,
    state: Mutex<ChatState>,
}

impl GroupChat {
    pub fn new(agents: Vec<Arc<Agent>>, settings: GroupChatSettings) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agents: Mutex::new(agents),
            settings,
            registry: ChannelRegistry::new(),
            state: Mutex::new(ChatState::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> &GroupChatSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub async fn agents(&self) -> Vec<Arc<Agent>> {
        self.agents.lock().await.clone()
    }

    /// Add an agent to the roster; adding the same id twice is a no-op.
    pub async fn add_agent(&self, agent: Arc<Agent>) {
        let mut agents = self.agents.lock().await;
        if !agents.iter().any(|a| a.id() == agent.id()) {
            agents.push(agent);
        }
    }

    /// Append to shared history. Channels pick it up on their next turn.
    pub async fn add_message(&self, message: ChatMessage) {
        self.state.lock().await.history.push(message);
    }

    /// Shared history, oldest first.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.state.lock().await.history.clone()
    }

    /// Whether the last `invoke` ended because termination was reached.
    pub async fn is_complete(&self) -> bool {
        self.state.lock().await.complete
    }

    /// Run turns until termination, yielding every agent message.
    ///
    /// `input` is appended to history and sent to every channel that already
    /// has a thread before the first turn.
    pub fn invoke(
        self: &Arc<Self>,
        input: Option<ChatMessage>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ChatMessage>> {
        let chat = Arc::clone(self);

        let stream = async_stream::try_stream! {
            chat.state.lock().await.complete = false;
            if let Some(input) = input {
                chat.add_message(input).await;
                chat.broadcast(&cancel).await?;
            }

            let max_turns = chat.settings.max_turns;
            let mut terminated = false;
            for turn in 1..=max_turns {
                let agents = chat.agents().await;
                let history = chat.history().await;
                let agent = chat.settings.selection.next(&agents, &history).await?;
                ensure_member(&agents, &agent)?;
                debug!(chat_id = %chat.id, agent_id = %agent.id(), turn, "selected agent");

                let mut messages = chat.turn(Arc::clone(&agent), cancel.clone());
                while let Some(message) = messages.next().await {
                    let message = message?;
                    yield message;
                }

                let history = chat.history().await;
                if chat.settings.termination.should_terminate(&agent, &history).await {
                    info!(chat_id = %chat.id, agent_id = %agent.id(), turn, "group chat complete");
                    chat.state.lock().await.complete = true;
                    terminated = true;
                    break;
                }
            }

            ensure_terminated(terminated, max_turns)?;
        };

        Box::pin(stream)
    }

    /// One turn by `agent`, bypassing selection and termination.
    ///
    /// The agent joins the roster if it is not already part of it.
    pub fn invoke_agent(
        self: &Arc<Self>,
        agent: Arc<Agent>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ChatMessage>> {
        let chat = Arc::clone(self);

        let stream = async_stream::try_stream! {
            chat.add_agent(Arc::clone(&agent)).await;
            let mut messages = chat.turn(agent, cancel);
            while let Some(message) = messages.next().await {
                let message = message?;
                yield message;
            }
        };

        Box::pin(stream)
    }

    /// Replay the remote thread behind `agent`'s channel, newest first.
    ///
    /// Empty if the agent has not taken a turn yet.
    pub async fn agent_history(
        &self,
        agent: &Agent,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ChatMessage>> {
        match self.registry.get(agent).await {
            Some(channel) => channel.get_history(cancel),
            None => Box::pin(stream::empty()),
        }
    }

    /// Delete every remote thread and start over with empty history.
    pub async fn reset(&self, cancel: &CancellationToken) -> Result<()> {
        for channel in self.registry.clear().await {
            channel.delete(cancel).await?;
        }
        *self.state.lock().await = ChatState::default();
        self.settings.selection.reset().await;
        debug!(chat_id = %self.id, "group chat reset");
        Ok(())
    }

    fn turn(
        self: &Arc<Self>,
        agent: Arc<Agent>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ChatMessage>> {
        let chat = Arc::clone(self);

        let stream = async_stream::try_stream! {
            // Before any thread is created or history pushed.
            agent.ensure_available()?;
            let channel = chat.registry.get_or_create(&agent, &cancel).await?;
            let key = ChannelRegistry::channel_key(&agent);
            chat.sync_channel(&key, &channel, &cancel).await?;

            let mut messages = channel.invoke(agent, cancel.clone());
            while let Some(message) = messages.next().await {
                let message = message?;
                {
                    let mut state = chat.state.lock().await;
                    state.history.push(message.clone());
                    // Already on the channel's thread.
                    *state.synced.entry(key.clone()).or_default() += 1;
                }
                yield message;
            }
        };

        Box::pin(stream)
    }

    async fn broadcast(&self, cancel: &CancellationToken) -> Result<()> {
        for (key, channel) in self.registry.channels().await {
            self.sync_channel(&key, &channel, cancel).await?;
        }
        Ok(())
    }

    /// Send history the channel has not seen yet.
    ///
    /// The synced count advances per message, so a failure partway through
    /// resumes after the last message that landed.
    async fn sync_channel(
        &self,
        key: &str,
        channel: &RunChannel,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let (unseen, from) = self.state.lock().await.unseen(key);
        for (offset, message) in unseen.iter().enumerate() {
            channel.receive(std::slice::from_ref(message), cancel).await?;
            self.state
                .lock()
                .await
                .synced
                .insert(key.to_string(), from + offset + 1);
        }
        Ok(())
    }
}

impl std::fmt::Debug for GroupChat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupChat")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn ensure_member(agents: &[Arc<Agent>], selected: &Agent) -> Result<()> {
    if agents.iter().any(|agent| agent.id() == selected.id()) {
        return Ok(());
    }
    Err(ColloquyError::NoEligibleAgent(selected.id().to_string()))
}

fn ensure_terminated(terminated: bool, max_turns: usize) -> Result<()> {
    if terminated {
        return Ok(());
    }
    Err(ColloquyError::TurnLimitExceeded(max_turns))
}
