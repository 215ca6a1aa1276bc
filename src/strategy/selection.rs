//! Choosing which agent takes the next turn.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::agent::Agent;
use crate::error::{ColloquyError, Result};
use crate::types::ChatMessage;

/// Picks exactly one agent per call.
#[async_trait]
pub trait SelectionStrategy: Send + Sync {
    /// The agent to invoke next. Fails with [`ColloquyError::NoEligibleAgent`]
    /// when nobody qualifies.
    async fn next(&self, agents: &[Arc<Agent>], history: &[ChatMessage]) -> Result<Arc<Agent>>;

    /// Forget any internal state (for reuse across conversations).
    async fn reset(&self) {}
}

fn ensure_roster(agents: &[Arc<Agent>]) -> Result<()> {
    if agents.is_empty() {
        return Err(ColloquyError::NoEligibleAgent("no agents in the chat".into()));
    }
    Ok(())
}

/// Agents take turns in roster order, wrapping around.
#[derive(Debug, Default)]
pub struct SequentialSelection {
    initial_agent: Option<String>,
    state: Mutex<SequentialState>,
}

#[derive(Debug, Default)]
struct SequentialState {
    started: bool,
    next: usize,
}

impl SequentialSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the agent with this id instead of the first in the roster.
    pub fn with_initial_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.initial_agent = Some(agent_id.into());
        self
    }
}

#[async_trait]
impl SelectionStrategy for SequentialSelection {
    async fn next(&self, agents: &[Arc<Agent>], _history: &[ChatMessage]) -> Result<Arc<Agent>> {
        ensure_roster(agents)?;
        let mut state = self.state.lock().await;

        let index = match (&self.initial_agent, state.started) {
            (Some(initial), false) => agents
                .iter()
                .position(|agent| agent.id() == initial)
                .ok_or_else(|| ColloquyError::NoEligibleAgent(initial.clone()))?,
            _ => state.next % agents.len(),
        };

        state.started = true;
        state.next = index + 1;
        Ok(Arc::clone(&agents[index]))
    }

    async fn reset(&self) {
        *self.state.lock().await = SequentialState::default();
    }
}

type SelectionRule = dyn Fn(&[Arc<Agent>], &[ChatMessage]) -> Option<String> + Send + Sync;

/// Delegates the choice to a closure returning an agent id.
pub struct RuleSelection {
    rule: Box<SelectionRule>,
}

impl RuleSelection {
    pub fn new<F>(rule: F) -> Self
    where
        F: Fn(&[Arc<Agent>], &[ChatMessage]) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            rule: Box::new(rule),
        }
    }
}

#[async_trait]
impl SelectionStrategy for RuleSelection {
    async fn next(&self, agents: &[Arc<Agent>], history: &[ChatMessage]) -> Result<Arc<Agent>> {
        ensure_roster(agents)?;
        let id = (self.rule)(agents, history)
            .ok_or_else(|| ColloquyError::NoEligibleAgent("selection rule chose nobody".into()))?;
        agents
            .iter()
            .find(|agent| agent.id() == id)
            .cloned()
            .ok_or(ColloquyError::NoEligibleAgent(id))
    }
}

impl std::fmt::Debug for RuleSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleSelection").finish_non_exhaustive()
    }
}
