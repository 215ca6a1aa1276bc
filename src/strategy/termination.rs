//! Deciding when a group chat is finished.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::agent::Agent;
use crate::types::ChatMessage;

/// Consulted once after every completed turn.
#[async_trait]
pub trait TerminationStrategy: Send + Sync {
    /// Whether the conversation should stop after `agent`'s turn.
    async fn should_terminate(&self, agent: &Agent, history: &[ChatMessage]) -> bool;
}

/// Stop when the last message matches any of the patterns.
#[derive(Debug, Clone)]
pub struct RegexTermination {
    patterns: Vec<regex::Regex>,
}

impl RegexTermination {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| regex::Regex::new(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }
}

#[async_trait]
impl TerminationStrategy for RegexTermination {
    async fn should_terminate(&self, _agent: &Agent, history: &[ChatMessage]) -> bool {
        let Some(last) = history.last() else {
            return false;
        };
        let text = last.text();
        self.patterns.iter().any(|regex| regex.is_match(&text))
    }
}

/// Stop when a custom predicate over the history returns true.
pub struct PredicateTermination<F: Fn(&[ChatMessage]) -> bool + Send + Sync> {
    predicate: F,
}

impl<F: Fn(&[ChatMessage]) -> bool + Send + Sync> PredicateTermination<F> {
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl<F: Fn(&[ChatMessage]) -> bool + Send + Sync> TerminationStrategy for PredicateTermination<F> {
    async fn should_terminate(&self, _agent: &Agent, history: &[ChatMessage]) -> bool {
        (self.predicate)(history)
    }
}

/// How an [`AggregateTermination`] combines its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateCondition {
    #[default]
    Any,
    All,
}

/// Combines several strategies.
pub struct AggregateTermination {
    condition: AggregateCondition,
    strategies: Vec<Box<dyn TerminationStrategy>>,
}

impl AggregateTermination {
    pub fn any() -> Self {
        Self {
            condition: AggregateCondition::Any,
            strategies: Vec::new(),
        }
    }

    pub fn all() -> Self {
        Self {
            condition: AggregateCondition::All,
            strategies: Vec::new(),
        }
    }

    pub fn with(mut self, strategy: impl TerminationStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }
}

#[async_trait]
impl TerminationStrategy for AggregateTermination {
    async fn should_terminate(&self, agent: &Agent, history: &[ChatMessage]) -> bool {
        if self.strategies.is_empty() {
            return false;
        }
        for strategy in &self.strategies {
            let stop = strategy.should_terminate(agent, history).await;
            match self.condition {
                AggregateCondition::Any if stop => return true,
                AggregateCondition::All if !stop => return false,
                _ => {}
            }
        }
        self.condition == AggregateCondition::All
    }
}

/// Never stops; the turn limit ends the chat.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverTermination;

#[async_trait]
impl TerminationStrategy for NeverTermination {
    async fn should_terminate(&self, _agent: &Agent, _history: &[ChatMessage]) -> bool {
        false
    }
}

/// Only lets turns by the listed agents end the chat.
pub struct ScopedTermination<T> {
    inner: T,
    agent_ids: HashSet<String>,
}

impl<T: TerminationStrategy> ScopedTermination<T> {
    pub fn new<I, S>(inner: T, agent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner,
            agent_ids: agent_ids.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl<T: TerminationStrategy> TerminationStrategy for ScopedTermination<T> {
    async fn should_terminate(&self, agent: &Agent, history: &[ChatMessage]) -> bool {
        self.agent_ids.contains(agent.id()) && self.inner.should_terminate(agent, history).await
    }
}
