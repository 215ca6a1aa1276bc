//! Drives agent turns as remote runs on one conversation thread.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::BoxStream;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::agent::Agent;
use crate::error::{ColloquyError, Result};
use crate::service::{Run, RunOptions, RunService, RunStatus, RunStep, ThreadMessage, ToolCallRequest};
use crate::tools::ToolInvoker;
use crate::types::{ChatMessage, Role};
use crate::util::cancel::sleep_or_cancel;
use crate::util::{with_cancellation, RetryPolicy};

use super::convert::{to_chat_messages, to_new_message};
use super::polling::RunPollingOptions;

/// A local adapter bound to exactly one remote thread.
///
/// Turns are serialized: the remote side allows one active run per thread,
/// so a second `invoke` waits until the first turn's stream has finished or
/// been dropped.
pub struct RunChannel {
    thread_id: String,
    service: Arc<dyn RunService>,
    polling: RunPollingOptions,
    turn: Mutex<()>,
    state: Mutex<ChannelState>,
}

#[derive(Default)]
struct ChannelState {
    /// Message ids already yielded by `invoke`.
    processed: HashSet<String>,
    /// Merged tools per agent id, built on first use.
    invokers: HashMap<String, Arc<ToolInvoker>>,
    /// Assistant id to display name, for history replay.
    authors: HashMap<String, String>,
}

impl RunChannel {
    /// Create a new remote thread and a channel bound to it.
    pub async fn create(
        service: Arc<dyn RunService>,
        polling: RunPollingOptions,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let thread_id = with_cancellation(cancel, service.create_thread()).await?;
        debug!(%thread_id, "created channel");
        Ok(Self::open(thread_id, service, polling))
    }

    /// Bind to an existing thread.
    pub fn open(
        thread_id: impl Into<String>,
        service: Arc<dyn RunService>,
        polling: RunPollingOptions,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            service,
            polling,
            turn: Mutex::new(()),
            state: Mutex::new(ChannelState::default()),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn polling(&self) -> &RunPollingOptions {
        &self.polling
    }

    /// Append history to the thread in order, skipping messages without content.
    pub async fn receive(&self, history: &[ChatMessage], cancel: &CancellationToken) -> Result<()> {
        for message in history.iter().filter_map(to_new_message) {
            with_cancellation(cancel, self.service.create_message(&self.thread_id, &message))
                .await?;
        }
        Ok(())
    }

    /// Take one turn for `agent`, yielding its messages as they appear.
    ///
    /// The stream ends once the run completes. A failure ends it with that
    /// error; messages already yielded stay valid.
    pub fn invoke(
        self: &Arc<Self>,
        agent: Arc<Agent>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ChatMessage>> {
        let channel = Arc::clone(self);

        let stream = async_stream::try_stream! {
            agent.ensure_available()?;
            let _turn = channel.turn.lock().await;

            let invoker = channel.tool_invoker(&agent).await?;
            let mut tools = invoker.definitions();
            tools.extend(agent.hosted_tools().iter().map(|t| t.definition()));
            let options = RunOptions {
                assistant_id: agent.id().to_string(),
                instructions: agent.instructions().map(str::to_string),
                tools: Some(tools),
            };

            let mut run = with_cancellation(
                &cancel,
                channel.service.create_run(&channel.thread_id, &options),
            )
            .await?;
            debug!(thread_id = %channel.thread_id, run_id = %run.id, agent_id = %agent.id(), "started run");

            loop {
                run = channel.poll_run(run, &cancel).await?;
                ensure_not_terminated(&run)?;

                let steps = with_cancellation(
                    &cancel,
                    channel.service.list_run_steps(&channel.thread_id, &run.id),
                )
                .await?;

                if run.status == RunStatus::RequiresAction {
                    let mut calls: Vec<ToolCallRequest> =
                        steps.iter().flat_map(RunStep::pending_function_calls).collect();
                    if calls.is_empty() {
                        // Step listing can lag behind the run status.
                        calls = run.required_tool_calls();
                    }
                    if !calls.is_empty() {
                        debug!(run_id = %run.id, calls = calls.len(), "executing tool calls");
                        let outputs = invoker.execute_batch(calls, &cancel).await?;
                        run = with_cancellation(
                            &cancel,
                            channel.service.submit_tool_outputs(&channel.thread_id, &run.id, &outputs),
                        )
                        .await?;
                    }
                }

                let mut created: Vec<&RunStep> = steps
                    .iter()
                    .filter(|step| step.created_message_id().is_some())
                    .collect();
                created.sort_by_key(|step| step.completed_at);

                for step in created {
                    let Some(message_id) = step.created_message_id() else {
                        continue;
                    };
                    if channel.is_processed(message_id).await {
                        continue;
                    }
                    let Some(message) = channel.fetch_message(message_id, &cancel).await? else {
                        continue;
                    };
                    channel.mark_processed(message_id).await;
                    for chat in to_chat_messages(&message, Some(agent.display_name())) {
                        yield chat;
                    }
                }

                if run.status == RunStatus::Completed {
                    debug!(run_id = %run.id, "run completed");
                    break;
                }
            }
        };

        Box::pin(stream)
    }

    /// Replay every message on the thread, newest first.
    ///
    /// Each call walks the thread from the start; a stream cannot be resumed.
    pub fn get_history(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, Result<ChatMessage>> {
        let channel = Arc::clone(self);

        let stream = async_stream::try_stream! {
            let mut after: Option<String> = None;
            loop {
                let page = with_cancellation(
                    &cancel,
                    channel.service.list_messages(&channel.thread_id, after.as_deref()),
                )
                .await?;

                for message in &page.data {
                    let author = match (message.role, &message.assistant_id) {
                        (Role::Assistant, Some(assistant_id)) => {
                            Some(channel.author_name(assistant_id, &cancel).await?)
                        }
                        _ => None,
                    };
                    for chat in to_chat_messages(message, author.as_deref()) {
                        yield chat;
                    }
                }

                let cursor = page
                    .last_id
                    .clone()
                    .or_else(|| page.data.last().map(|m| m.id.clone()));
                match cursor {
                    Some(cursor) if page.has_more => after = Some(cursor),
                    _ => break,
                }
            }
        };

        Box::pin(stream)
    }

    /// Delete the remote thread.
    pub async fn delete(&self, cancel: &CancellationToken) -> Result<()> {
        with_cancellation(cancel, self.service.delete_thread(&self.thread_id)).await?;
        debug!(thread_id = %self.thread_id, "deleted channel thread");
        Ok(())
    }

    /// Wait, then re-fetch, until the run leaves the pending states.
    ///
    /// Transient read failures are retried on the next interval; they say
    /// nothing about the run itself.
    async fn poll_run(&self, mut run: Run, cancel: &CancellationToken) -> Result<Run> {
        let mut count = 0;
        loop {
            sleep_or_cancel(self.polling.interval_for(count), cancel).await?;
            count += 1;

            match with_cancellation(cancel, self.service.retrieve_run(&self.thread_id, &run.id))
                .await
            {
                Ok(latest) => {
                    trace!(run_id = %latest.id, status = %latest.status, poll = count, "polled run");
                    run = latest;
                }
                Err(err) if err.is_retryable() => {
                    warn!(run_id = %run.id, poll = count, error = %err, "run poll failed, retrying");
                    continue;
                }
                Err(err) => return Err(err),
            }

            if !run.status.is_pending() {
                return Ok(run);
            }
        }
    }

    /// Fetch a message a run step points at.
    ///
    /// The step can be visible before the message is; not-found is retried
    /// after the synchronization delay. `None` once attempts run out.
    async fn fetch_message(
        &self,
        message_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ThreadMessage>> {
        let policy = RetryPolicy::fixed(
            self.polling.message_fetch_attempts,
            self.polling.message_synchronization_delay,
        );
        let fetched = policy
            .execute_when(cancel, ColloquyError::is_not_found, || {
                with_cancellation(
                    cancel,
                    self.service.retrieve_message(&self.thread_id, message_id),
                )
            })
            .await;

        match fetched {
            Ok(message) => Ok(Some(message)),
            Err(err) if err.is_not_found() => {
                warn!(
                    thread_id = %self.thread_id,
                    message_id,
                    attempts = policy.max_attempts,
                    "message never became visible; skipping"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn tool_invoker(&self, agent: &Agent) -> Result<Arc<ToolInvoker>> {
        let mut state = self.state.lock().await;
        if let Some(invoker) = state.invokers.get(agent.id()) {
            return Ok(Arc::clone(invoker));
        }
        let invoker = Arc::new(ToolInvoker::for_agent(agent).await?);
        state
            .invokers
            .insert(agent.id().to_string(), Arc::clone(&invoker));
        Ok(invoker)
    }

    async fn author_name(&self, assistant_id: &str, cancel: &CancellationToken) -> Result<String> {
        if let Some(name) = self.state.lock().await.authors.get(assistant_id) {
            return Ok(name.clone());
        }
        let info = with_cancellation(cancel, self.service.retrieve_assistant(assistant_id)).await?;
        let name = info.name.unwrap_or_else(|| assistant_id.to_string());
        self.state
            .lock()
            .await
            .authors
            .insert(assistant_id.to_string(), name.clone());
        Ok(name)
    }

    async fn is_processed(&self, message_id: &str) -> bool {
        self.state.lock().await.processed.contains(message_id)
    }

    async fn mark_processed(&self, message_id: &str) {
        self.state
            .lock()
            .await
            .processed
            .insert(message_id.to_string());
    }
}

impl std::fmt::Debug for RunChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunChannel")
            .field("thread_id", &self.thread_id)
            .field("polling", &self.polling)
            .finish()
    }
}

fn ensure_not_terminated(run: &Run) -> Result<()> {
    if run.status.is_terminal_failure() {
        return Err(ColloquyError::RunTerminated {
            run_id: run.id.clone(),
            status: run.status,
            detail: run.error_detail(),
        });
    }
    Ok(())
}
