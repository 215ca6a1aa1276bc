//! Agent to channel lookup, keyed by remote configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::Agent;
use crate::error::Result;

use super::run_channel::RunChannel;

/// Leading key component for run channels.
pub const CHANNEL_KIND: &str = "run-channel";
/// Stands in for the endpoint when the service uses its default.
pub const DEFAULT_ENDPOINT: &str = "*";

/// Owns the channels of one conversation.
///
/// Agents whose services share an endpoint, API version and transport share
/// a channel (and so a remote thread). Channels live as long as the registry.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<BTreeMap<String, Arc<OnceCell<Arc<RunChannel>>>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered components that decide whether two agents may share a channel.
    pub fn key_for(agent: &Agent) -> Vec<String> {
        let binding = agent.service().binding();
        let mut key = vec![
            CHANNEL_KIND.to_string(),
            binding
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        ];
        if let Some(version) = &binding.api_version {
            key.push(version.clone());
        }
        if let Some(transport) = &binding.transport {
            if let Some(base_address) = &transport.base_address {
                key.push(base_address.clone());
            }
            key.extend(transport.headers.values().cloned());
        }
        key
    }

    /// Stable digest of [`ChannelRegistry::key_for`].
    pub fn channel_key(agent: &Agent) -> String {
        let mut hasher = Sha256::new();
        for component in Self::key_for(agent) {
            hasher.update((component.len() as u64).to_be_bytes());
            hasher.update(component.as_bytes());
        }
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    /// The agent's channel, creating it (and its remote thread) on first use.
    ///
    /// Concurrent callers with the same key wait on a single creation. A failed
    /// creation leaves the slot empty for the next caller.
    pub async fn get_or_create(
        &self,
        agent: &Agent,
        cancel: &CancellationToken,
    ) -> Result<Arc<RunChannel>> {
        let key = Self::channel_key(agent);
        let cell = {
            let mut channels = self.channels.lock().await;
            Arc::clone(channels.entry(key.clone()).or_default())
        };

        let channel = cell
            .get_or_try_init(|| async {
                debug!(channel_key = %key, agent_id = %agent.id(), "creating channel");
                RunChannel::create(Arc::clone(agent.service()), *agent.polling(), cancel)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(channel))
    }

    /// The agent's channel if it already exists.
    pub async fn get(&self, agent: &Agent) -> Option<Arc<RunChannel>> {
        let key = Self::channel_key(agent);
        self.channels
            .lock()
            .await
            .get(&key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Every materialized channel with its key.
    pub async fn channels(&self) -> Vec<(String, Arc<RunChannel>)> {
        self.channels
            .lock()
            .await
            .iter()
            .filter_map(|(key, cell)| cell.get().map(|channel| (key.clone(), Arc::clone(channel))))
            .collect()
    }

    /// Forget every channel, returning the ones that were materialized.
    pub async fn clear(&self) -> Vec<Arc<RunChannel>> {
        std::mem::take(&mut *self.channels.lock().await)
            .into_values()
            .filter_map(|cell| cell.get().cloned())
            .collect()
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry").finish_non_exhaustive()
    }
}
