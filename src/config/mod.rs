//! Configuration system (layered: code > env > TOML file).

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::RunPollingOptions;
use crate::error::ColloquyError;
use crate::service::{ServiceBinding, TransportBinding};

/// Where the API key comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AuthValue {
    /// Plain API key.
    ApiKey(String),
    /// Environment variable name to read at runtime.
    EnvVar(String),
}

impl AuthValue {
    /// Resolve to the actual secret string.
    pub fn resolve(&self) -> Result<String, ColloquyError> {
        match self {
            Self::ApiKey(k) => Ok(k.clone()),
            Self::EnvVar(var) => std::env::var(var).map_err(|_| {
                ColloquyError::Authentication(format!("Environment variable {var} not set"))
            }),
        }
    }
}

/// Custom HTTP transport settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Overrides the endpoint as the request base address (e.g. a proxy).
    #[serde(default)]
    pub base_address: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Settings for the remote run service and the polling loop.
#[derive(Clone)]
pub struct ColloquyConfig {
    pub auth: Option<AuthValue>,
    pub endpoint: Option<String>,
    pub api_version: Option<String>,
    pub organization: Option<String>,
    pub transport: Option<TransportConfig>,
    pub polling: RunPollingOptions,
    pub request_timeout: Duration,
}

impl fmt::Debug for ColloquyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColloquyConfig")
            .field("auth", &self.auth.as_ref().map(|_| ".."))
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("organization", &self.organization)
            .field("transport", &self.transport)
            .field("polling", &self.polling)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ColloquyConfig {
    fn default() -> Self {
        Self {
            auth: None,
            endpoint: None,
            api_version: None,
            organization: None,
            transport: None,
            polling: RunPollingOptions::default(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// On-disk shape; durations are milliseconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_key: Option<String>,
    api_key_env: Option<String>,
    endpoint: Option<String>,
    api_version: Option<String>,
    organization: Option<String>,
    transport: Option<TransportConfig>,
    request_timeout_secs: Option<u64>,
    polling: FilePolling,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilePolling {
    backoff_ms: Option<u64>,
    interval_ms: Option<u64>,
    backoff_threshold: Option<u32>,
    message_sync_delay_ms: Option<u64>,
    message_fetch_attempts: Option<u32>,
}

impl ColloquyConfig {
    /// Config with an explicit API key and defaults elsewhere.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            auth: Some(AuthValue::ApiKey(api_key.into())),
            ..Self::default()
        }
    }

    /// Load from environment variables (`OPENAI_API_KEY`, `OPENAI_BASE_URL`, ...).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::default();

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.auth = Some(AuthValue::ApiKey(key));
        }
        config.endpoint = std::env::var("OPENAI_BASE_URL").ok();
        config.api_version = std::env::var("OPENAI_API_VERSION").ok();
        config.organization = std::env::var("OPENAI_ORG_ID").ok();

        let millis = |var: &str| {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
        };
        if let Some(interval) = millis("COLLOQUY_POLL_INTERVAL_MS") {
            config.polling.run_polling_interval = interval;
        }
        if let Some(backoff) = millis("COLLOQUY_POLL_BACKOFF_MS") {
            config.polling.run_polling_backoff = backoff;
        }
        if let Some(delay) = millis("COLLOQUY_MESSAGE_SYNC_DELAY_MS") {
            config.polling.message_synchronization_delay = delay;
        }

        config
    }

    /// Parse settings from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ColloquyError> {
        let file: FileConfig = toml::from_str(raw)
            .map_err(|e| ColloquyError::Configuration(format!("invalid config: {e}")))?;

        let auth = match (file.api_key, file.api_key_env) {
            (Some(key), _) => Some(AuthValue::ApiKey(key)),
            (None, Some(var)) => Some(AuthValue::EnvVar(var)),
            (None, None) => None,
        };

        let defaults = RunPollingOptions::default();
        let polling = RunPollingOptions {
            run_polling_backoff: file
                .polling
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.run_polling_backoff),
            run_polling_interval: file
                .polling
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.run_polling_interval),
            run_polling_backoff_threshold: file
                .polling
                .backoff_threshold
                .unwrap_or(defaults.run_polling_backoff_threshold),
            message_synchronization_delay: file
                .polling
                .message_sync_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.message_synchronization_delay),
            message_fetch_attempts: file
                .polling
                .message_fetch_attempts
                .unwrap_or(defaults.message_fetch_attempts),
        };

        Ok(Self {
            auth,
            endpoint: file.endpoint,
            api_version: file.api_version,
            organization: file.organization,
            transport: file.transport,
            polling,
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(120)),
        })
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ColloquyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ColloquyError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// Add a custom header, creating the transport config if needed.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.transport
            .get_or_insert_with(TransportConfig::default)
            .headers
            .insert(name.into(), value.into());
        self
    }

    pub fn with_polling(mut self, polling: RunPollingOptions) -> Self {
        self.polling = polling;
        self
    }

    /// Resolve the API key.
    pub fn api_key(&self) -> Result<String, ColloquyError> {
        self.auth
            .as_ref()
            .ok_or_else(|| ColloquyError::Configuration("no API key configured".into()))?
            .resolve()
    }

    /// Endpoint/transport identity for channel keying.
    pub fn binding(&self) -> ServiceBinding {
        ServiceBinding {
            endpoint: self.endpoint.clone(),
            api_version: self.api_version.clone(),
            transport: self.transport.as_ref().map(|t| TransportBinding {
                base_address: t.base_address.clone(),
                headers: t.headers.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_polling_and_transport() {
        let config = ColloquyConfig::from_toml_str(
            r#"
            api_key = "sk-file"
            endpoint = "https://example.openai.azure.com/openai"
            api_version = "2024-05-01-preview"

            [transport]
            base_address = "https://proxy.internal"
            headers = { "x-tenant" = "blue" }

            [polling]
            interval_ms = 2000
            backoff_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.api_key().unwrap(), "sk-file");
        assert_eq!(config.polling.run_polling_interval, Duration::from_secs(2));
        assert_eq!(config.polling.run_polling_backoff_threshold, 3);
        assert_eq!(
            config.polling.run_polling_backoff,
            RunPollingOptions::default().run_polling_backoff
        );

        let binding = config.binding();
        assert_eq!(binding.api_version.as_deref(), Some("2024-05-01-preview"));
        let transport = binding.transport.unwrap();
        assert_eq!(transport.base_address.as_deref(), Some("https://proxy.internal"));
        assert_eq!(transport.headers["x-tenant"], "blue");
    }

    #[test]
    fn env_var_auth_reports_missing_variable() {
        let config = ColloquyConfig::from_toml_str(
            r#"api_key_env = "COLLOQUY_TEST_KEY_THAT_IS_NOT_SET""#,
        )
        .unwrap();
        assert!(matches!(
            config.api_key(),
            Err(ColloquyError::Authentication(_))
        ));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let config = ColloquyConfig::default();
        assert!(matches!(config.api_key(), Err(ColloquyError::Configuration(_))));
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let config = ColloquyConfig::new("sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}
