//! OpenAI Assistants v2 run service over HTTP.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::agent::AgentDefinition;
use crate::config::ColloquyConfig;
use crate::error::{ColloquyError, Result};

use super::http::{assistants_headers, build_client, status_to_error};
use super::types::*;
use super::{RunService, ServiceBinding};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const PAGE_LIMIT: &str = "100";

/// [`RunService`] backed by the OpenAI (or Azure OpenAI) Assistants API.
pub struct OpenAiAssistantsService {
    client: reqwest::Client,
    base_url: String,
    api_version: Option<String>,
    headers: HeaderMap,
    binding: ServiceBinding,
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
struct Deleted {
    #[serde(default)]
    deleted: bool,
}

#[derive(Deserialize)]
struct StepPage {
    data: Vec<RunStep>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

impl OpenAiAssistantsService {
    pub fn new(config: &ColloquyConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        let empty = Default::default();
        let extra_headers = config
            .transport
            .as_ref()
            .map(|t| &t.headers)
            .unwrap_or(&empty);
        let headers = assistants_headers(&api_key, config.organization.as_deref(), extra_headers)?;

        let base_url = config
            .transport
            .as_ref()
            .and_then(|t| t.base_address.clone())
            .or_else(|| config.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: build_client(config.request_timeout)?,
            base_url,
            api_version: config.api_version.clone(),
            headers,
            binding: config.binding(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let mut request = request.headers(self.headers.clone());
        if let Some(version) = &self.api_version {
            request = request.query(&[("api-version", version.as_str())]);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let request_id = resp
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status.as_u16(), &body, request_id));
        }

        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_delete(&self, path: &str) -> Result<()> {
        let deleted: Deleted = self.send(self.delete(path)).await?;
        if !deleted.deleted {
            return Err(ColloquyError::api(200, format!("{path} was not deleted")));
        }
        Ok(())
    }
}

#[async_trait]
impl RunService for OpenAiAssistantsService {
    fn binding(&self) -> &ServiceBinding {
        &self.binding
    }

    async fn create_thread(&self) -> Result<String> {
        let created: Created = self
            .send(self.post("threads").json(&serde_json::json!({})))
            .await?;
        debug!(thread_id = %created.id, "created thread");
        Ok(created.id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.send_delete(&format!("threads/{thread_id}")).await
    }

    async fn create_message(&self, thread_id: &str, message: &NewMessage) -> Result<()> {
        let _: Created = self
            .send(self.post(&format!("threads/{thread_id}/messages")).json(message))
            .await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, options: &RunOptions) -> Result<Run> {
        let run: Run = self
            .send(self.post(&format!("threads/{thread_id}/runs")).json(options))
            .await?;
        debug!(thread_id, run_id = %run.id, status = %run.status, "created run");
        Ok(run)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let run: Run = self
            .send(self.get(&format!("threads/{thread_id}/runs/{run_id}")))
            .await?;
        trace!(thread_id, run_id, status = %run.status, "retrieved run");
        Ok(run)
    }

    async fn list_run_steps(&self, thread_id: &str, run_id: &str) -> Result<Vec<RunStep>> {
        let path = format!("threads/{thread_id}/runs/{run_id}/steps");
        let mut steps = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .get(&path)
                .query(&[("order", "asc"), ("limit", PAGE_LIMIT)]);
            if let Some(cursor) = &after {
                request = request.query(&[("after", cursor.as_str())]);
            }
            let page: StepPage = self.send(request).await?;
            steps.extend(page.data);
            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }

        Ok(steps)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run> {
        let body = serde_json::json!({ "tool_outputs": outputs });
        self.send(
            self.post(&format!(
                "threads/{thread_id}/runs/{run_id}/submit_tool_outputs"
            ))
            .json(&body),
        )
        .await
    }

    async fn retrieve_message(&self, thread_id: &str, message_id: &str) -> Result<ThreadMessage> {
        self.send(self.get(&format!("threads/{thread_id}/messages/{message_id}")))
            .await
    }

    async fn list_messages(&self, thread_id: &str, after: Option<&str>) -> Result<MessagePage> {
        let mut request = self
            .get(&format!("threads/{thread_id}/messages"))
            .query(&[("order", "desc"), ("limit", PAGE_LIMIT)]);
        if let Some(cursor) = after {
            request = request.query(&[("after", cursor)]);
        }
        self.send(request).await
    }

    async fn create_assistant(
        &self,
        definition: &AgentDefinition,
        tools: &[ToolDefinition],
    ) -> Result<AssistantInfo> {
        let mut body = serde_json::json!({
            "model": definition.model,
            "tools": tools,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(name) = &definition.name {
                obj.insert("name".into(), name.clone().into());
            }
            if let Some(description) = &definition.description {
                obj.insert("description".into(), description.clone().into());
            }
            if let Some(instructions) = &definition.instructions {
                obj.insert("instructions".into(), instructions.clone().into());
            }
            if !definition.metadata.is_empty() {
                obj.insert("metadata".into(), serde_json::json!(definition.metadata));
            }
        }

        let info: AssistantInfo = self.send(self.post("assistants").json(&body)).await?;
        debug!(assistant_id = %info.id, "created assistant");
        Ok(info)
    }

    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<AssistantInfo> {
        self.send(self.get(&format!("assistants/{assistant_id}")))
            .await
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<()> {
        self.send_delete(&format!("assistants/{assistant_id}")).await
    }
}
