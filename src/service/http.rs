//! HTTP plumbing shared by remote services: headers and status mapping.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{ColloquyError, ErrorDetails};

/// Build an HTTP client with the timeouts remote calls use.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ColloquyError> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(10)
        .build()?)
}

/// Build headers for a Bearer-token Assistants API.
pub fn assistants_headers(
    api_key: &str,
    organization: Option<&str>,
    extra: &BTreeMap<String, String>,
) -> Result<HeaderMap, ColloquyError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));
    let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| ColloquyError::Configuration("API key is not a valid header value".into()))?;
    headers.insert(AUTHORIZATION, bearer);
    if let Some(org) = organization {
        let value = HeaderValue::from_str(org).map_err(|_| {
            ColloquyError::Configuration("organization is not a valid header value".into())
        })?;
        headers.insert("OpenAI-Organization", value);
    }
    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ColloquyError::Configuration(format!("invalid header name: {name}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ColloquyError::Configuration(format!("invalid value for header {name}")))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    details: ErrorDetails,
}

/// Map a non-success HTTP status and body to an error.
pub fn status_to_error(status: u16, body: &str, request_id: Option<String>) -> ColloquyError {
    match status {
        401 | 403 => return ColloquyError::Authentication(extract_message(body)),
        429 => {
            return ColloquyError::RateLimited {
                retry_after_ms: extract_retry_after(body),
            }
        }
        _ => {}
    }

    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message.unwrap_or_else(|| body.to_string());
            let details = ErrorDetails {
                request_id,
                ..envelope.error.details
            };
            ColloquyError::api_with_details(status, message, details)
        }
        Err(_) => ColloquyError::api(status, body),
    }
}

fn extract_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
