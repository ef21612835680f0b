/// Model client: the single point of entry for all on-device model calls.
///
/// ARCHITECTURAL RULE: No other module may talk to the model server directly.
/// Generation goes through the `ModelRuntime` trait so tests can script replies.
///
/// The local engine runs one conversation at a time; `HttpModelClient` serialises
/// prompts behind a gate. Retries are the orchestrator's job, not this module's.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::errors::GenerationError;

// ────────────────────────────────────────────────────────────────────────────
// Runtime contract
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityState {
    Available,
    Downloadable,
    Downloading,
    Unavailable,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Availability {
    pub state: AvailabilityState,
}

/// Sampling settings for one session. Each document kind has its own defaults
/// in `generation::generator`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    pub temperature: f32,
    pub top_k: u32,
}

/// Opaque handle to a live model session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReply {
    #[serde(default)]
    pub text: String,
    #[serde(default = "unknown_finish_reason")]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Option<Value>,
}

fn unknown_finish_reason() -> String {
    "unknown".to_string()
}

/// The model runtime trait. Carried in `AppState` as `Arc<dyn ModelRuntime>`.
///
/// Every session created must be destroyed by the caller, on success and on failure.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn availability(&self) -> Result<Availability, GenerationError>;

    async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<SessionHandle, GenerationError>;

    async fn prompt(
        &self,
        session: &SessionHandle,
        text: &str,
    ) -> Result<ModelReply, GenerationError>;

    async fn destroy(&self, session: SessionHandle) -> Result<(), GenerationError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PromptRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    session_id: String,
}

/// Talks to the local model server over JSON/HTTP.
pub struct HttpModelClient {
    client: Client,
    endpoint: String,
    gate: Mutex<()>,
}

impl HttpModelClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build model HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            gate: Mutex::new(()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

/// Transport failures (connect, timeout) are worth retrying; anything else
/// coming out of reqwest means the request itself was bad.
fn map_send_error(e: reqwest::Error) -> GenerationError {
    if e.is_connect() || e.is_timeout() {
        GenerationError::transient(format!("model server unreachable: {e}"))
    } else {
        GenerationError::Provider {
            detail: format!("model request failed: {e}"),
        }
    }
}

fn classify_status(status: StatusCode, body: String) -> GenerationError {
    let detail = format!("model server returned {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        GenerationError::ProviderTransient { detail }
    } else {
        GenerationError::Provider { detail }
    }
}

async fn check_status(response: Response) -> Result<Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Model server returned {}: {}", status, body);
    Err(classify_status(status, body))
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GenerationError> {
    response.json::<T>().await.map_err(|e| GenerationError::Provider {
        detail: format!("unreadable model server payload: {e}"),
    })
}

#[async_trait]
impl ModelRuntime for HttpModelClient {
    async fn availability(&self) -> Result<Availability, GenerationError> {
        let response = self
            .client
            .get(self.url("/availability"))
            .send()
            .await
            .map_err(map_send_error)?;
        read_json(check_status(response).await?).await
    }

    async fn create_session(
        &self,
        options: SessionOptions,
    ) -> Result<SessionHandle, GenerationError> {
        let response = self
            .client
            .post(self.url("/sessions"))
            .json(&options)
            .send()
            .await
            .map_err(map_send_error)?;
        let created: CreateSessionResponse = read_json(check_status(response).await?).await?;
        debug!(
            "Model session {} created (temperature {}, top_k {})",
            created.session_id, options.temperature, options.top_k
        );
        Ok(SessionHandle {
            id: created.session_id,
        })
    }

    async fn prompt(
        &self,
        session: &SessionHandle,
        text: &str,
    ) -> Result<ModelReply, GenerationError> {
        let _turn = self.gate.lock().await;
        debug!(
            "Prompting session {} with {} chars",
            session.id,
            text.chars().count()
        );
        let response = self
            .client
            .post(self.url(&format!("/sessions/{}/prompt", session.id)))
            .json(&PromptRequest { text })
            .send()
            .await
            .map_err(map_send_error)?;
        read_json(check_status(response).await?).await
    }

    async fn destroy(&self, session: SessionHandle) -> Result<(), GenerationError> {
        let response = self
            .client
            .delete(self.url(&format!("/sessions/{}", session.id)))
            .send()
            .await
            .map_err(map_send_error)?;
        check_status(response).await?;
        debug!("Model session {} destroyed", session.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::generation::generator::{COVER_LETTER_SESSION, RESUME_SESSION};

    #[test]
    fn test_rate_limit_and_server_errors_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert_eq!(
                classify_status(status, String::new()).kind(),
                ErrorKind::ProviderTransient
            );
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND] {
            assert_eq!(
                classify_status(status, "nope".to_string()).kind(),
                ErrorKind::Provider
            );
        }
    }

    #[test]
    fn test_reply_defaults_missing_fields() {
        let reply: ModelReply = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(reply.text, "hi");
        assert_eq!(reply.finish_reason, "unknown");
        assert!(reply.usage.is_none());

        let reply: ModelReply =
            serde_json::from_str(r#"{"text": "x", "finishReason": "stop", "usage": {"tokens": 5}}"#)
                .unwrap();
        assert_eq!(reply.finish_reason, "stop");
        assert!(reply.usage.is_some());
    }

    #[test]
    fn test_unknown_availability_state() {
        let a: Availability = serde_json::from_str(r#"{"state": "after-download"}"#).unwrap();
        assert_eq!(a.state, AvailabilityState::Unknown);
        let a: Availability = serde_json::from_str(r#"{"state": "available"}"#).unwrap();
        assert_eq!(a.state, AvailabilityState::Available);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = HttpModelClient::new("http://localhost:9000/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/sessions"), "http://localhost:9000/sessions");
    }

    #[test]
    fn test_session_options_wire_format() {
        assert_eq!(
            serde_json::to_value(RESUME_SESSION).unwrap(),
            serde_json::json!({"temperature": 0.25, "topK": 32})
        );
        assert_eq!(
            serde_json::to_value(COVER_LETTER_SESSION).unwrap()["topK"],
            32
        );
    }
}
