//! Language-model fallback for time expressions no local stage understands.
//!
//! The fallback is a narrow collaborator: given the user's text, their
//! timezone id and the reference time, it replies with a single timestamp
//! string or the literal [`UNPARSEABLE_SENTINEL`]. The resolver feeds the
//! reply back through the exact-format and free-form stages, so a model
//! that answers in any format those stages accept works.
//!
//! [`OpenAiCompatibleFallback`] talks to any server exposing an OpenAI-style
//! `/v1/chat/completions` endpoint (Ollama, LM Studio, vLLM, OpenAI itself).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::FallbackConfig;
use crate::error::CollaboratorError;

/// Reply a fallback gives when it cannot determine a time.
pub const UNPARSEABLE_SENTINEL: &str = "UNPARSEABLE";

/// External natural-language time parser consulted as the last stage.
#[async_trait]
pub trait LanguageModelFallback: Send + Sync {
    /// Interpret `text` relative to `reference_time_iso` in `timezone_id`.
    ///
    /// Returns a timestamp string or [`UNPARSEABLE_SENTINEL`].
    async fn parse(
        &self,
        text: &str,
        timezone_id: &str,
        reference_time_iso: &str,
    ) -> Result<String, CollaboratorError>;
}

// ── Request / response wire types ─────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ── Adapter ───────────────────────────────────────────────────

/// Fallback backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatibleFallback {
    config: FallbackConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleFallback {
    /// Create a fallback from configuration.
    ///
    /// The API key is read once from `config.api_key_env`.
    pub fn new(config: FallbackConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "falling back to default HTTP client");
                reqwest::Client::new()
            });
        let api_key = config.api_key();
        Self {
            config,
            api_key,
            client,
        }
    }

    /// Override the API key (e.g. from a credential store).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.api_url.trim_end_matches('/')
        )
    }

    fn build_request_body(
        &self,
        text: &str,
        timezone_id: &str,
        reference_time_iso: &str,
    ) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.config.api_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Current time: {reference_time_iso}\nTimezone: {timezone_id}\nExpression: {text}"
                    ),
                },
            ],
            temperature: 0.0,
            max_tokens: self.config.max_tokens,
            stream: false,
        }
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> CollaboratorError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 | 403 => {
                CollaboratorError::Backend(format!("fallback authentication failed: {message}"))
            }
            429 => CollaboratorError::Unavailable(format!("fallback rate limited: {message}")),
            code if status.is_server_error() => {
                CollaboratorError::Unavailable(format!("fallback HTTP {code}: {message}"))
            }
            code => CollaboratorError::Backend(format!("fallback HTTP {code}: {message}")),
        }
    }
}

fn system_prompt() -> String {
    format!(
        "You convert natural-language time expressions into timestamps. \
Reply with exactly one line: the resolved local time in the given timezone \
formatted as YYYY-MM-DDTHH:MM:SS, with no other text. \
If the expression does not describe a point in time, reply {UNPARSEABLE_SENTINEL}."
    )
}

/// Extract an error message from an OpenAI-style error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl LanguageModelFallback for OpenAiCompatibleFallback {
    async fn parse(
        &self,
        text: &str,
        timezone_id: &str,
        reference_time_iso: &str,
    ) -> Result<String, CollaboratorError> {
        let body = self.build_request_body(text, timezone_id, reference_time_iso);
        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        tracing::debug!(model = %self.config.api_model, timezone_id, "consulting time fallback");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                CollaboratorError::Unavailable(format!("fallback request failed: {e}"))
            } else {
                CollaboratorError::Backend(format!("fallback request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Backend(format!("invalid fallback response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_owned())
            .unwrap_or_default();

        if content.is_empty() {
            return Ok(UNPARSEABLE_SENTINEL.to_owned());
        }
        Ok(content)
    }
}
