//! Ollama generation provider (`/api/generate`, non-streaming).

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use rights_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: GenerateOptions<'a>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

impl<'a> From<&'a LlmRequest> for GenerateBody<'a> {
    fn from(request: &'a LlmRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: &request.stop,
            },
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    model: String,
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

impl From<GenerateReply> for LlmResponse {
    fn from(reply: GenerateReply) -> Self {
        LlmResponse {
            content: reply.response,
            model: reply.model,
            usage: LlmUsage::new(reply.prompt_eval_count, reply.eval_count),
        }
    }
}

fn generation_failed(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Llm(format!("{}: {}", what, e))
}

/// Client for a local or remote Ollama server.
pub struct OllamaClient {
    generate_url: String,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Client with a per-request timeout. Falls back to reqwest defaults if
    /// the builder rejects the configuration.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        let base_url = base_url.into();
        Self {
            generate_url: format!("{}/api/generate", base_url.trim_end_matches('/')),
            http,
        }
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model, prompt_chars = request.prompt.len()))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let response = self
            .http
            .post(&self.generate_url)
            .json(&GenerateBody::from(request))
            .send()
            .await
            .map_err(|e| generation_failed("Ollama unreachable", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(generation_failed(
                &format!("Ollama returned {}", status),
                body.trim(),
            ));
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| generation_failed("Malformed Ollama reply", e))?;

        if reply.done_reason.as_deref() == Some("length") {
            warn!("Completion hit the token limit and may be cut short");
        }
        debug!(chars = reply.response.len(), tokens = reply.eval_count, "Completion received");

        Ok(reply.into())
    }
}
