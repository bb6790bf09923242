//! Ollama-style generation backend.
//!
//! Posts `{model, prompt, stream: false}` to `{api_url}/generate` and reads
//! the `response` field of the reply. One request per call; no retries.

use async_trait::async_trait;
use std::time::Duration;
use toneshift_config::GenerationConfig;
use toneshift_core::error::GenerationError;
use toneshift_core::generation::{GenerationRequest, GenerationResponse, Generator};
use tracing::{debug, warn};

/// A generator backed by an Ollama-compatible `/generate` endpoint.
pub struct OllamaGenerator {
    base_url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaGenerator {
    /// Create a generator for `base_url` (e.g. `http://localhost:11434/api`).
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| GenerationError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
            client,
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self, GenerationError> {
        Self::new(&config.api_url, config.timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            GenerationError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/generate", self.base_url);

        debug!(model = %request.model, prompt_chars = request.prompt.len(), "Sending generation request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generation endpoint returned error");
            return Err(GenerationError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        Ok(body.response)
    }

    async fn health_check(&self) -> Result<bool, GenerationError> {
        let url = format!("{}/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        Ok(response.status().is_success())
    }
}
