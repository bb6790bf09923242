//! Generator trait: the abstraction over the external text-generation service.
//!
//! A Generator takes one fully built prompt and returns the model's raw
//! text reply. Implementations: Ollama-style `/generate` endpoints, plus
//! mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::GenerationError;

/// One generation request, exactly as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "llama3")
    pub model: String,

    /// The complete prompt text
    pub prompt: String,

    /// Always `false`: replies are returned whole
    #[serde(default)]
    pub stream: bool,
}

impl GenerationRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: false,
        }
    }
}

/// The reply body of the generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub response: String,
}

/// The core Generator trait.
#[async_trait]
pub trait Generator: Send + Sync {
    /// A human-readable name for this generator (e.g., "ollama").
    fn name(&self) -> &str;

    /// Send one prompt and return the reply text. Never retries.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Can we reach the endpoint?
    async fn health_check(&self) -> Result<bool, GenerationError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_is_non_streaming() {
        let req = GenerationRequest::new("llama3", "Say hi");
        assert!(!req.stream);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "llama3");
        assert_eq!(json["prompt"], "Say hi");
        assert_eq!(json["stream"], false);
    }
}
