//! Shared test helpers for engine tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use toneshift_core::error::GenerationError;
use toneshift_core::generation::{GenerationRequest, Generator};
use toneshift_core::{Store, Tone, ToneParameters};
use toneshift_store::InMemoryStore;

/// A generator that answers `"<tone>:<prompt-length>"`.
///
/// The tone is read back out of the prompt's closing instruction, so a
/// response can only ever carry the tone its own prompt asked for.
pub struct EchoGenerator {
    fail_on: Vec<String>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl EchoGenerator {
    pub fn new() -> Self {
        Self {
            fail_on: Vec::new(),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request whose prompt asks for `tone`.
    pub fn failing_on(mut self, tone: &str) -> Self {
        self.fail_on.push(tone.to_string());
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

/// Extract the tone name from a prompt built by `prompt::build_prompt`.
pub fn tone_of(prompt: &str) -> &str {
    let start = prompt
        .find("Please generate a response in a ")
        .map(|i| i + "Please generate a response in a ".len())
        .unwrap();
    let end = prompt[start..].find(" tone.").unwrap();
    &prompt[start..start + end]
}

#[async_trait::async_trait]
impl Generator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let tone = tone_of(&request.prompt);
        if self.fail_on.iter().any(|t| t == tone) {
            return Err(GenerationError::ApiError {
                status_code: 500,
                message: format!("cannot do {tone}"),
            });
        }
        Ok(format!("{tone}:{}", request.prompt.len()))
    }
}

pub fn params(pairs: &[(&str, &str)]) -> ToneParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// An in-memory store with one system tone, "Professional".
pub async fn seeded_store() -> Arc<dyn Store> {
    let store = InMemoryStore::new();
    toneshift_core::ToneStore::insert_tone(
        &store,
        &Tone::system(
            "Professional",
            "Formal and business-like",
            params(&[("formality", "high"), ("emotion", "neutral")]),
        ),
    )
    .await
    .unwrap();
    Arc::new(store)
}
