//! Multi-tone orchestration.
//!
//! For each requested tone: resolve it, build its prompt, call the
//! generator. Tones run concurrently and share nothing but immutable
//! inputs. The batch is all-or-nothing: the first failure cancels the
//! calls still in flight and fails the whole request.

use crate::prompt::build_prompt;
use crate::resolver::ToneResolver;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::time::Duration;
use toneshift_core::error::GenerationError;
use toneshift_core::generation::{GenerationRequest, Generator};
use toneshift_core::store::ToneStore;
use toneshift_core::ToneDescriptor;
use tracing::{debug, warn};

/// Drives the generator for one or many tones.
pub struct Orchestrator<'a> {
    generator: &'a dyn Generator,
    model: &'a str,
    timeout: Duration,
}

impl<'a> Orchestrator<'a> {
    pub fn new(generator: &'a dyn Generator, model: &'a str, timeout: Duration) -> Self {
        Self {
            generator,
            model,
            timeout,
        }
    }

    /// Generate one reply for an already resolved tone.
    pub async fn generate_one(
        &self,
        message: &str,
        tone: &ToneDescriptor,
        context: &str,
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(message, tone, context);
        debug!(tone = %tone.name, prompt_chars = prompt.len(), generator = self.generator.name(), "Generating");

        let request = GenerationRequest::new(self.model, prompt);
        match tokio::time::timeout(self.timeout, self.generator.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }

    /// Resolve and generate for every tone concurrently.
    ///
    /// The result is keyed by each tone label exactly as supplied.
    /// Repeated labels are generated once.
    pub async fn generate_many<S>(
        &self,
        resolver: &ToneResolver<'_, S>,
        message: &str,
        tones: &[String],
        context: &str,
    ) -> Result<BTreeMap<String, String>, GenerationError>
    where
        S: ToneStore + ?Sized,
    {
        let labels = dedupe(tones);

        let calls = labels.iter().map(|label| async move {
            let descriptor = resolver.resolve(label).await;
            let reply = self
                .generate_one(message, &descriptor, context)
                .await
                .inspect_err(|e| warn!(tone = %label, error = %e, "Tone generation failed"))?;
            Ok::<_, GenerationError>((label.to_string(), reply))
        });

        let replies = try_join_all(calls).await?;
        Ok(replies.into_iter().collect())
    }
}

/// Trim labels and drop blank or repeated ones, keeping first occurrences
/// in order. Stored preference lists reach here unvalidated.
fn dedupe(tones: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    tones
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && seen.insert(*t))
        .collect()
}
