//! `ToneService`: the three generation operations exposed to callers.
//!
//! Every call runs on behalf of an already authenticated owner. The
//! service loads context, resolves tones, drives the generator, and (for
//! generate-and-append) records the exchange. Nothing here authenticates.

use crate::append::{Exchange, append_exchange};
use crate::context::{ContextAssembler, ContextSources};
use crate::orchestrator::Orchestrator;
use crate::resolver::ToneResolver;
use crate::selection::{SelectionInputs, select_tones};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use toneshift_config::AppConfig;
use toneshift_core::generation::Generator;
use toneshift_core::{Error, Result, Store, UserStore};
use tracing::{debug, info};

/// Orchestration knobs, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub model: String,
    pub timeout: Duration,
    pub history_window: usize,
    pub max_context_chars: usize,
    pub fallback_tones: Vec<String>,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.generation.model.clone(),
            timeout: Duration::from_secs(config.generation.timeout_secs),
            history_window: config.orchestration.history_window,
            max_context_chars: config.orchestration.max_context_chars,
            fallback_tones: config.orchestration.fallback_tones.clone(),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Tone-shifted generation over a store and a generator.
#[derive(Clone)]
pub struct ToneService {
    store: Arc<dyn Store>,
    generator: Arc<dyn Generator>,
    settings: Arc<ServiceSettings>,
}

/// Reject blank text but hand back the text untouched.
fn require_text<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{what} is required")));
    }
    Ok(value)
}

/// Identifiers (tone labels, ids) are compared and echoed trimmed.
fn require_label<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    require_text(value, what).map(str::trim)
}

impl ToneService {
    pub fn new(store: Arc<dyn Store>, generator: Arc<dyn Generator>, settings: ServiceSettings) -> Self {
        Self {
            store,
            generator,
            settings: Arc::new(settings),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(&*self.generator, &self.settings.model, self.settings.timeout)
    }

    fn assembler(&self) -> ContextAssembler {
        ContextAssembler::new(self.settings.history_window, self.settings.max_context_chars)
    }

    async fn load_context(&self, owner_id: &str, conversation_id: Option<&str>) -> Result<(ContextSources, String)> {
        let conversation_id = conversation_id.filter(|id| !id.is_empty());
        let sources = ContextSources::load(&*self.store, owner_id, conversation_id).await?;
        let context = self.assembler().assemble_sources(&sources);
        Ok((sources, context))
    }

    /// Generate one reply to `message` in `tone`.
    pub async fn generate_tone_response(
        &self,
        owner_id: &str,
        message: &str,
        tone: &str,
        conversation_id: Option<&str>,
    ) -> Result<String> {
        let message = require_text(message, "Message")?;
        let tone = require_label(tone, "Tone")?;

        let (_, context) = self.load_context(owner_id, conversation_id).await?;
        let descriptor = ToneResolver::new(&*self.store, owner_id).resolve(tone).await;

        Ok(self.orchestrator().generate_one(message, &descriptor, &context).await?)
    }

    /// Generate one reply per tone, keyed by the (trimmed) tone labels.
    ///
    /// `tones: None` and blank labels are invalid input. An empty list is
    /// filled from the relationship's preferred tones, the user's defaults,
    /// then the configured fallback list.
    pub async fn generate_multiple_tone_responses(
        &self,
        owner_id: &str,
        message: &str,
        tones: Option<&[String]>,
        conversation_id: Option<&str>,
    ) -> Result<BTreeMap<String, String>> {
        let message = require_text(message, "Message")?;
        let Some(requested) = tones else {
            return Err(Error::InvalidInput("Message and tones are required".into()));
        };
        let requested = requested
            .iter()
            .map(|tone| require_label(tone, "Tone").map(str::to_string))
            .collect::<Result<Vec<_>>>()?;

        let (sources, context) = self.load_context(owner_id, conversation_id).await?;

        let relationship_has_tones = sources
            .relationship
            .as_ref()
            .is_some_and(|r| !r.preferred_tones.is_empty());
        let user = if requested.is_empty() && !relationship_has_tones {
            self.store.find_user_by_id(owner_id).await?
        } else {
            None
        };

        let selection = select_tones(&SelectionInputs {
            requested: &requested,
            relationship: sources.relationship.as_ref(),
            user: user.as_ref(),
            fallback: &self.settings.fallback_tones,
        })
        .ok_or_else(|| Error::InvalidInput("At least one tone is required".into()))?;
        debug!(source = ?selection.source, tones = ?selection.tones, "Tones selected");

        let resolver = ToneResolver::new(&*self.store, owner_id);
        let replies = self
            .orchestrator()
            .generate_many(&resolver, message, &selection.tones, &context)
            .await?;

        info!(count = replies.len(), "Multi-tone responses generated");
        Ok(replies)
    }

    /// Generate a reply and append the exchange to the conversation.
    ///
    /// The user message is stored verbatim; the AI message carries the
    /// trimmed tone label as supplied, not the resolved tone name.
    pub async fn generate_and_append_response(
        &self,
        owner_id: &str,
        message: &str,
        tone: &str,
        conversation_id: &str,
    ) -> Result<Exchange> {
        let message = require_text(message, "Message")?;
        let tone = require_label(tone, "Tone")?;
        let conversation_id = require_label(conversation_id, "Conversation id")?;

        let (sources, context) = self.load_context(owner_id, Some(conversation_id)).await?;
        if sources.conversation.is_none() {
            return Err(Error::not_found("Conversation", conversation_id));
        }

        let descriptor = ToneResolver::new(&*self.store, owner_id).resolve(tone).await;
        let reply = self.orchestrator().generate_one(message, &descriptor, &context).await?;

        append_exchange(&*self.store, owner_id, conversation_id, message, &reply, tone).await
    }
}
