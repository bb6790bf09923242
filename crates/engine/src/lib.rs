//! The ToneShift orchestration core.
//!
//! A generation request flows through four steps:
//!
//! 1. **Assemble context** from the conversation, its relationship
//!    profile and the last few messages ([`context`])
//! 2. **Resolve** each tone label to a stored descriptor, or fall back to
//!    the raw label ([`resolver`])
//! 3. **Build the prompt** and call the generator, once per tone and
//!    concurrently ([`prompt`], [`orchestrator`])
//! 4. **Append** the exchange to the conversation when asked to ([`append`])
//!
//! [`ToneService`] wires these together behind the three exposed
//! operations. The account, catalog, conversation and relationship
//! modules hold the owner-scoped CRUD the gateway serves.

pub mod accounts;
pub mod append;
pub mod catalog;
pub mod context;
pub mod conversations;
pub mod orchestrator;
pub mod prompt;
pub mod relationships;
pub mod resolver;
pub mod selection;
pub mod service;

#[cfg(test)]
mod test_helpers;

pub use accounts::{Credentials, ProfileUpdate, Registration};
pub use append::{Exchange, append_exchange};
pub use catalog::{NewTone, ToneUpdate, seed_system_tones, system_tones};
pub use context::{ContextAssembler, ContextSources};
pub use conversations::{ConversationUpdate, NewConversation, NewMessage};
pub use orchestrator::Orchestrator;
pub use prompt::build_prompt;
pub use relationships::{NewRelationship, RelationshipUpdate};
pub use resolver::{LookupStrategy, ToneResolver};
pub use selection::{SelectionInputs, ToneSelection, ToneSource, select_tones};
pub use service::{ServiceSettings, ToneService};
