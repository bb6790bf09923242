//! # ToneShift Core
//!
//! Domain types, traits, and error definitions for the ToneShift
//! tone-shifted messaging backend. This crate has **no framework
//! dependencies**: it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (storage, text generation) is a trait
//! here. Implementations live in their respective crates, so the
//! orchestration logic can be exercised against in-memory stores and
//! mock generators.

pub mod error;
pub mod generation;
pub mod message;
pub mod relationship;
pub mod store;
pub mod tone;
pub mod user;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GenerationError, Result, StoreError};
pub use generation::{GenerationRequest, GenerationResponse, Generator};
pub use message::{Conversation, Message, Sender};
pub use relationship::{Relationship, RelationshipCategory};
pub use store::{ConversationStore, RelationshipStore, Store, ToneStore, UserStore};
pub use tone::{Tone, ToneDescriptor, ToneParameters};
pub use user::{User, UserPreferences};
