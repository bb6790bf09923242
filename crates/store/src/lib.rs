//! Storage backends for ToneShift.
//!
//! Every backend implements all of the `toneshift_core` store traits and
//! the umbrella `Store` trait, so the engine and gateway hold a single
//! `Arc<dyn Store>`.

pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
