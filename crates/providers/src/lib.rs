//! Text-generation backends for ToneShift.
//!
//! All backends implement the `toneshift_core::Generator` trait.

pub mod ollama;

pub use ollama::OllamaGenerator;
