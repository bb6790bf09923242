//! Prompt construction.
//!
//! Pure string composition: the same message, descriptor and context
//! always produce the same prompt. Size is bounded upstream by the
//! context assembler, not here.

use std::fmt::Write;
use toneshift_core::ToneDescriptor;

const PREAMBLE: &str = "You are a helpful assistant that generates responses in different tones.";

/// Build the model-ready prompt for one tone.
pub fn build_prompt(message: &str, tone: &ToneDescriptor, context: &str) -> String {
    let mut prompt = String::with_capacity(PREAMBLE.len() + message.len() + context.len() + 256);
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\n");

    if !context.is_empty() {
        let _ = write!(prompt, "Context: {context}\n\n");
    }

    if !tone.parameters.is_empty() {
        prompt.push_str("This tone has the following characteristics:\n");
        for (key, value) in &tone.parameters {
            let _ = writeln!(prompt, "- {key}: {value}");
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "Someone said: \"{message}\"\n\n\
         Please generate a response in a {name} tone. \
         The response should be natural, appropriate, and directly usable in conversation.",
        name = tone.name,
    );
    prompt
}
