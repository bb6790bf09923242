//! Context assembly: conversation context, relationship context and
//! recent history, in that order, under an optional character budget.
//!
//! | Piece | Source | Trim Strategy |
//! |-------|--------|---------------|
//! | Conversation context | `Conversation.context` | Front-cut last |
//! | Relationship context | Linked `Relationship.context` | Front-cut last |
//! | Recent conversation | Last K messages | Oldest lines dropped first |

pub mod assembler;
pub mod budget;

pub use assembler::{ContextAssembler, ContextSources};
