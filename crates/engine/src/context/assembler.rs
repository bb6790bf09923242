//! Context assembly: turns a conversation and its relationship profile
//! into the narrative block handed to the prompt builder.
//!
//! Block layout, each piece omitted when missing:
//!
//! ```text
//! <conversation context>
//! <relationship context>
//!
//! Recent conversation:
//! user: ...
//! ai: ...
//! ```
//!
//! # Bounding
//!
//! When `max_chars` is non-zero and the block is too long, the oldest
//! history lines are dropped first. If the block still does not fit, it
//! is cut from the front so the most recent text survives. Assembly is
//! deterministic: identical inputs always give identical output.

use super::budget::{char_len, truncate_front};
use toneshift_config::OrchestrationConfig;
use toneshift_core::store::{ConversationStore, RelationshipStore};
use toneshift_core::{Conversation, Error, Relationship};
use tracing::{debug, warn};

const HISTORY_HEADER: &str = "Recent conversation:";

// ── Sources ───────────────────────────────────────────────────────────────

/// The stored records a context block is built from.
#[derive(Debug, Clone, Default)]
pub struct ContextSources {
    pub conversation: Option<Conversation>,
    /// The conversation's linked relationship, when the link resolves.
    pub relationship: Option<Relationship>,
}

impl ContextSources {
    /// Load the conversation (if an id is given) and its linked relationship.
    ///
    /// A missing or foreign conversation is `NotFound`. A dangling
    /// relationship link is tolerated and yields no relationship.
    pub async fn load<S>(
        store: &S,
        owner_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Self, Error>
    where
        S: ConversationStore + RelationshipStore + ?Sized,
    {
        let Some(conversation_id) = conversation_id else {
            return Ok(Self::default());
        };

        let conversation = store
            .find_conversation(conversation_id, owner_id)
            .await?
            .ok_or_else(|| Error::not_found("Conversation", conversation_id))?;

        let relationship = match conversation.relationship.as_deref() {
            Some(rel_id) => {
                let found = store.find_relationship(rel_id, owner_id).await?;
                if found.is_none() {
                    warn!(
                        conversation_id = %conversation.id,
                        relationship_id = %rel_id,
                        "Linked relationship not found, ignoring"
                    );
                }
                found
            }
            None => None,
        };

        Ok(Self {
            conversation: Some(conversation),
            relationship,
        })
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// Builds bounded context blocks.
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    history_window: usize,
    max_chars: usize,
}

impl ContextAssembler {
    /// `max_chars == 0` disables bounding.
    pub fn new(history_window: usize, max_chars: usize) -> Self {
        Self {
            history_window,
            max_chars,
        }
    }

    pub fn from_config(config: &OrchestrationConfig) -> Self {
        Self::new(config.history_window, config.max_context_chars)
    }

    pub fn assemble_sources(&self, sources: &ContextSources) -> String {
        self.assemble(sources.conversation.as_ref(), sources.relationship.as_ref())
    }

    /// Assemble the context block.
    pub fn assemble(
        &self,
        conversation: Option<&Conversation>,
        relationship: Option<&Relationship>,
    ) -> String {
        let preamble = [
            conversation.map(|c| c.context.trim()),
            relationship.map(|r| r.context.trim()),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

        let mut history: Vec<String> = conversation
            .map(|c| {
                c.recent(self.history_window)
                    .iter()
                    .map(|m| format!("{}: {}", m.sender, m.content))
                    .collect()
            })
            .unwrap_or_default();

        let mut block = render(&preamble, &history);
        if self.max_chars == 0 || char_len(&block) <= self.max_chars {
            return block;
        }

        let mut dropped = 0;
        while !history.is_empty() && char_len(&block) > self.max_chars {
            history.remove(0);
            dropped += 1;
            block = render(&preamble, &history);
        }

        if char_len(&block) > self.max_chars {
            block = truncate_front(&block, self.max_chars).to_string();
        }

        debug!(
            dropped_history = dropped,
            chars = char_len(&block),
            budget = self.max_chars,
            "Context truncated"
        );
        block
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::from_config(&OrchestrationConfig::default())
    }
}

fn render(preamble: &str, history: &[String]) -> String {
    if history.is_empty() {
        return preamble.to_string();
    }
    let lines = history.join("\n");
    if preamble.is_empty() {
        format!("{HISTORY_HEADER}\n{lines}")
    } else {
        format!("{preamble}\n\n{HISTORY_HEADER}\n{lines}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toneshift_core::Message;
    use toneshift_store::InMemoryStore;

    fn conversation_with(context: &str, messages: &[(&str, bool)]) -> Conversation {
        let mut conv = Conversation::new("u1", "Chat");
        conv.context = context.into();
        for (content, from_user) in messages {
            if *from_user {
                conv.push(Message::user(*content));
            } else {
                conv.push(Message::ai(*content, "Friendly"));
            }
        }
        conv
    }

    #[test]
    fn nothing_in_nothing_out() {
        let assembler = ContextAssembler::new(3, 0);
        assert_eq!(assembler.assemble(None, None), "");
    }

    #[test]
    fn empty_conversation_contributes_nothing() {
        let conv = Conversation::new("u1", "Chat");
        assert_eq!(ContextAssembler::new(3, 0).assemble(Some(&conv), None), "");
    }

    #[test]
    fn pieces_appear_in_order() {
        let conv = conversation_with("C1", &[("hi", true), ("hello", false)]);
        let mut rel = Relationship::new("u1", "Sam");
        rel.context = "R1".into();

        let block = ContextAssembler::new(3, 0).assemble(Some(&conv), Some(&rel));

        let c1 = block.find("C1").unwrap();
        let r1 = block.find("R1").unwrap();
        let hi = block.find("user: hi").unwrap();
        let hello = block.find("ai: hello").unwrap();
        assert!(c1 < r1 && r1 < hi && hi < hello);
        assert_eq!(block, "C1\nR1\n\nRecent conversation:\nuser: hi\nai: hello");
    }

    #[test]
    fn history_only_has_no_leading_blank_line() {
        let conv = conversation_with("", &[("hi", true)]);
        let block = ContextAssembler::new(3, 0).assemble(Some(&conv), None);
        assert_eq!(block, "Recent conversation:\nuser: hi");
    }

    #[test]
    fn only_last_k_messages_included() {
        let conv = conversation_with("", &[("m1", true), ("m2", false), ("m3", true), ("m4", false)]);
        let block = ContextAssembler::new(3, 0).assemble(Some(&conv), None);
        assert!(!block.contains("m1"));
        assert!(block.contains("user: m3"));
        assert!(block.ends_with("ai: m4"));
    }

    #[test]
    fn oldest_history_dropped_first_when_over_budget() {
        let conv = conversation_with("C1", &[("aaaaaaaaaa", true), ("bbbbbbbbbb", false)]);
        let full = ContextAssembler::new(3, 0).assemble(Some(&conv), None);

        let bounded = ContextAssembler::new(3, full.chars().count() - 1).assemble(Some(&conv), None);
        assert_eq!(bounded, "C1\n\nRecent conversation:\nai: bbbbbbbbbb");
    }

    #[test]
    fn front_cut_when_history_gone_and_still_too_long() {
        let conv = conversation_with("0123456789", &[("hi", true)]);
        let block = ContextAssembler::new(3, 4).assemble(Some(&conv), None);
        assert_eq!(block, "6789");
    }

    #[test]
    fn bounding_is_deterministic() {
        let conv = conversation_with("ctx", &[("one", true), ("two", false), ("three", true)]);
        let assembler = ContextAssembler::new(3, 30);
        assert_eq!(
            assembler.assemble(Some(&conv), None),
            assembler.assemble(Some(&conv), None)
        );
        assert!(assembler.assemble(Some(&conv), None).chars().count() <= 30);
    }

    #[tokio::test]
    async fn load_tolerates_dangling_relationship() {
        let store = InMemoryStore::new();
        let mut conv = Conversation::new("u1", "Chat");
        conv.relationship = Some("gone".into());
        store.insert_conversation(&conv).await.unwrap();

        let sources = ContextSources::load(&store, "u1", Some(&conv.id)).await.unwrap();
        assert!(sources.conversation.is_some());
        assert!(sources.relationship.is_none());
    }

    #[tokio::test]
    async fn load_rejects_foreign_conversation() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();

        let err = ContextSources::load(&store, "u2", Some(&conv.id)).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn load_without_id_is_empty() {
        let store = InMemoryStore::new();
        let sources = ContextSources::load(&store, "u1", None).await.unwrap();
        assert!(sources.conversation.is_none());
        assert!(sources.relationship.is_none());
    }

    #[tokio::test]
    async fn load_resolves_linked_relationship() {
        let store = InMemoryStore::new();
        let mut rel = Relationship::new("u1", "Boss");
        rel.context = "My manager".into();
        store.insert_relationship(&rel).await.unwrap();
        let mut conv = Conversation::new("u1", "Chat");
        conv.relationship = Some(rel.id.clone());
        store.insert_conversation(&conv).await.unwrap();

        let sources = ContextSources::load(&store, "u1", Some(&conv.id)).await.unwrap();
        assert_eq!(sources.relationship.unwrap().context, "My manager");
    }
}
