//! Conversation append: records a generated exchange.
//!
//! The user message and the AI reply are appended together, in that order,
//! with one atomic store call. Overlapping appends to the same conversation
//! each keep their pair; a failed write appends neither message.

use serde::Serialize;
use toneshift_core::store::ConversationStore;
use toneshift_core::{Error, Message};
use tracing::info;

/// The two messages produced by one generate-and-append call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub user_message: Message,
    pub ai_message: Message,
}

/// Append `user_text` and the `ai_text` reply (tagged with `tone`).
pub async fn append_exchange<S>(
    store: &S,
    owner_id: &str,
    conversation_id: &str,
    user_text: &str,
    ai_text: &str,
    tone: &str,
) -> Result<Exchange, Error>
where
    S: ConversationStore + ?Sized,
{
    let user_message = Message::user(user_text);
    let ai_message = Message::ai(ai_text, tone);
    let pair = [user_message, ai_message];

    if !store.append_messages(conversation_id, owner_id, &pair).await? {
        return Err(Error::not_found("Conversation", conversation_id));
    }

    info!(conversation_id = %conversation_id, tone = %tone, "Exchange appended");

    let [user_message, ai_message] = pair;
    Ok(Exchange {
        user_message,
        ai_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use toneshift_core::{Conversation, Sender, StoreError};
    use toneshift_store::InMemoryStore;

    #[tokio::test]
    async fn appends_user_then_ai() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();

        let exchange = append_exchange(&store, "u1", &conv.id, "hi", "Hello!", "Friendly")
            .await
            .unwrap();

        let stored = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[0].sender, Sender::User);
        assert_eq!(stored.messages[0].content, "hi");
        assert_eq!(stored.messages[1].sender, Sender::Ai);
        assert_eq!(stored.messages[1].tone.as_deref(), Some("Friendly"));
        assert_ne!(stored.messages[0].id, stored.messages[1].id);
        assert!(stored.messages[0].timestamp <= stored.messages[1].timestamp);
        assert_eq!(exchange.user_message, stored.messages[0]);
        assert_eq!(exchange.ai_message, stored.messages[1]);
    }

    #[tokio::test]
    async fn keeps_user_text_verbatim() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();

        append_exchange(&store, "u1", &conv.id, "  hi\n", "Hello!", "Friendly")
            .await
            .unwrap();

        let stored = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        assert_eq!(stored.messages[0].content, "  hi\n");
    }

    #[tokio::test]
    async fn missing_or_foreign_conversation_is_not_found() {
        let store = InMemoryStore::new();
        let err = append_exchange(&store, "u1", "never-saved", "hi", "Hello!", "Friendly")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));

        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();
        let err = append_exchange(&store, "u2", &conv.id, "hi", "Hello!", "Friendly")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        let stored = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        assert!(stored.messages.is_empty());
    }

    #[tokio::test]
    async fn overlapping_appends_keep_every_pair() {
        let store = Arc::new(InMemoryStore::new());
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();

        let (first, second) = tokio::join!(
            append_exchange(&*store, "u1", &conv.id, "first", "one", "Casual"),
            append_exchange(&*store, "u1", &conv.id, "second", "two", "Formal"),
        );
        first.unwrap();
        second.unwrap();

        let stored = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        let contents: Vec<&str> = stored.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), 4);
        assert!(contents.windows(2).any(|w| w == ["first", "one"]));
        assert!(contents.windows(2).any(|w| w == ["second", "two"]));
    }

    struct FailingWrites;

    #[async_trait]
    impl ConversationStore for FailingWrites {
        async fn insert_conversation(&self, _: &Conversation) -> Result<(), StoreError> {
            Ok(())
        }
        async fn find_conversation(&self, _: &str, _: &str) -> Result<Option<Conversation>, StoreError> {
            Ok(None)
        }
        async fn list_conversations(&self, _: &str) -> Result<Vec<Conversation>, StoreError> {
            Ok(vec![])
        }
        async fn update_conversation(&self, _: &Conversation) -> Result<bool, StoreError> {
            Ok(false)
        }
        async fn append_messages(&self, _: &str, _: &str, _: &[Message]) -> Result<bool, StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
        async fn replace_messages(&self, _: &str, _: &str, _: &[Message]) -> Result<bool, StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
        async fn delete_conversation(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn write_failure_is_persistence_failure() {
        let err = append_exchange(&FailingWrites, "u1", "c1", "hi", "Hello!", "Friendly")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PersistenceFailure(_)));
    }
}
