//! Conversation records, scoped to their owner.

use serde::{Deserialize, Deserializer};
use toneshift_core::store::ConversationStore;
use toneshift_core::{Conversation, Error, Message, Result, Sender};
use tracing::info;

/// Distinguishes an absent field from an explicit `null`.
pub(crate) fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub relationship_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    /// Replaces the whole message log.
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    /// `Some(None)` (an explicit `null`) unlinks the relationship.
    #[serde(default, deserialize_with = "present")]
    pub relationship_id: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_sender")]
    pub sender: Sender,
    /// Kept only on AI messages.
    #[serde(default)]
    pub tone: Option<String>,
}

fn default_sender() -> Sender {
    Sender::User
}

pub async fn create_conversation<S>(store: &S, owner_id: &str, new: NewConversation) -> Result<Conversation>
where
    S: ConversationStore + ?Sized,
{
    let title = new.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidInput("Conversation title is required".into()));
    }

    let mut conversation = Conversation::new(owner_id, title);
    conversation.context = new.context.unwrap_or_default();
    conversation.relationship = new.relationship_id.filter(|id| !id.is_empty());
    store.insert_conversation(&conversation).await?;

    info!(conversation_id = %conversation.id, "Conversation created");
    Ok(conversation)
}

pub async fn list_conversations<S>(store: &S, owner_id: &str) -> Result<Vec<Conversation>>
where
    S: ConversationStore + ?Sized,
{
    Ok(store.list_conversations(owner_id).await?)
}

pub async fn get_conversation<S>(store: &S, owner_id: &str, id: &str) -> Result<Conversation>
where
    S: ConversationStore + ?Sized,
{
    store
        .find_conversation(id, owner_id)
        .await?
        .ok_or_else(|| Error::not_found("Conversation", id))
}

pub async fn update_conversation<S>(
    store: &S,
    owner_id: &str,
    id: &str,
    update: ConversationUpdate,
) -> Result<Conversation>
where
    S: ConversationStore + ?Sized,
{
    let mut conversation = get_conversation(store, owner_id, id).await?;

    if let Some(title) = update.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        conversation.title = title.to_string();
    }
    if let Some(context) = update.context {
        conversation.context = context;
    }
    if let Some(link) = update.relationship_id {
        conversation.relationship = link.filter(|id| !id.is_empty());
    }
    conversation.updated_at = chrono::Utc::now();

    if !store.update_conversation(&conversation).await? {
        return Err(Error::not_found("Conversation", id));
    }
    if let Some(messages) = update.messages
        && !store.replace_messages(id, owner_id, &messages).await?
    {
        return Err(Error::not_found("Conversation", id));
    }

    // Re-read so the log reflects appends that landed meanwhile.
    get_conversation(store, owner_id, id).await
}

pub async fn delete_conversation<S>(store: &S, owner_id: &str, id: &str) -> Result<()>
where
    S: ConversationStore + ?Sized,
{
    if !store.delete_conversation(id, owner_id).await? {
        return Err(Error::not_found("Conversation", id));
    }
    info!(conversation_id = %id, "Conversation deleted");
    Ok(())
}

/// Append one message and return it.
pub async fn add_message<S>(store: &S, owner_id: &str, id: &str, new: NewMessage) -> Result<Message>
where
    S: ConversationStore + ?Sized,
{
    if new.content.trim().is_empty() {
        return Err(Error::InvalidInput("Message content is required".into()));
    }

    let tone = match new.sender {
        Sender::Ai => new.tone.filter(|t| !t.is_empty()),
        Sender::User => None,
    };
    let message = Message {
        sender: new.sender,
        tone,
        ..Message::user(new.content)
    };

    if !store.append_messages(id, owner_id, std::slice::from_ref(&message)).await? {
        return Err(Error::not_found("Conversation", id));
    }
    Ok(message)
}
