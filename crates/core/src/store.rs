//! Store traits: persistent storage for users, conversations,
//! relationships and tones.
//!
//! Every owner-scoped read filters on the owner id, so a record that
//! exists but belongs to someone else is indistinguishable from a
//! missing one.
//!
//! Implementations: SQLite, in-memory (for testing).

use async_trait::async_trait;
use crate::error::StoreError;
use crate::message::{Conversation, Message};
use crate::relationship::Relationship;
use crate::tone::Tone;
use crate::user::User;

/// Identity storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Find a user matching either the email or the username.
    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Persist a modified user. Returns `false` if the user no longer exists.
    async fn update_user(&self, user: &User) -> Result<bool, StoreError>;
}

/// Conversation storage, scoped to the owning user.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError>;

    async fn find_conversation(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Conversation>, StoreError>;

    /// All conversations of an owner, most recently updated first.
    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError>;

    /// Persist title, context, relationship link and `updated_at` (matched
    /// on id and owner). The message log is not written; use
    /// [`append_messages`](Self::append_messages) or
    /// [`replace_messages`](Self::replace_messages).
    /// Returns `false` if no such conversation exists.
    async fn update_conversation(&self, conversation: &Conversation) -> Result<bool, StoreError>;

    /// Atomically append `messages`, in order, to the end of the stored log.
    ///
    /// Concurrent appends to one conversation never lose each other's
    /// messages. Returns `false` if no such conversation exists.
    async fn append_messages(
        &self,
        id: &str,
        owner_id: &str,
        messages: &[Message],
    ) -> Result<bool, StoreError>;

    /// Replace the whole message log.
    async fn replace_messages(
        &self,
        id: &str,
        owner_id: &str,
        messages: &[Message],
    ) -> Result<bool, StoreError>;

    async fn delete_conversation(&self, id: &str, owner_id: &str) -> Result<bool, StoreError>;
}

/// Relationship profile storage, scoped to the owning user.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    async fn insert_relationship(&self, relationship: &Relationship) -> Result<(), StoreError>;

    async fn find_relationship(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Relationship>, StoreError>;

    /// All relationships of an owner, ordered by name.
    async fn list_relationships(&self, owner_id: &str) -> Result<Vec<Relationship>, StoreError>;

    async fn update_relationship(&self, relationship: &Relationship) -> Result<bool, StoreError>;

    async fn delete_relationship(&self, id: &str, owner_id: &str) -> Result<bool, StoreError>;
}

/// Tone catalog storage.
#[async_trait]
pub trait ToneStore: Send + Sync {
    async fn insert_tone(&self, tone: &Tone) -> Result<(), StoreError>;

    /// Look up a tone by primary key, regardless of owner.
    async fn find_tone_by_id(&self, id: &str) -> Result<Option<Tone>, StoreError>;

    /// Case-insensitive name lookup among tones visible to `viewer_id`
    /// (system tones and the viewer's own). The viewer's own tone wins a tie.
    async fn find_tone_by_name(
        &self,
        name: &str,
        viewer_id: &str,
    ) -> Result<Option<Tone>, StoreError>;

    /// System tones plus the viewer's custom tones: system first, then by name.
    async fn list_visible_tones(&self, viewer_id: &str) -> Result<Vec<Tone>, StoreError>;

    async fn update_tone(&self, tone: &Tone) -> Result<bool, StoreError>;

    /// Delete a custom tone owned by `owner_id`. System tones are never deleted.
    async fn delete_tone(&self, id: &str, owner_id: &str) -> Result<bool, StoreError>;

    async fn count_system_tones(&self) -> Result<usize, StoreError>;
}

/// Everything the engine needs from a backing store.
pub trait Store: UserStore + ConversationStore + RelationshipStore + ToneStore {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;
}
