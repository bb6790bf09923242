//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use toneshift_core::error::StoreError;
use toneshift_core::store::{ConversationStore, RelationshipStore, Store, ToneStore, UserStore};
use toneshift_core::{Conversation, Message, Relationship, Tone, User};

/// An in-memory store that keeps every collection in a HashMap keyed by id.
/// Nothing survives a restart.
pub struct InMemoryStore {
    users: Arc<RwLock<HashMap<String, User>>>,
    conversations: Arc<RwLock<HashMap<String, Conversation>>>,
    relationships: Arc<RwLock<HashMap<String, Relationship>>>,
    tones: Arc<RwLock<HashMap<String, Tone>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            conversations: Arc::new(RwLock::new(HashMap::new())),
            relationships: Arc::new(RwLock::new(HashMap::new())),
            tones: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate(entity: &str, id: &str) -> StoreError {
    StoreError::QueryFailed(format!("{entity} {id} already exists"))
}

/// Email and username are unique across users, as in the SQLite schema.
fn check_unique<'a>(mut others: impl Iterator<Item = &'a User>, user: &User) -> Result<(), StoreError> {
    match others.find(|u| u.id != user.id && (u.email == user.email || u.username == user.username)) {
        Some(_) => Err(StoreError::QueryFailed(format!(
            "user with email {} or username {} already exists",
            user.email, user.username
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(duplicate("user", &user.id));
        }
        check_unique(users.values(), user)?;
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email || u.username == username)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            check_unique(users.values(), user)?;
        }
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            return Err(duplicate("conversation", &conversation.id));
        }
        conversations.insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn find_conversation(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        Ok(self
            .conversations
            .read()
            .await
            .get(id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn list_conversations(&self, owner_id: &str) -> Result<Vec<Conversation>, StoreError> {
        let mut results: Vec<Conversation> = self
            .conversations
            .read()
            .await
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(results)
    }

    async fn update_conversation(&self, conversation: &Conversation) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(&conversation.id) {
            Some(slot) if slot.owner_id == conversation.owner_id => {
                slot.title = conversation.title.clone();
                slot.context = conversation.context.clone();
                slot.relationship = conversation.relationship.clone();
                slot.updated_at = conversation.updated_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_messages(
        &self,
        id: &str,
        owner_id: &str,
        messages: &[Message],
    ) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(id) {
            Some(slot) if slot.owner_id == owner_id => {
                for message in messages {
                    slot.push(message.clone());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn replace_messages(
        &self,
        id: &str,
        owner_id: &str,
        messages: &[Message],
    ) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(id) {
            Some(slot) if slot.owner_id == owner_id => {
                slot.messages = messages.to_vec();
                slot.updated_at = chrono::Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_conversation(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut conversations = self.conversations.write().await;
        if conversations.get(id).is_some_and(|c| c.owner_id == owner_id) {
            conversations.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl RelationshipStore for InMemoryStore {
    async fn insert_relationship(&self, relationship: &Relationship) -> Result<(), StoreError> {
        let mut relationships = self.relationships.write().await;
        if relationships.contains_key(&relationship.id) {
            return Err(duplicate("relationship", &relationship.id));
        }
        relationships.insert(relationship.id.clone(), relationship.clone());
        Ok(())
    }

    async fn find_relationship(
        &self,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Relationship>, StoreError> {
        Ok(self
            .relationships
            .read()
            .await
            .get(id)
            .filter(|r| r.owner_id == owner_id)
            .cloned())
    }

    async fn list_relationships(&self, owner_id: &str) -> Result<Vec<Relationship>, StoreError> {
        let mut results: Vec<Relationship> = self
            .relationships
            .read()
            .await
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    async fn update_relationship(&self, relationship: &Relationship) -> Result<bool, StoreError> {
        let mut relationships = self.relationships.write().await;
        match relationships.get_mut(&relationship.id) {
            Some(slot) if slot.owner_id == relationship.owner_id => {
                *slot = relationship.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_relationship(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut relationships = self.relationships.write().await;
        if relationships.get(id).is_some_and(|r| r.owner_id == owner_id) {
            relationships.remove(id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl ToneStore for InMemoryStore {
    async fn insert_tone(&self, tone: &Tone) -> Result<(), StoreError> {
        let mut tones = self.tones.write().await;
        if tones.contains_key(&tone.id) {
            return Err(duplicate("tone", &tone.id));
        }
        tones.insert(tone.id.clone(), tone.clone());
        Ok(())
    }

    async fn find_tone_by_id(&self, id: &str) -> Result<Option<Tone>, StoreError> {
        Ok(self.tones.read().await.get(id).cloned())
    }

    async fn find_tone_by_name(
        &self,
        name: &str,
        viewer_id: &str,
    ) -> Result<Option<Tone>, StoreError> {
        let wanted = name.to_lowercase();
        let tones = self.tones.read().await;
        let matches = tones
            .values()
            .filter(|t| t.visible_to(viewer_id) && t.name.to_lowercase() == wanted);

        // Own tone beats a system tone of the same name
        let mut fallback = None;
        for tone in matches {
            if !tone.is_system {
                return Ok(Some(tone.clone()));
            }
            fallback.get_or_insert_with(|| tone.clone());
        }
        Ok(fallback)
    }

    async fn list_visible_tones(&self, viewer_id: &str) -> Result<Vec<Tone>, StoreError> {
        let mut results: Vec<Tone> = self
            .tones
            .read()
            .await
            .values()
            .filter(|t| t.visible_to(viewer_id))
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            b.is_system
                .cmp(&a.is_system)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        Ok(results)
    }

    async fn update_tone(&self, tone: &Tone) -> Result<bool, StoreError> {
        let mut tones = self.tones.write().await;
        match tones.get_mut(&tone.id) {
            Some(slot) if !slot.is_system && slot.creator_id == tone.creator_id => {
                *slot = tone.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_tone(&self, id: &str, owner_id: &str) -> Result<bool, StoreError> {
        let mut tones = self.tones.write().await;
        let owned = tones
            .get(id)
            .is_some_and(|t| !t.is_system && t.creator_id.as_deref() == Some(owner_id));
        if owned {
            tones.remove(id);
        }
        Ok(owned)
    }

    async fn count_system_tones(&self) -> Result<usize, StoreError> {
        Ok(self.tones.read().await.values().filter(|t| t.is_system).count())
    }
}

impl Store for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toneshift_core::{Message, ToneParameters};

    #[tokio::test]
    async fn user_lookup_by_email_or_username() {
        let store = InMemoryStore::new();
        let user = User::new("ada", "ada@example.com", "hash");
        store.insert_user(&user).await.unwrap();

        let by_name = store
            .find_user_by_email_or_username("nobody@example.com", "ada")
            .await
            .unwrap();
        assert_eq!(by_name.unwrap().id, user.id);

        let by_email = store.find_user_by_email("ada@example.com").await.unwrap();
        assert!(by_email.is_some());
        assert!(store.find_user_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let store = InMemoryStore::new();
        let user = User::new("ada", "ada@example.com", "hash");
        store.insert_user(&user).await.unwrap();
        assert!(store.insert_user(&user).await.is_err());
    }

    #[tokio::test]
    async fn conversations_scoped_to_owner() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();

        assert!(store.find_conversation(&conv.id, "u1").await.unwrap().is_some());
        assert!(store.find_conversation(&conv.id, "u2").await.unwrap().is_none());
        assert!(!store.delete_conversation(&conv.id, "u2").await.unwrap());

        let mut stolen = conv.clone();
        stolen.owner_id = "u2".into();
        assert!(!store.update_conversation(&stolen).await.unwrap());

        assert!(store.delete_conversation(&conv.id, "u1").await.unwrap());
        assert!(store.list_conversations("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn conversations_listed_most_recent_first() {
        let store = InMemoryStore::new();
        let older = Conversation::new("u1", "Older");
        let mut newer = Conversation::new("u1", "Newer");
        newer.updated_at = older.updated_at + chrono::Duration::seconds(5);
        store.insert_conversation(&older).await.unwrap();
        store.insert_conversation(&newer).await.unwrap();

        let titles: Vec<String> = store
            .list_conversations("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn update_conversation_leaves_messages_alone() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();
        assert!(store.append_messages(&conv.id, "u1", &[Message::user("hi")]).await.unwrap());

        // A stale copy with no messages must not wipe the log
        let mut stale = conv.clone();
        stale.title = "Renamed".into();
        assert!(store.update_conversation(&stale).await.unwrap());

        let loaded = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Renamed");
        assert_eq!(loaded.messages.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let store = Arc::new(InMemoryStore::new());
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let store = store.clone();
                let id = conv.id.clone();
                tokio::spawn(async move {
                    let pair = [Message::user(format!("q{i}")), Message::ai(format!("a{i}"), "Casual")];
                    store.append_messages(&id, "u1", &pair).await.unwrap()
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        let loaded = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 20);
        for pair in loaded.messages.chunks(2) {
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
        assert!(!store.append_messages(&conv.id, "u2", &[Message::user("x")]).await.unwrap());
    }

    #[tokio::test]
    async fn replace_messages_overwrites_log() {
        let store = InMemoryStore::new();
        let conv = Conversation::new("u1", "Chat");
        store.insert_conversation(&conv).await.unwrap();
        store.append_messages(&conv.id, "u1", &[Message::user("old")]).await.unwrap();

        assert!(store.replace_messages(&conv.id, "u1", &[Message::user("new")]).await.unwrap());
        let loaded = store.find_conversation(&conv.id, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "new");
    }

    #[tokio::test]
    async fn email_and_username_stay_unique() {
        let store = InMemoryStore::new();
        let ada = User::new("ada", "ada@example.com", "h");
        let mut bob = User::new("bob", "bob@example.com", "h");
        store.insert_user(&ada).await.unwrap();
        store.insert_user(&bob).await.unwrap();

        assert!(store.insert_user(&User::new("ada2", "ada@example.com", "h")).await.is_err());
        bob.email = "ada@example.com".into();
        assert!(store.update_user(&bob).await.is_err());

        let found = store.find_user_by_username("bob").await.unwrap().unwrap();
        assert_eq!(found.email, "bob@example.com");
        assert!(store.find_user_by_username("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn relationships_sorted_by_name() {
        let store = InMemoryStore::new();
        store.insert_relationship(&Relationship::new("u1", "Zoe")).await.unwrap();
        store.insert_relationship(&Relationship::new("u1", "Boss")).await.unwrap();
        store.insert_relationship(&Relationship::new("u2", "Mom")).await.unwrap();

        let names: Vec<String> = store
            .list_relationships("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Boss", "Zoe"]);
    }

    #[tokio::test]
    async fn tone_name_lookup_prefers_own_tone() {
        let store = InMemoryStore::new();
        let system = Tone::system("Casual", "Relaxed", ToneParameters::new());
        let mut mine = Tone::custom("u1", "casual");
        mine.parameters.insert("slang".into(), "heavy".into());
        store.insert_tone(&system).await.unwrap();
        store.insert_tone(&mine).await.unwrap();

        let for_owner = store.find_tone_by_name("CASUAL", "u1").await.unwrap().unwrap();
        assert_eq!(for_owner.id, mine.id);

        let for_other = store.find_tone_by_name("casual", "u2").await.unwrap().unwrap();
        assert_eq!(for_other.id, system.id);
    }

    #[tokio::test]
    async fn other_users_tones_invisible() {
        let store = InMemoryStore::new();
        store.insert_tone(&Tone::custom("u1", "Pirate")).await.unwrap();

        assert!(store.find_tone_by_name("pirate", "u2").await.unwrap().is_none());
        assert!(store.list_visible_tones("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn visible_tones_system_first_then_name() {
        let store = InMemoryStore::new();
        store.insert_tone(&Tone::custom("u1", "Aloof")).await.unwrap();
        store
            .insert_tone(&Tone::system("Professional", "", ToneParameters::new()))
            .await
            .unwrap();
        store
            .insert_tone(&Tone::system("Casual", "", ToneParameters::new()))
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_visible_tones("u1")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Casual", "Professional", "Aloof"]);
    }

    #[tokio::test]
    async fn system_tones_cannot_be_updated_or_deleted() {
        let store = InMemoryStore::new();
        let mut system = Tone::system("Formal", "", ToneParameters::new());
        store.insert_tone(&system).await.unwrap();

        system.description = "changed".into();
        assert!(!store.update_tone(&system).await.unwrap());
        assert!(!store.delete_tone(&system.id, "u1").await.unwrap());
        assert_eq!(store.count_system_tones().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn custom_tone_delete_requires_owner() {
        let store = InMemoryStore::new();
        let tone = Tone::custom("u1", "Pirate");
        store.insert_tone(&tone).await.unwrap();

        assert!(!store.delete_tone(&tone.id, "u2").await.unwrap());
        assert!(store.delete_tone(&tone.id, "u1").await.unwrap());
        assert!(store.find_tone_by_id(&tone.id).await.unwrap().is_none());
    }
}
