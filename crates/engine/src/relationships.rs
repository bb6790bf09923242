//! Relationship profiles, scoped to their owner.
//!
//! Deleting a profile never touches conversations that link to it; readers
//! treat the dangling link as "no relationship".

use serde::Deserialize;
use toneshift_core::store::RelationshipStore;
use toneshift_core::{Error, Relationship, RelationshipCategory, Result};
use tracing::info;

type InfoMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelationship {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<RelationshipCategory>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub preferred_tones: Option<Vec<String>>,
    #[serde(default)]
    pub additional_info: Option<InfoMap>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<RelationshipCategory>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub preferred_tones: Option<Vec<String>>,
    /// Shallow-merged into the stored map.
    #[serde(default)]
    pub additional_info: Option<InfoMap>,
}

pub async fn create_relationship<S>(store: &S, owner_id: &str, new: NewRelationship) -> Result<Relationship>
where
    S: RelationshipStore + ?Sized,
{
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Relationship name is required".into()));
    }

    let mut relationship = Relationship::new(owner_id, name);
    if let Some(category) = new.category {
        relationship.category = category;
    }
    relationship.context = new.context.unwrap_or_default();
    if let Some(tones) = new.preferred_tones {
        relationship.preferred_tones = tones;
    }
    relationship.additional_info = new.additional_info.unwrap_or_default();
    store.insert_relationship(&relationship).await?;

    info!(relationship_id = %relationship.id, "Relationship created");
    Ok(relationship)
}

pub async fn list_relationships<S>(store: &S, owner_id: &str) -> Result<Vec<Relationship>>
where
    S: RelationshipStore + ?Sized,
{
    Ok(store.list_relationships(owner_id).await?)
}

pub async fn get_relationship<S>(store: &S, owner_id: &str, id: &str) -> Result<Relationship>
where
    S: RelationshipStore + ?Sized,
{
    store
        .find_relationship(id, owner_id)
        .await?
        .ok_or_else(|| Error::not_found("Relationship", id))
}

pub async fn update_relationship<S>(
    store: &S,
    owner_id: &str,
    id: &str,
    update: RelationshipUpdate,
) -> Result<Relationship>
where
    S: RelationshipStore + ?Sized,
{
    let mut relationship = get_relationship(store, owner_id, id).await?;

    if let Some(name) = update.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        relationship.name = name.to_string();
    }
    if let Some(category) = update.category {
        relationship.category = category;
    }
    if let Some(context) = update.context {
        relationship.context = context;
    }
    if let Some(tones) = update.preferred_tones {
        relationship.preferred_tones = tones;
    }
    if let Some(info) = update.additional_info {
        relationship.additional_info.extend(info);
    }
    relationship.updated_at = chrono::Utc::now();

    if !store.update_relationship(&relationship).await? {
        return Err(Error::not_found("Relationship", id));
    }
    Ok(relationship)
}

pub async fn delete_relationship<S>(store: &S, owner_id: &str, id: &str) -> Result<()>
where
    S: RelationshipStore + ?Sized,
{
    if !store.delete_relationship(id, owner_id).await? {
        return Err(Error::not_found("Relationship", id));
    }
    info!(relationship_id = %id, "Relationship deleted");
    Ok(())
}
