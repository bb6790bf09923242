//! Relationship profiles: who the user is talking to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broad category of a relationship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipCategory {
    #[default]
    Personal,
    Professional,
    Family,
    Friend,
    Romantic,
    Other,
}

impl RelationshipCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Professional => "professional",
            Self::Family => "family",
            Self::Friend => "friend",
            Self::Romantic => "romantic",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for RelationshipCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "professional" => Ok(Self::Professional),
            "family" => Ok(Self::Family),
            "friend" => Ok(Self::Friend),
            "romantic" => Ok(Self::Romantic),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown relationship category: {other}")),
        }
    }
}

/// Tones applied when a relationship is created without explicit preferences.
pub fn default_preferred_tones() -> Vec<String> {
    vec!["friendly".into(), "respectful".into()]
}

/// A relationship profile owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,

    pub owner_id: String,

    pub name: String,

    #[serde(default)]
    pub category: RelationshipCategory,

    /// Free-text context appended to prompts for linked conversations
    #[serde(default)]
    pub context: String,

    /// Ordered tone identifiers to use when a request names none
    #[serde(default = "default_preferred_tones")]
    pub preferred_tones: Vec<String>,

    /// Open-ended extra details
    #[serde(default)]
    pub additional_info: serde_json::Map<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(owner_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            name: name.into(),
            category: RelationshipCategory::default(),
            context: String::new(),
            preferred_tones: default_preferred_tones(),
            additional_info: serde_json::Map::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
