//! Tone catalog types.
//!
//! A [`Tone`] is a stored catalog entry (system-seeded or user-created).
//! A [`ToneDescriptor`] is what prompt construction actually consumes:
//! a display name plus an ordered parameter map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Tone parameters (e.g. `formality = high`). Ordered for deterministic prompts.
pub type ToneParameters = BTreeMap<String, String>;

/// A tone in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tone {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// System tones are seeded at startup and never mutated
    #[serde(default)]
    pub is_system: bool,

    #[serde(default)]
    pub parameters: ToneParameters,

    /// Owner of a custom tone; `None` for system tones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Tone {
    /// A built-in tone with no owner.
    pub fn system(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToneParameters,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            is_system: true,
            parameters,
            creator_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A custom tone owned by `creator_id`.
    pub fn custom(creator_id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: String::new(),
            is_system: false,
            parameters: ToneParameters::new(),
            creator_id: Some(creator_id.into()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user_id` may see this tone.
    pub fn visible_to(&self, user_id: &str) -> bool {
        self.is_system || self.creator_id.as_deref() == Some(user_id)
    }

    pub fn descriptor(&self) -> ToneDescriptor {
        ToneDescriptor {
            name: self.name.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Canonical tone description used to build prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneDescriptor {
    pub name: String,
    #[serde(default)]
    pub parameters: ToneParameters,
}

impl ToneDescriptor {
    /// A bare label with no parameters.
    pub fn raw(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: ToneParameters::new(),
        }
    }
}
