//! User accounts and preferences.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tones given to every newly registered user.
pub fn default_user_tones() -> Vec<String> {
    vec!["professional".into(), "casual".into(), "friendly".into()]
}

fn default_true() -> bool {
    true
}

/// Per-user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    /// Ordered tone identifiers used when a request names none
    #[serde(default)]
    pub default_tones: Vec<String>,

    #[serde(default = "default_true")]
    pub notifications: bool,

    #[serde(default)]
    pub dark_mode: bool,

    /// Any other client-side preference keys
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_tones: default_user_tones(),
            notifications: true,
            dark_mode: false,
            extra: serde_json::Map::new(),
        }
    }
}

impl UserPreferences {
    /// Shallow-merge a partial JSON preferences object into these preferences.
    ///
    /// Known keys replace their typed field; unknown keys land in `extra`.
    pub fn merge(&mut self, patch: &serde_json::Map<String, serde_json::Value>) -> Result<(), serde_json::Error> {
        let mut current = match serde_json::to_value(&*self)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(serde_json::Value::Object(current))?;
        Ok(())
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub username: String,

    pub email: String,

    /// Argon2 PHC string; never leaves the server
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    #[serde(default)]
    pub preferences: UserPreferences,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            preferences: UserPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
