//! Tone catalog: built-in system tones plus per-user custom tones.
//!
//! System tones are seeded once and are read-only through this module.
//! Custom tone names are unique per owner (case-insensitive) but may
//! repeat a system tone's name or another user's tone name.

use serde::Deserialize;
use toneshift_core::store::ToneStore;
use toneshift_core::{Error, Result, Tone, ToneParameters};
use tracing::info;

// ── System tones ──────────────────────────────────────────────────────────

const SYSTEM_TONES: [(&str, &str, &str, &str); 8] = [
    ("Professional", "Formal, clear, and business-appropriate responses.", "high", "neutral"),
    ("Casual", "Relaxed, conversational, and friendly responses.", "low", "positive"),
    ("Friendly", "Warm, supportive, and approachable responses.", "medium", "positive"),
    ("Funny", "Humorous, light, and entertaining responses.", "low", "humorous"),
    ("Formal", "Highly structured, respectful, and proper responses.", "very high", "neutral"),
    ("Empathetic", "Understanding, compassionate, and supportive responses.", "medium", "caring"),
    ("Direct", "Straightforward, concise, and to-the-point responses.", "medium", "neutral"),
    ("Enthusiastic", "Excited, energetic, and passionate responses.", "medium", "excited"),
];

/// Fresh copies of the built-in tones.
pub fn system_tones() -> Vec<Tone> {
    SYSTEM_TONES
        .iter()
        .map(|(name, description, formality, emotion)| {
            let mut parameters = ToneParameters::new();
            parameters.insert("formality".into(), (*formality).into());
            parameters.insert("emotion".into(), (*emotion).into());
            Tone::system(*name, *description, parameters)
        })
        .collect()
}

/// Insert the built-in tones unless some system tone already exists.
///
/// Returns how many tones were inserted (0 when already seeded).
pub async fn seed_system_tones<S>(store: &S) -> Result<usize>
where
    S: ToneStore + ?Sized,
{
    if store.count_system_tones().await? > 0 {
        info!("System tones already exist, skipping seed");
        return Ok(0);
    }

    let tones = system_tones();
    for tone in &tones {
        store.insert_tone(tone).await?;
    }
    info!(count = tones.len(), "System tones seeded");
    Ok(tones.len())
}

// ── Custom tones ──────────────────────────────────────────────────────────

/// Fields for a new custom tone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTone {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<ToneParameters>,
}

/// A partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToneUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Merged key-by-key into the existing parameters.
    #[serde(default)]
    pub parameters: Option<ToneParameters>,
}

/// System tones plus the viewer's own, system first then by name.
pub async fn list_tones<S>(store: &S, viewer_id: &str) -> Result<Vec<Tone>>
where
    S: ToneStore + ?Sized,
{
    Ok(store.list_visible_tones(viewer_id).await?)
}

async fn ensure_name_free<S>(store: &S, owner_id: &str, name: &str, except_id: Option<&str>) -> Result<()>
where
    S: ToneStore + ?Sized,
{
    let wanted = name.to_lowercase();
    let taken = store
        .list_visible_tones(owner_id)
        .await?
        .into_iter()
        .any(|t| {
            !t.is_system
                && t.creator_id.as_deref() == Some(owner_id)
                && Some(t.id.as_str()) != except_id
                && t.name.to_lowercase() == wanted
        });
    if taken {
        return Err(Error::InvalidInput(
            "You already have a custom tone with this name".into(),
        ));
    }
    Ok(())
}

pub async fn create_tone<S>(store: &S, owner_id: &str, new: NewTone) -> Result<Tone>
where
    S: ToneStore + ?Sized,
{
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Tone name is required".into()));
    }
    ensure_name_free(store, owner_id, name, None).await?;

    let mut tone = Tone::custom(owner_id, name);
    tone.description = new.description.unwrap_or_default();
    tone.parameters = new.parameters.unwrap_or_default();
    store.insert_tone(&tone).await?;

    info!(tone_id = %tone.id, name = %tone.name, "Custom tone created");
    Ok(tone)
}

/// Load a tone the caller may mutate: `Forbidden` for system tones,
/// `NotFound` for missing or foreign ones.
async fn owned_tone<S>(store: &S, owner_id: &str, id: &str) -> Result<Tone>
where
    S: ToneStore + ?Sized,
{
    let tone = store
        .find_tone_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Tone", id))?;
    if tone.is_system {
        return Err(Error::Forbidden("System tones cannot be modified".into()));
    }
    if tone.creator_id.as_deref() != Some(owner_id) {
        return Err(Error::not_found("Tone", id));
    }
    Ok(tone)
}

pub async fn update_tone<S>(store: &S, owner_id: &str, id: &str, update: ToneUpdate) -> Result<Tone>
where
    S: ToneStore + ?Sized,
{
    let mut tone = owned_tone(store, owner_id, id).await?;

    if let Some(name) = update.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Tone name cannot be empty".into()));
        }
        ensure_name_free(store, owner_id, name, Some(id)).await?;
        tone.name = name.to_string();
    }
    if let Some(description) = update.description {
        tone.description = description;
    }
    if let Some(parameters) = update.parameters {
        tone.parameters.extend(parameters);
    }
    tone.updated_at = chrono::Utc::now();

    if !store.update_tone(&tone).await? {
        return Err(Error::not_found("Tone", id));
    }
    Ok(tone)
}

pub async fn delete_tone<S>(store: &S, owner_id: &str, id: &str) -> Result<()>
where
    S: ToneStore + ?Sized,
{
    owned_tone(store, owner_id, id).await?;
    if !store.delete_tone(id, owner_id).await? {
        return Err(Error::not_found("Tone", id));
    }
    info!(tone_id = %id, "Custom tone deleted");
    Ok(())
}
