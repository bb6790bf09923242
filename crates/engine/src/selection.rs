//! Tone-list selection for multi-tone requests.
//!
//! A present-but-empty tone list is filled from, in order: the linked
//! relationship's preferred tones, the user's default tones, the
//! configured fallback list. The first non-empty source wins.

use toneshift_core::{Relationship, User};

/// Where the tone list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneSource {
    Requested,
    RelationshipPreferred,
    UserDefaults,
    Configured,
}

impl ToneSource {
    /// Sources in priority order.
    pub const ORDER: [ToneSource; 4] = [
        Self::Requested,
        Self::RelationshipPreferred,
        Self::UserDefaults,
        Self::Configured,
    ];

    fn candidate<'a>(self, inputs: &SelectionInputs<'a>) -> Option<&'a [String]> {
        let list: &[String] = match self {
            Self::Requested => inputs.requested,
            Self::RelationshipPreferred => &inputs.relationship?.preferred_tones,
            Self::UserDefaults => &inputs.user?.preferences.default_tones,
            Self::Configured => inputs.fallback,
        };
        (!list.is_empty()).then_some(list)
    }
}

/// Everything the fallback chain may draw from.
#[derive(Debug, Clone, Copy)]
pub struct SelectionInputs<'a> {
    pub requested: &'a [String],
    pub relationship: Option<&'a Relationship>,
    pub user: Option<&'a User>,
    pub fallback: &'a [String],
}

/// The chosen tone list and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneSelection {
    pub tones: Vec<String>,
    pub source: ToneSource,
}

/// Walk the fallback chain. `None` only when every source is empty.
pub fn select_tones(inputs: &SelectionInputs<'_>) -> Option<ToneSelection> {
    ToneSource::ORDER.into_iter().find_map(|source| {
        source.candidate(inputs).map(|tones| ToneSelection {
            tones: tones.to_vec(),
            source,
        })
    })
}
