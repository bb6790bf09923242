//! Tone resolution: maps a tone identifier to a canonical descriptor.
//!
//! An identifier may be a stored tone's primary key or a display name.
//! Lookup strategies run in order; the first hit wins. When every strategy
//! misses, the identifier itself becomes the tone name with no parameters.
//! Resolution never fails: a store error is logged and treated as a miss.

use toneshift_core::store::ToneStore;
use toneshift_core::{Tone, ToneDescriptor};
use tracing::{debug, warn};

/// One way of finding a stored tone for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Exact match on the tone id.
    PrimaryKey,
    /// Case-insensitive match on the tone name.
    CaseInsensitiveName,
}

impl LookupStrategy {
    /// The order strategies are tried in.
    pub const ORDER: [LookupStrategy; 2] = [Self::PrimaryKey, Self::CaseInsensitiveName];

    async fn lookup<S>(
        self,
        store: &S,
        identifier: &str,
        viewer_id: &str,
    ) -> Result<Option<Tone>, toneshift_core::StoreError>
    where
        S: ToneStore + ?Sized,
    {
        match self {
            Self::PrimaryKey => Ok(store
                .find_tone_by_id(identifier)
                .await?
                .filter(|t| t.visible_to(viewer_id))),
            Self::CaseInsensitiveName => store.find_tone_by_name(identifier, viewer_id).await,
        }
    }
}

/// Resolves tone identifiers on behalf of one user.
pub struct ToneResolver<'a, S: ?Sized> {
    store: &'a S,
    viewer_id: &'a str,
}

impl<'a, S> ToneResolver<'a, S>
where
    S: ToneStore + ?Sized,
{
    pub fn new(store: &'a S, viewer_id: &'a str) -> Self {
        Self { store, viewer_id }
    }

    /// Resolve `identifier` to a descriptor. Infallible by signature.
    pub async fn resolve(&self, identifier: &str) -> ToneDescriptor {
        for strategy in LookupStrategy::ORDER {
            match strategy.lookup(self.store, identifier, self.viewer_id).await {
                Ok(Some(tone)) => {
                    debug!(tone = %identifier, ?strategy, resolved = %tone.name, "Tone resolved");
                    return tone.descriptor();
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(tone = %identifier, ?strategy, error = %e, "Tone lookup failed, skipping");
                }
            }
        }
        debug!(tone = %identifier, "No stored tone, using raw label");
        ToneDescriptor::raw(identifier)
    }
}
