//! In-memory collaborators for embedding and tests.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{CacheError, LookupError};
use crate::traits::{CachedDuration, DurationCache, PlaceDetails, PlaceDirectory, PlaceId};

/// Place directory backed by a map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlaceDirectory {
    places: HashMap<PlaceId, PlaceDetails>,
}

impl InMemoryPlaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<PlaceId>, details: PlaceDetails) {
        self.places.insert(id.into(), details);
    }

    pub fn with_place(mut self, id: impl Into<PlaceId>, details: PlaceDetails) -> Self {
        self.insert(id, details);
        self
    }
}

impl PlaceDirectory for InMemoryPlaceDirectory {
    fn lookup(&self, ids: &[PlaceId]) -> Result<HashMap<PlaceId, PlaceDetails>, LookupError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.places.get(id).map(|details| (id.clone(), details.clone())))
            .collect())
    }
}

/// Thread-safe duration cache; concurrent upserts are last-writer-wins.
#[derive(Debug, Default)]
pub struct InMemoryDurationCache {
    entries: RwLock<HashMap<(PlaceId, PlaceId), f64>>,
}

impl InMemoryDurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn seconds(&self, source: &PlaceId, destination: &PlaceId) -> Option<f64> {
        self.entries
            .read()
            .get(&(source.clone(), destination.clone()))
            .copied()
    }
}

impl DurationCache for InMemoryDurationCache {
    fn get(&self, pairs: &[(PlaceId, PlaceId)]) -> Result<Vec<CachedDuration>, CacheError> {
        let entries = self.entries.read();
        Ok(pairs
            .iter()
            .filter_map(|pair| {
                entries.get(pair).map(|&seconds| CachedDuration {
                    source: pair.0.clone(),
                    destination: pair.1.clone(),
                    seconds,
                })
            })
            .collect())
    }

    fn upsert(&self, new_entries: &[CachedDuration]) -> Result<(), CacheError> {
        let mut entries = self.entries.write();
        for entry in new_entries {
            if entry.source == entry.destination {
                tracing::warn!(place_id = %entry.source, "skipping duration with identical source and destination");
                continue;
            }
            entries.insert((entry.source.clone(), entry.destination.clone()), entry.seconds);
        }
        Ok(())
    }
}
