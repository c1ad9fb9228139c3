//! Collaborator contracts for the planning core.
//!
//! Place metadata, the travel-duration cache and the distance-matrix service
//! live outside the core. Hosts implement these traits for their own stores;
//! [`crate::memory`], [`crate::mapbox`] and [`crate::haversine`] provide
//! ready-made implementations.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, LookupError, MatrixError};
use crate::ticks::{ClockTime, Tick};

/// Identifier of a place in the host's catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub String);

impl PlaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What the place directory knows about one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    /// Coordinates (lat, lng).
    pub location: (f64, f64),
    /// Opening time; `None` means open from midnight.
    pub opening: Option<ClockTime>,
    /// Closing time; `None` means open until midnight.
    pub closing: Option<ClockTime>,
    /// Typical stay for activities, in ticks.
    pub default_stay: Option<Tick>,
}

impl PlaceDetails {
    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            location: (lat, lng),
            opening: None,
            closing: None,
            default_stay: None,
        }
    }

    pub fn with_hours(mut self, opening: ClockTime, closing: ClockTime) -> Self {
        self.opening = Some(opening);
        self.closing = Some(closing);
        self
    }

    pub fn with_default_stay(mut self, stay: Tick) -> Self {
        self.default_stay = Some(stay);
        self
    }
}

/// Resolves place identifiers to metadata.
pub trait PlaceDirectory {
    /// Look up `ids`. Unknown ids are omitted from the result, not reported
    /// as errors.
    fn lookup(&self, ids: &[PlaceId]) -> Result<HashMap<PlaceId, PlaceDetails>, LookupError>;
}

/// A travel duration between two places, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedDuration {
    pub source: PlaceId,
    pub destination: PlaceId,
    pub seconds: f64,
}

/// Persistent store of pairwise travel durations keyed by (source, destination).
pub trait DurationCache {
    /// Return the cached entries among `pairs`; missing pairs are omitted.
    fn get(&self, pairs: &[(PlaceId, PlaceId)]) -> Result<Vec<CachedDuration>, CacheError>;

    /// Insert or overwrite entries. Re-inserting an unchanged value is a no-op.
    fn upsert(&self, entries: &[CachedDuration]) -> Result<(), CacheError>;
}

/// Provides travel durations (seconds) between coordinates.
///
/// The result has one row per entry of `sources` and one column per entry of
/// `destinations`, both indexing into `locations`. `None` marks a pair the
/// service could not route.
pub trait DistanceMatrixProvider {
    fn matrix_for(
        &self,
        locations: &[(f64, f64)],
        sources: &[usize],
        destinations: &[usize],
    ) -> Result<Vec<Vec<Option<f64>>>, MatrixError>;
}

/// Pipeline stage reported to a [`ProgressSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStage {
    Normalizing,
    BuildingMatrix,
    Solving,
    Formatting,
    Done,
}

/// Receives progress notifications from a planning call.
pub trait ProgressSink {
    fn report(&self, stage: PlanStage);
}

impl ProgressSink for () {
    fn report(&self, _stage: PlanStage) {}
}

impl ProgressSink for Sender<PlanStage> {
    fn report(&self, stage: PlanStage) {
        // A dropped receiver only means nobody is listening any more.
        let _ = self.send(stage);
    }
}
