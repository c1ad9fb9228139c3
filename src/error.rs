//! Error taxonomy for the planning pipeline.
//!
//! Infeasible or timed-out searches are not errors; they are reported through
//! [`crate::solver::SolveOutcome`].

use thiserror::Error;

use crate::traits::PlaceId;

/// Malformed request. Raised before any collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("accommodation place id is empty")]
    MissingAccommodation,
    #[error("at least one sleep window is required")]
    NoDays,
    #[error("sleep window for day {day} has out-of-range bounds [{start}, {end}]")]
    SleepWindow { day: usize, start: i32, end: i32 },
    #[error("activity #{index} has an empty place id")]
    MissingActivityId { index: usize },
    #[error("activity {0} is listed more than once")]
    DuplicateActivity(PlaceId),
    #[error("activity {0} has no visit windows")]
    NoVisitWindows(PlaceId),
    #[error("activity {place_id} has invalid visit window [{start}, {end}]")]
    VisitWindow { place_id: PlaceId, start: i32, end: i32 },
    #[error("activity {place_id} requests day {day} but the trip has {days} days")]
    DayOutOfRange { place_id: PlaceId, day: u32, days: usize },
    #[error("activity {0} has a negative stay duration")]
    NegativeStay(PlaceId),
}

/// Place metadata collaborator failure.
#[derive(Debug, Error)]
#[error("place lookup failed: {0}")]
pub struct LookupError(pub String);

/// Duration cache collaborator failure.
#[derive(Debug, Error)]
#[error("duration cache failed: {0}")]
pub struct CacheError(pub String);

/// Distance-matrix collaborator failure.
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("distance matrix request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("distance matrix service answered {code}: {message}")]
    Service { code: String, message: String },
    #[error("distance matrix response has no durations")]
    MissingDurations,
    #[error("distance matrix response is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    Shape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("distance matrix provider is not configured: {0}")]
    Config(String),
}

/// Fatal pipeline error.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("accommodation {0} could not be resolved")]
    AccommodationNotFound(PlaceId),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}
