//! itinerary-planner core
//!
//! Turns a multi-day trip request (an accommodation with nightly sleep windows
//! and a list of activities with visit windows) into a single-traveller
//! schedule on a quarter-hour timeline.

pub mod domain;
pub mod error;
pub mod format;
pub mod haversine;
pub mod interval;
pub mod itinerary;
pub mod mapbox;
pub mod matrix;
pub mod memory;
pub mod planner;
pub mod solver;
pub mod ticks;
pub mod traits;

pub use error::{PlannerError, ValidationError};
pub use itinerary::{ItineraryRequest, NormalizedItinerary, normalize};
pub use planner::{ItineraryPlanner, PlanResult};
pub use solver::{RouteResult, SolveOptions, SolveOutcome, solve};
pub use ticks::Tick;
