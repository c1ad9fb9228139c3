//! Test fixtures for itinerary-planner.
//!
//! Provides realistic test data including:
//! - Real Phuket hotel and attraction locations (from OpenStreetMap)
//! - Builders for trips and activities
//! - Mock distance matrix providers

#![allow(dead_code)]

pub mod phuket_places;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use itinerary_planner::error::MatrixError;
use itinerary_planner::itinerary::{
    AccommodationRequest, ActivityRequest, ItineraryRequest, SleepWindow, VisitWindow,
};
use itinerary_planner::ticks::Tick;
use itinerary_planner::traits::{DistanceMatrixProvider, PlaceId};

pub use phuket_places::*;

// ============================================================================
// Request Builders
// ============================================================================

/// Builder for activity requests with sensible defaults (optional, 2h stay).
#[derive(Clone, Debug)]
pub struct TestActivity {
    place_id: PlaceId,
    stay: Option<Tick>,
    windows: Vec<VisitWindow>,
    mandatory: bool,
}

impl TestActivity {
    pub fn new(id: &str) -> Self {
        Self {
            place_id: PlaceId::new(id),
            stay: None,
            windows: Vec::new(),
            mandatory: false,
        }
    }

    pub fn stay(mut self, ticks: Tick) -> Self {
        self.stay = Some(ticks);
        self
    }

    /// Window applying to every trip day.
    pub fn window(mut self, start: Tick, end: Tick) -> Self {
        self.windows.push(VisitWindow::every_day(start, end));
        self
    }

    /// Window applying to one zero-based trip day.
    pub fn window_on(mut self, day: u32, start: Tick, end: Tick) -> Self {
        self.windows.push(VisitWindow::on_day(day, start, end));
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn build(self) -> ActivityRequest {
        let windows = if self.windows.is_empty() {
            vec![VisitWindow::every_day(0, 96)]
        } else {
            self.windows
        };
        ActivityRequest {
            place_id: self.place_id,
            stay_duration: self.stay,
            visit_windows: windows,
            mandatory: self.mandatory,
        }
    }
}

/// Builder for whole trip requests.
#[derive(Clone, Debug)]
pub struct TestTrip {
    accommodation: PlaceId,
    nights: Vec<SleepWindow>,
    activities: Vec<ActivityRequest>,
}

impl TestTrip {
    pub fn new(accommodation: &str) -> Self {
        Self {
            accommodation: PlaceId::new(accommodation),
            nights: Vec::new(),
            activities: Vec::new(),
        }
    }

    /// A trip of `days` days sleeping 22:00 to 07:00.
    pub fn days(accommodation: &str, days: usize) -> Self {
        (0..days).fold(Self::new(accommodation), |trip, _| trip.night(88, 28))
    }

    pub fn night(mut self, start: Tick, end: Tick) -> Self {
        self.nights.push(SleepWindow { start, end });
        self
    }

    pub fn activity(mut self, activity: TestActivity) -> Self {
        self.activities.push(activity.build());
        self
    }

    pub fn build(self) -> ItineraryRequest {
        ItineraryRequest {
            accommodation: AccommodationRequest {
                place_id: self.accommodation,
                sleep_windows: self.nights,
            },
            activities: self.activities,
        }
    }
}

// ============================================================================
// Mock Distance Matrix Providers
// ============================================================================

/// Same travel time for every distinct pair; counts requests.
#[derive(Clone, Debug)]
pub struct FixedMatrix {
    pub seconds: f64,
    pub calls: Arc<AtomicUsize>,
    pub pairs_requested: Arc<AtomicUsize>,
}

impl FixedMatrix {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds,
            calls: Arc::new(AtomicUsize::new(0)),
            pairs_requested: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pairs_requested(&self) -> usize {
        self.pairs_requested.load(Ordering::SeqCst)
    }
}

impl DistanceMatrixProvider for FixedMatrix {
    fn matrix_for(
        &self,
        _locations: &[(f64, f64)],
        sources: &[usize],
        destinations: &[usize],
    ) -> Result<Vec<Vec<Option<f64>>>, MatrixError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pairs_requested
            .fetch_add(sources.len() * destinations.len(), Ordering::SeqCst);
        Ok(sources
            .iter()
            .map(|&from| {
                destinations
                    .iter()
                    .map(|&to| Some(if from == to { 0.0 } else { self.seconds }))
                    .collect()
            })
            .collect())
    }
}

/// Always fails, as a quota-exhausted or unreachable service would.
#[derive(Clone, Debug, Default)]
pub struct FailingMatrix;

impl DistanceMatrixProvider for FailingMatrix {
    fn matrix_for(
        &self,
        _locations: &[(f64, f64)],
        _sources: &[usize],
        _destinations: &[usize],
    ) -> Result<Vec<Vec<Option<f64>>>, MatrixError> {
        Err(MatrixError::Service {
            code: "ProfileNotFound".to_string(),
            message: "quota exhausted".to_string(),
        })
    }
}

/// Manhattan distance on the coordinates; 1 degree = 1 hour.
#[derive(Clone, Debug, Default)]
pub struct ManhattanMatrix;

impl DistanceMatrixProvider for ManhattanMatrix {
    fn matrix_for(
        &self,
        locations: &[(f64, f64)],
        sources: &[usize],
        destinations: &[usize],
    ) -> Result<Vec<Vec<Option<f64>>>, MatrixError> {
        Ok(sources
            .iter()
            .map(|&from| {
                destinations
                    .iter()
                    .map(|&to| {
                        let (a, b) = (locations[from], locations[to]);
                        Some(((a.0 - b.0).abs() + (a.1 - b.1).abs()) * 3600.0)
                    })
                    .collect()
            })
            .collect())
    }
}
