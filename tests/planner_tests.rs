//! Planner pipeline tests
//!
//! Tests for request decoding, dropped activities, collaborator failures,
//! cache reuse and progress reporting.

mod fixtures;

use std::collections::HashMap;
use std::sync::mpsc;

use fixtures::{FailingMatrix, FixedMatrix, HOTEL, TestActivity, TestTrip, directory};
use itinerary_planner::error::{LookupError, PlannerError, ValidationError};
use itinerary_planner::itinerary::{DropReason, ItineraryRequest};
use itinerary_planner::memory::{InMemoryDurationCache, InMemoryPlaceDirectory};
use itinerary_planner::planner::ItineraryPlanner;
use itinerary_planner::solver::{SolveOptions, SolveOutcome};
use itinerary_planner::traits::{PlaceDetails, PlaceDirectory, PlaceId, PlanStage};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Ten minutes between any two distinct places (one tick).
fn planner(
    provider: FixedMatrix,
) -> ItineraryPlanner<InMemoryPlaceDirectory, InMemoryDurationCache, FixedMatrix> {
    ItineraryPlanner::new(directory(), InMemoryDurationCache::new(), provider)
}

fn failing_planner() -> ItineraryPlanner<InMemoryPlaceDirectory, InMemoryDurationCache, FailingMatrix> {
    ItineraryPlanner::new(directory(), InMemoryDurationCache::new(), FailingMatrix)
}

/// Directory that must never be consulted.
struct UnreachableDirectory;

impl PlaceDirectory for UnreachableDirectory {
    fn lookup(&self, _ids: &[PlaceId]) -> Result<HashMap<PlaceId, PlaceDetails>, LookupError> {
        panic!("validation errors must be raised before any lookup");
    }
}

/// Directory whose backing store is down.
struct BrokenDirectory;

impl PlaceDirectory for BrokenDirectory {
    fn lookup(&self, _ids: &[PlaceId]) -> Result<HashMap<PlaceId, PlaceDetails>, LookupError> {
        Err(LookupError("connection refused".to_string()))
    }
}

fn one_day_request() -> ItineraryRequest {
    serde_json::from_str(
        r#"{
            "accommodation": {
                "place_id": "H0001",
                "sleep_windows": [{ "start": 88, "end": 28 }]
            },
            "activities": [
                {
                    "place_id": "A0002",
                    "stay_duration": 4,
                    "visit_windows": [{ "start": 36, "end": 64 }],
                    "mandatory": true
                },
                {
                    "place_id": "A9999",
                    "visit_windows": [{ "start": 36, "end": 64 }]
                }
            ]
        }"#,
    )
    .expect("request JSON should decode")
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[test]
fn test_plan_from_json_request() {
    let result = planner(FixedMatrix::new(600.0)).plan(&one_day_request()).unwrap();

    assert!(result.is_found());
    assert_eq!(result.unknown_arcs, 0);

    let route = result.route.as_ref().unwrap();
    let ids: Vec<&str> = route.stops.iter().map(|stop| stop.place_id.as_str()).collect();
    assert_eq!(ids, vec!["H0001", "A0002", "H0001"]);

    // Leaves the hotel at 08:45 and reaches Wat Chalong as the window opens.
    let visit = &route.stops[1];
    assert_eq!(visit.arrival.day, 1);
    assert_eq!(visit.arrival.time.to_string(), "09:00");
    assert_eq!(visit.departure.time.to_string(), "10:00");
    assert_eq!(visit.waiting, 0);
    assert_eq!(visit.travel, 1);
}

#[test]
fn test_unresolved_activity_is_dropped() {
    let result = planner(FixedMatrix::new(600.0)).plan(&one_day_request()).unwrap();

    assert_eq!(result.itinerary.dropped.len(), 1);
    assert_eq!(result.itinerary.dropped[0].place_id.as_str(), "A9999");
    assert_eq!(result.itinerary.dropped[0].reason, DropReason::Unresolved);
    assert_eq!(result.itinerary.nodes.len(), 2);
}

#[test]
fn test_activity_without_open_window_is_dropped() {
    // Bangla Road opens at 18:00; the request only allows mornings.
    let request = TestTrip::days(HOTEL.id, 1)
        .activity(TestActivity::new("A0008").window(36, 48))
        .activity(TestActivity::new("A0003").window(36, 48))
        .build();

    let result = planner(FixedMatrix::new(600.0)).plan(&request).unwrap();

    assert_eq!(result.itinerary.dropped.len(), 1);
    assert_eq!(result.itinerary.dropped[0].place_id.as_str(), "A0008");
    assert_eq!(result.itinerary.dropped[0].reason, DropReason::NoFeasibleWindow);
    assert!(result.is_found());
}

#[test]
fn test_zero_activities_route_only_visits_hotel() {
    let request = TestTrip::days(HOTEL.id, 2).build();

    let result = planner(FixedMatrix::new(600.0)).plan(&request).unwrap();

    let route = result.route.as_ref().expect("hotel-only route");
    assert_eq!(route.stops.len(), 3);
    assert!(route.stops.iter().all(|stop| stop.place_id.as_str() == HOTEL.id));
    assert_eq!(result.unknown_arcs, 0);
}

#[test]
fn test_every_day_activity_moves_to_day_two_for_later_stop() {
    // Old Town fits any morning; Kata Beach is only open in the afternoon of
    // day 2, too late to reach after a day-1 visit within the waiting bound.
    let request = TestTrip::days(HOTEL.id, 2)
        .activity(TestActivity::new("A0003").window(36, 44).stay(4).mandatory())
        .activity(TestActivity::new("A0006").window_on(1, 60, 72).stay(4).mandatory())
        .build();

    let result = planner(FixedMatrix::new(600.0)).plan(&request).unwrap();
    assert!(result.is_found(), "outcome: {:?}", result.outcome);

    let route = result.route.as_ref().unwrap();
    let ids: Vec<&str> = route.stops.iter().map(|stop| stop.place_id.as_str()).collect();
    assert_eq!(ids, vec!["H0001", "H0001", "A0003", "A0006", "H0001"]);

    let old_town = &route.stops[2];
    assert_eq!(old_town.arrival.day, 2);
    assert_eq!(old_town.arrival.time.to_string(), "09:00");
    assert!(route.stops.iter().all(|stop| stop.waiting <= 24));
}

#[test]
fn test_formatted_route_serializes() {
    let result = planner(FixedMatrix::new(600.0)).plan(&one_day_request()).unwrap();

    let json = serde_json::to_value(&result.route).unwrap();
    assert_eq!(json["stops"][1]["place_id"], "A0002");
    assert_eq!(json["stops"][1]["arrival"]["time"], "09:00");
    assert_eq!(json["stops"][1]["kind"]["kind"], "Activity");
}

// ============================================================================
// Error Tests
// ============================================================================

#[test]
fn test_missing_accommodation_is_fatal() {
    let request = TestTrip::days("H9999", 1)
        .activity(TestActivity::new("A0002"))
        .build();

    let err = planner(FixedMatrix::new(600.0)).plan(&request).unwrap_err();
    assert!(matches!(err, PlannerError::AccommodationNotFound(id) if id.as_str() == "H9999"));
}

#[test]
fn test_validation_happens_before_lookup() {
    let request = TestTrip::new(HOTEL.id).build();
    let planner = ItineraryPlanner::new(UnreachableDirectory, InMemoryDurationCache::new(), FixedMatrix::new(600.0));

    let err = planner.plan(&request).unwrap_err();
    assert!(matches!(err, PlannerError::Validation(ValidationError::NoDays)));
}

#[test]
fn test_lookup_failure_is_fatal() {
    let request = TestTrip::days(HOTEL.id, 1).build();
    let planner = ItineraryPlanner::new(BrokenDirectory, InMemoryDurationCache::new(), FixedMatrix::new(600.0));

    assert!(matches!(planner.plan(&request), Err(PlannerError::Lookup(_))));
}

// ============================================================================
// Degraded Matrix Tests
// ============================================================================

#[test]
fn test_matrix_failure_skips_optional_activity() {
    let request = TestTrip::days(HOTEL.id, 1)
        .activity(TestActivity::new("A0003").window(36, 60))
        .build();

    let result = failing_planner().plan(&request).unwrap();

    assert!(result.unknown_arcs > 0);
    let route = result.route.as_ref().expect("hotel-only route survives");
    assert_eq!(route.skipped, vec![PlaceId::new("A0003")]);
}

#[test]
fn test_matrix_failure_with_mandatory_activity_reports_unplaced() {
    let request = TestTrip::days(HOTEL.id, 1)
        .activity(TestActivity::new("A0003").window(36, 60).mandatory())
        .build();

    let result = failing_planner().plan(&request).unwrap();

    assert!(matches!(result.outcome, SolveOutcome::Infeasible { .. }));
    assert!(result.route.is_none());
    assert_eq!(result.unplaced_places(), vec![&PlaceId::new("A0003")]);
}

// ============================================================================
// Cache and Options Tests
// ============================================================================

#[test]
fn test_second_plan_is_served_from_cache() {
    let provider = FixedMatrix::new(600.0);
    let planner = planner(provider.clone());
    let request = one_day_request();

    planner.plan(&request).unwrap();
    assert_eq!(provider.calls(), 1);
    assert_eq!(planner.cache().len(), 2);

    planner.plan(&request).unwrap();
    assert_eq!(provider.calls(), 1);
}

#[test]
fn test_options_deserialize_with_defaults() {
    let options: SolveOptions = serde_json::from_str(r#"{ "skip_penalty": 50 }"#).unwrap();

    assert_eq!(options.skip_penalty, 50);
    assert_eq!(options.max_slack, 24);
    assert_eq!(options.parallel_starts, SolveOptions::default().parallel_starts);
}

#[test]
fn test_options_reach_the_solver() {
    let request = TestTrip::days(HOTEL.id, 1)
        .activity(TestActivity::new("A0003").window(36, 60))
        .build();
    let planner = planner(FixedMatrix::new(600.0)).with_options(SolveOptions::default().with_skip_penalty(0));

    let result = planner.plan(&request).unwrap();
    let route = result.outcome.route().unwrap();
    assert_eq!(route.skipped, vec![1]);
    assert_eq!(route.cost, 0);
}

// ============================================================================
// Progress Tests
// ============================================================================

#[test]
fn test_progress_stages_in_order() {
    let (tx, rx) = mpsc::channel::<PlanStage>();
    let planner = planner(FixedMatrix::new(600.0));

    planner.plan_with_progress(&one_day_request(), &tx).unwrap();
    drop(tx);

    let stages: Vec<PlanStage> = rx.iter().collect();
    assert_eq!(
        stages,
        vec![
            PlanStage::Normalizing,
            PlanStage::BuildingMatrix,
            PlanStage::Solving,
            PlanStage::Formatting,
            PlanStage::Done,
        ]
    );
}

#[test]
fn test_progress_stops_at_failure() {
    let (tx, rx) = mpsc::channel::<PlanStage>();
    let request = TestTrip::days("H9999", 1).build();

    let result = planner(FixedMatrix::new(600.0)).plan_with_progress(&request, &tx);
    drop(tx);

    assert!(result.is_err());
    assert_eq!(rx.iter().collect::<Vec<_>>(), vec![PlanStage::Normalizing]);
}
