//! Itinerary requests and their normalization into solver nodes.
//!
//! A request names one accommodation with a sleep window per trip day and a
//! pool of candidate activities. Normalization resolves every place through
//! the [`PlaceDirectory`], flattens per-day visit windows onto the trip-wide
//! tick timeline, intersects them with business hours and trims each window by
//! the required stay so that a visit entered inside a window always finishes
//! before closing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PlannerError, ValidationError};
use crate::interval::{self, Interval};
use crate::ticks::{self, TICKS_PER_DAY, Tick};
use crate::traits::{PlaceDetails, PlaceDirectory, PlaceId};

/// Stay used when neither the request nor the directory provides one (2h).
pub const DEFAULT_STAY: Tick = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub accommodation: AccommodationRequest,
    #[serde(default)]
    pub activities: Vec<ActivityRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccommodationRequest {
    pub place_id: PlaceId,
    /// One entry per trip day, see [`SleepWindow`].
    pub sleep_windows: Vec<SleepWindow>,
}

/// The night that ends on the morning of its day, in day-clock ticks.
///
/// `start` is bedtime and `end` is wake-up. When `end <= start` the night
/// crosses midnight and `start` belongs to the previous day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepWindow {
    pub start: Tick,
    pub end: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRequest {
    pub place_id: PlaceId,
    /// Stay in ticks; falls back to the directory default, then [`DEFAULT_STAY`].
    #[serde(default)]
    pub stay_duration: Option<Tick>,
    pub visit_windows: Vec<VisitWindow>,
    #[serde(default)]
    pub mandatory: bool,
}

/// A candidate visit window in day-clock ticks.
///
/// Without a `day` the window applies to every day of the trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitWindow {
    #[serde(default)]
    pub day: Option<u32>,
    pub start: Tick,
    pub end: Tick,
}

impl VisitWindow {
    pub const fn every_day(start: Tick, end: Tick) -> Self {
        Self {
            day: None,
            start,
            end,
        }
    }

    pub const fn on_day(day: u32, start: Tick, end: Tick) -> Self {
        Self {
            day: Some(day),
            start,
            end,
        }
    }

    fn applies_to(&self, day: usize) -> bool {
        self.day.is_none_or(|requested| requested as usize == day)
    }
}

impl ItineraryRequest {
    pub fn days(&self) -> usize {
        self.accommodation.sleep_windows.len()
    }

    pub fn horizon(&self) -> Tick {
        self.days() as Tick * TICKS_PER_DAY
    }

    /// Check the request shape. Performs no lookups.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.accommodation.place_id.as_str().trim().is_empty() {
            return Err(ValidationError::MissingAccommodation);
        }
        let days = self.days();
        if days == 0 {
            return Err(ValidationError::NoDays);
        }

        for (day, window) in self.accommodation.sleep_windows.iter().enumerate() {
            let in_range = (0..=TICKS_PER_DAY).contains(&window.start)
                && (0..=TICKS_PER_DAY).contains(&window.end);
            if !in_range || window.start == window.end {
                return Err(ValidationError::SleepWindow {
                    day,
                    start: window.start,
                    end: window.end,
                });
            }
        }
        for day in 0..days {
            let awake = self.awake_period(day);
            if awake.end < awake.start {
                let window = self.accommodation.sleep_windows[day];
                return Err(ValidationError::SleepWindow {
                    day,
                    start: window.start,
                    end: window.end,
                });
            }
        }

        let mut seen = HashSet::new();
        seen.insert(&self.accommodation.place_id);
        for (index, activity) in self.activities.iter().enumerate() {
            let place_id = &activity.place_id;
            if place_id.as_str().trim().is_empty() {
                return Err(ValidationError::MissingActivityId { index });
            }
            if !seen.insert(place_id) {
                return Err(ValidationError::DuplicateActivity(place_id.clone()));
            }
            if activity.stay_duration.is_some_and(|stay| stay < 0) {
                return Err(ValidationError::NegativeStay(place_id.clone()));
            }
            if activity.visit_windows.is_empty() {
                return Err(ValidationError::NoVisitWindows(place_id.clone()));
            }
            for window in &activity.visit_windows {
                if window.start < 0 || window.end > TICKS_PER_DAY || window.start >= window.end {
                    return Err(ValidationError::VisitWindow {
                        place_id: place_id.clone(),
                        start: window.start,
                        end: window.end,
                    });
                }
                if let Some(day) = window.day {
                    if day as usize >= days {
                        return Err(ValidationError::DayOutOfRange {
                            place_id: place_id.clone(),
                            day,
                            days,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Sleep period ending on the morning of `day`, in absolute ticks.
    fn sleep_period(&self, day: usize) -> Interval {
        let window = self.accommodation.sleep_windows[day];
        let base = day as Tick * TICKS_PER_DAY;
        let start = if window.end <= window.start {
            base + window.start - TICKS_PER_DAY
        } else {
            base + window.start
        };
        Interval::new(start.max(0), base + window.end)
    }

    /// Time between waking up on `day` and going to bed that night.
    fn awake_period(&self, day: usize) -> Interval {
        let wake = self.sleep_period(day).end;
        let bedtime = if day + 1 < self.days() {
            self.sleep_period(day + 1).start
        } else {
            self.horizon()
        };
        Interval::new(wake, bedtime)
    }
}

/// A resolved place. Accommodation occurrences share one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub location: (f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum NodeKind {
    /// Return to the accommodation. Occurrence 0 is the trip start; occurrence
    /// `k` is the night between day `k - 1` and day `k`.
    Accommodation { occurrence: usize },
    Activity,
}

/// A schedulable visit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Index into [`NormalizedItinerary::places`].
    pub place: usize,
    pub kind: NodeKind,
    /// Sorted, disjoint entry windows in absolute ticks.
    pub windows: Vec<Interval>,
    /// Ticks spent at the node once entered.
    pub service: Tick,
    pub mandatory: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The place directory does not know the id.
    Unresolved,
    /// No requested window survives business hours and the stay duration.
    NoFeasibleWindow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedActivity {
    pub place_id: PlaceId,
    pub reason: DropReason,
}

/// Solver-ready view of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItinerary {
    pub days: usize,
    /// Unique places; the accommodation is always index 0.
    pub places: Vec<Place>,
    /// Accommodation occurrences (one per day) followed by surviving activities.
    pub nodes: Vec<Node>,
    pub dropped: Vec<DroppedActivity>,
}

impl NormalizedItinerary {
    pub fn horizon(&self) -> Tick {
        self.days as Tick * TICKS_PER_DAY
    }

    pub fn place_of(&self, node: usize) -> &Place {
        &self.places[self.nodes[node].place]
    }

    /// Place id per node, with the accommodation repeated once per day.
    pub fn place_ids(&self) -> Vec<&PlaceId> {
        self.nodes.iter().map(|node| &self.places[node.place].id).collect()
    }

    /// Places in node order, as consumed by the duration matrix builder.
    pub fn node_places(&self) -> Vec<&Place> {
        self.nodes.iter().map(|node| &self.places[node.place]).collect()
    }

    pub fn windows(&self) -> Vec<&[Interval]> {
        self.nodes.iter().map(|node| node.windows.as_slice()).collect()
    }

    pub fn services(&self) -> Vec<Tick> {
        self.nodes.iter().map(|node| node.service).collect()
    }

    pub fn mandatory_flags(&self) -> Vec<bool> {
        self.nodes.iter().map(|node| node.mandatory).collect()
    }
}

/// Validate `request`, resolve its places and build the solver node list.
pub fn normalize<D>(request: &ItineraryRequest, directory: &D) -> Result<NormalizedItinerary, PlannerError>
where
    D: PlaceDirectory + ?Sized,
{
    request.validate()?;

    let accommodation_id = &request.accommodation.place_id;
    let mut ids = Vec::with_capacity(request.activities.len() + 1);
    ids.push(accommodation_id.clone());
    ids.extend(request.activities.iter().map(|activity| activity.place_id.clone()));

    let details = directory.lookup(&ids)?;
    let accommodation = details
        .get(accommodation_id)
        .ok_or_else(|| PlannerError::AccommodationNotFound(accommodation_id.clone()))?;

    let days = request.days();
    let mut places = vec![Place {
        id: accommodation_id.clone(),
        location: accommodation.location,
    }];
    let mut nodes = accommodation_nodes(request);
    let mut dropped = Vec::new();

    for activity in &request.activities {
        let Some(place) = details.get(&activity.place_id) else {
            warn!(place_id = %activity.place_id, "activity not found in place directory, dropping");
            dropped.push(DroppedActivity {
                place_id: activity.place_id.clone(),
                reason: DropReason::Unresolved,
            });
            continue;
        };

        let windows = activity_windows(activity, place, days);
        if windows.is_empty() {
            warn!(place_id = %activity.place_id, "activity has no feasible visit window, dropping");
            dropped.push(DroppedActivity {
                place_id: activity.place_id.clone(),
                reason: DropReason::NoFeasibleWindow,
            });
            continue;
        }
        debug!(place_id = %activity.place_id, ?windows, "activity windows");

        nodes.push(Node {
            place: places.len(),
            kind: NodeKind::Activity,
            windows,
            service: stay_for(activity, place),
            mandatory: activity.mandatory,
        });
        places.push(Place {
            id: activity.place_id.clone(),
            location: place.location,
        });
    }

    Ok(NormalizedItinerary {
        days,
        places,
        nodes,
        dropped,
    })
}

fn stay_for(activity: &ActivityRequest, place: &PlaceDetails) -> Tick {
    activity
        .stay_duration
        .or(place.default_stay)
        .unwrap_or(DEFAULT_STAY)
}

/// Entry windows for an activity across the whole trip.
fn activity_windows(activity: &ActivityRequest, place: &PlaceDetails, days: usize) -> Vec<Interval> {
    let business = ticks::business_hours_to_ticks(place.opening, place.closing);
    let stay = stay_for(activity, place);

    let mut per_day = Vec::new();
    for day in 0..days {
        let requested: Vec<Interval> = activity
            .visit_windows
            .iter()
            .filter(|window| window.applies_to(day))
            .map(|window| Interval::new(window.start, window.end))
            .collect();
        if requested.is_empty() {
            continue;
        }
        let offset = day as Tick * TICKS_PER_DAY;
        per_day.extend(
            interval::intersect_all(business, &requested)
                .into_iter()
                .map(|window| window.offset(offset)),
        );
    }

    interval::union(&per_day)
        .into_iter()
        .map(|window| Interval::new(window.start, window.end - stay))
        .filter(|window| window.end >= window.start)
        .collect()
}

/// One accommodation node per day.
fn accommodation_nodes(request: &ItineraryRequest) -> Vec<Node> {
    let days = request.days();
    let horizon = request.horizon();
    let last_wake = request.awake_period(days - 1).start;

    let mut nodes = Vec::with_capacity(days);
    nodes.push(Node {
        place: 0,
        kind: NodeKind::Accommodation { occurrence: 0 },
        windows: interval::union(&[request.awake_period(0), Interval::new(last_wake, horizon)]),
        service: 0,
        mandatory: true,
    });
    for occurrence in 1..days {
        nodes.push(Node {
            place: 0,
            kind: NodeKind::Accommodation { occurrence },
            windows: vec![request.awake_period(occurrence - 1)],
            service: request.sleep_period(occurrence).len(),
            mandatory: true,
        });
    }
    nodes
}
