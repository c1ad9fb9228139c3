//! Day-relative rendering of solved routes.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::itinerary::{NodeKind, NormalizedItinerary};
use crate::solver::RouteResult;
use crate::ticks::{self, ClockTime, MINUTES_PER_TICK, Tick};
use crate::traits::PlaceId;

/// A tick expressed as trip day and wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTime {
    /// One-based trip day.
    pub day: u32,
    pub time: ClockTime,
}

impl DayTime {
    pub fn from_tick(tick: Tick) -> Self {
        Self {
            day: ticks::day_of(tick),
            time: ticks::clock_of(tick),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedStop {
    pub node: usize,
    pub place_id: PlaceId,
    pub kind: NodeKind,
    pub arrival: DayTime,
    pub departure: DayTime,
    pub waiting: Tick,
    pub travel: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedRoute {
    pub stops: Vec<FormattedStop>,
    pub skipped: Vec<PlaceId>,
    pub total_time: Tick,
    pub total_waiting: Tick,
}

/// Attach place ids and day/clock times to every stop of `route`.
pub fn format_route(route: &RouteResult, itinerary: &NormalizedItinerary) -> FormattedRoute {
    let stops = route
        .stops
        .iter()
        .map(|stop| FormattedStop {
            node: stop.node,
            place_id: itinerary.place_of(stop.node).id.clone(),
            kind: stop.kind,
            arrival: DayTime::from_tick(stop.arrival),
            departure: DayTime::from_tick(stop.departure),
            waiting: stop.waiting,
            travel: stop.travel,
        })
        .collect();

    FormattedRoute {
        stops,
        skipped: route
            .skipped
            .iter()
            .map(|&node| itinerary.place_of(node).id.clone())
            .collect(),
        total_time: route.total_time,
        total_waiting: route.total_waiting,
    }
}

/// Ticks as `1d 2h 15m`, dropping leading zero units.
pub fn format_duration(ticks: Tick) -> String {
    let total_minutes = ticks * MINUTES_PER_TICK;
    let days = total_minutes / (24 * 60);
    let hours = total_minutes % (24 * 60) / 60;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// One line per stop followed by the route totals.
pub fn describe(route: &FormattedRoute) -> String {
    let mut out = String::new();
    for stop in &route.stops {
        let label = match stop.kind {
            NodeKind::Accommodation { .. } => " (accommodation)",
            NodeKind::Activity => "",
        };
        let _ = write!(
            out,
            "Day {} {} → {} {}{}",
            stop.arrival.day, stop.arrival.time, stop.departure.time, stop.place_id, label
        );
        if stop.departure.day != stop.arrival.day {
            let _ = write!(out, " [leaves day {}]", stop.departure.day);
        }
        let _ = writeln!(
            out,
            " (wait {}, travel {})",
            format_duration(stop.waiting),
            format_duration(stop.travel)
        );
    }

    if !route.skipped.is_empty() {
        let skipped: Vec<&str> = route.skipped.iter().map(PlaceId::as_str).collect();
        let _ = writeln!(out, "Skipped: {}", skipped.join(", "));
    }
    let _ = writeln!(out, "Total time: {}", format_duration(route.total_time));
    let _ = write!(out, "Total waiting: {}", format_duration(route.total_waiting));
    out
}
