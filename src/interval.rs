//! Interval algebra over tick ranges.

use serde::{Deserialize, Serialize};

use crate::ticks::Tick;

/// A closed tick range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: Tick,
    pub end: Tick,
}

impl Interval {
    pub const fn new(start: Tick, end: Tick) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> Tick {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(&self, tick: Tick) -> bool {
        self.start <= tick && tick <= self.end
    }

    /// Shift both bounds by `offset` ticks.
    pub const fn offset(&self, offset: Tick) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl From<(Tick, Tick)> for Interval {
    fn from((start, end): (Tick, Tick)) -> Self {
        Self { start, end }
    }
}

/// Minimal sorted cover of `intervals`.
///
/// Touching intervals (`next.start == last.end`) are merged.
pub fn union(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|interval| interval.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for current in sorted {
        match merged.last_mut() {
            Some(last) if current.start <= last.end => {
                last.end = last.end.max(current.end);
            }
            _ => merged.push(current),
        }
    }
    merged
}

/// Overlap of two intervals. Zero-length overlaps count as no intersection.
pub fn intersect(a: Interval, b: Interval) -> Option<Interval> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start < end).then_some(Interval { start, end })
}

/// Intersect `window` with every member of `union(intervals)`.
pub fn intersect_all(window: Interval, intervals: &[Interval]) -> Vec<Interval> {
    union(intervals)
        .into_iter()
        .filter_map(|interval| intersect(window, interval))
        .collect()
}
