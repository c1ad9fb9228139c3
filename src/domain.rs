//! Integer time domains with removable sub-ranges.
//!
//! A node with several disjoint visit windows is modelled as one contiguous
//! range `[first.start, last.end]` with each gap between consecutive windows
//! punched out, so "arrive inside one of the windows" reduces to domain
//! membership.

use crate::interval::Interval;
use crate::ticks::Tick;

/// Sorted, disjoint, closed tick ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeDomain {
    ranges: Vec<Interval>,
}

impl TimeDomain {
    /// The closed range `[min, max]`; empty when `max < min`.
    pub fn new(min: Tick, max: Tick) -> Self {
        let ranges = if max < min {
            Vec::new()
        } else {
            vec![Interval::new(min, max)]
        };
        Self { ranges }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Domain admitting exactly the ticks covered by `windows`, clipped to `bounds`.
    pub fn from_windows(windows: &[Interval], bounds: Interval) -> Self {
        let mut sorted = windows.to_vec();
        sorted.sort_by_key(|window| window.start);

        let Some(first) = sorted.first().copied() else {
            return Self::empty();
        };
        let last_end = sorted.iter().map(|window| window.end).max().unwrap_or(first.end);

        let mut domain = Self::new(first.start, last_end);
        domain.set_range(bounds.start, bounds.end);

        let mut reach = first.end;
        for window in sorted.iter().skip(1) {
            if window.start > reach + 1 {
                domain.remove_interval(reach + 1, window.start - 1);
            }
            reach = reach.max(window.end);
        }
        domain
    }

    /// Restrict the domain to `[min, max]`.
    pub fn set_range(&mut self, min: Tick, max: Tick) {
        self.ranges.retain_mut(|range| {
            range.start = range.start.max(min);
            range.end = range.end.min(max);
            range.start <= range.end
        });
    }

    /// Remove the closed range `[from, to]`.
    pub fn remove_interval(&mut self, from: Tick, to: Tick) {
        if to < from {
            return;
        }
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for range in self.ranges.drain(..) {
            if range.end < from || range.start > to {
                kept.push(range);
                continue;
            }
            if range.start < from {
                kept.push(Interval::new(range.start, from - 1));
            }
            if range.end > to {
                kept.push(Interval::new(to + 1, range.end));
            }
        }
        self.ranges = kept;
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn min(&self) -> Option<Tick> {
        self.ranges.first().map(|range| range.start)
    }

    pub fn max(&self) -> Option<Tick> {
        self.ranges.last().map(|range| range.end)
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.ranges.iter().any(|range| range.contains(tick))
    }

    /// Smallest member of the domain that is `>= tick`.
    pub fn earliest_at_or_after(&self, tick: Tick) -> Option<Tick> {
        self.ranges
            .iter()
            .find(|range| range.end >= tick)
            .map(|range| range.start.max(tick))
    }

    /// Largest member of the domain that is `<= tick`.
    pub fn latest_at_or_before(&self, tick: Tick) -> Option<Tick> {
        self.ranges
            .iter()
            .rev()
            .find(|range| range.start <= tick)
            .map(|range| range.end.min(tick))
    }

    pub fn ranges(&self) -> &[Interval] {
        &self.ranges
    }
}
