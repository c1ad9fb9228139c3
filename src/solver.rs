//! Single-vehicle itinerary scheduler.
//!
//! Node 0 is the depot (the accommodation's trip-start occurrence); the route
//! leaves it, visits a subset of the remaining nodes and returns to it. Every
//! node carries a [`TimeDomain`] built from its windows, so an arrival is valid
//! only when it lands inside one of them. Arriving early costs waiting time,
//! bounded per leg by [`SolveOptions::max_slack`]; when a leg would wait longer,
//! earlier stops are pushed later to absorb the excess.
//!
//! The objective is total transit (travel plus service of the node being left)
//! plus a fixed penalty per skipped optional node, with the completion time as
//! tie-breaker. Construction is cheapest insertion from several orderings run
//! in parallel, each followed by local search within a shared time budget.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::TimeDomain;
use crate::interval::Interval;
use crate::itinerary::{Node, NodeKind};
use crate::matrix::DurationMatrix;
use crate::ticks::Tick;

const DEPOT: usize = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Cost charged for each optional node left out of the route.
    pub skip_penalty: i64,
    /// Longest wait allowed before entering a node, in ticks.
    pub max_slack: Tick,
    /// Maximum local search rounds per construction start.
    pub local_search_iterations: usize,
    /// Wall-clock budget for the whole search.
    pub time_limit_ms: u64,
    /// Number of construction orderings explored in parallel.
    pub parallel_starts: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            skip_penalty: 1000,
            max_slack: 24, // 6 hours
            local_search_iterations: 100,
            time_limit_ms: 5_000,
            parallel_starts: 4,
        }
    }
}

impl SolveOptions {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn with_skip_penalty(mut self, penalty: i64) -> Self {
        self.skip_penalty = penalty;
        self
    }

    pub fn with_max_slack(mut self, slack: Tick) -> Self {
        self.max_slack = slack;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = limit.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }
}

/// One visited stop on the route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Index into the solved node list.
    pub node: usize,
    pub kind: NodeKind,
    pub arrival: Tick,
    pub departure: Tick,
    /// Idle ticks before the visit could start.
    pub waiting: Tick,
    /// Ticks travelled from the previous stop.
    pub travel: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResult {
    /// Depot departure, visited nodes, depot return.
    pub stops: Vec<RouteStop>,
    /// Optional nodes left out of the route.
    pub skipped: Vec<usize>,
    /// Route completion tick (arrival back at the depot).
    pub total_time: Tick,
    pub total_waiting: Tick,
    pub skip_penalty: i64,
    /// Transit plus skip penalty.
    pub cost: i64,
}

impl RouteResult {
    /// Whether two accommodation stops follow each other directly.
    pub fn has_consecutive_accommodation(&self) -> bool {
        self.stops.windows(2).any(|pair| {
            matches!(pair[0].kind, NodeKind::Accommodation { .. })
                && matches!(pair[1].kind, NodeKind::Accommodation { .. })
        })
    }

    pub fn visits(&self, node: usize) -> bool {
        self.stops.iter().any(|stop| stop.node == node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveOutcome {
    Found(RouteResult),
    /// No route places every mandatory node; `unplaced` lists the ones that
    /// could not be scheduled.
    Infeasible { unplaced: Vec<usize> },
    /// The time budget ran out before any feasible route was found.
    TimedOut,
}

impl SolveOutcome {
    pub fn route(&self) -> Option<&RouteResult> {
        match self {
            Self::Found(route) => Some(route),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Schedule `nodes` over `[0, horizon]` using the travel times in `matrix`.
///
/// `nodes[0]` is the depot. Unknown matrix entries are treated as arcs that
/// cannot be travelled.
///
/// # Panics
///
/// Panics if `matrix` does not have one row per node.
pub fn solve(nodes: &[Node], matrix: &DurationMatrix, horizon: Tick, options: &SolveOptions) -> SolveOutcome {
    assert_eq!(matrix.size(), nodes.len(), "duration matrix must have one row per node");
    if nodes.is_empty() {
        return SolveOutcome::Infeasible { unplaced: Vec::new() };
    }

    let model = Model::new(nodes, matrix, horizon, options);
    let unreachable: Vec<usize> = (0..nodes.len())
        .filter(|&node| nodes[node].mandatory && model.domains[node].is_empty())
        .collect();
    if !unreachable.is_empty() {
        info!(?unreachable, "mandatory nodes have no usable window");
        return SolveOutcome::Infeasible { unplaced: unreachable };
    }

    let deadline = Instant::now() + options.time_limit();
    let starts = options.parallel_starts.max(1);
    let results: Vec<StartResult> = (0..starts)
        .into_par_iter()
        .map(|start| model.run_start(start, deadline))
        .collect();

    let mut best: Option<Candidate> = None;
    let mut fewest_unplaced: Option<Vec<usize>> = None;
    let mut timed_out = false;
    for result in results {
        match result {
            StartResult::Feasible(candidate) => {
                if best.as_ref().is_none_or(|b| candidate.score() < b.score()) {
                    best = Some(candidate);
                }
            }
            StartResult::Unplaced(unplaced) => {
                if fewest_unplaced.as_ref().is_none_or(|u| unplaced.len() < u.len()) {
                    fewest_unplaced = Some(unplaced);
                }
            }
            StartResult::TimedOut => timed_out = true,
        }
    }

    match (best, timed_out, fewest_unplaced) {
        (Some(candidate), _, _) => {
            let route = model.route_result(&candidate);
            info!(
                cost = route.cost,
                visited = route.stops.len(),
                skipped = route.skipped.len(),
                total_time = route.total_time,
                "route found"
            );
            SolveOutcome::Found(route)
        }
        (None, true, _) => {
            warn!("search budget exhausted without a feasible route");
            SolveOutcome::TimedOut
        }
        (None, false, unplaced) => {
            let unplaced = unplaced.unwrap_or_default();
            info!(?unplaced, "no feasible route");
            SolveOutcome::Infeasible { unplaced }
        }
    }
}

struct Model<'a> {
    nodes: &'a [Node],
    matrix: &'a DurationMatrix,
    domains: Vec<TimeDomain>,
    max_slack: Tick,
    options: &'a SolveOptions,
    optional_total: usize,
}

/// Times of one evaluated sequence. `arrivals[0]` is the depot departure.
#[derive(Debug, Clone)]
struct Evaluation {
    arrivals: Vec<Tick>,
    end_arrival: Tick,
    transit: i64,
}

#[derive(Debug, Clone)]
struct Candidate {
    sequence: Vec<usize>,
    evaluation: Evaluation,
    penalty: i64,
}

impl Candidate {
    fn score(&self) -> (i64, Tick) {
        (self.evaluation.transit + self.penalty, self.evaluation.end_arrival)
    }
}

enum StartResult {
    Feasible(Candidate),
    Unplaced(Vec<usize>),
    TimedOut,
}

impl<'a> Model<'a> {
    fn new(nodes: &'a [Node], matrix: &'a DurationMatrix, horizon: Tick, options: &'a SolveOptions) -> Self {
        let bounds = Interval::new(0, horizon);
        let domains = nodes
            .iter()
            .map(|node| TimeDomain::from_windows(&node.windows, bounds))
            .collect();
        let optional_total = nodes
            .iter()
            .enumerate()
            .filter(|&(index, node)| index != DEPOT && !node.mandatory)
            .count();

        Self {
            nodes,
            matrix,
            domains,
            max_slack: options.max_slack.max(0),
            options,
            optional_total,
        }
    }

    fn service(&self, node: usize) -> Tick {
        self.nodes[node].service
    }

    fn run_start(&self, start: usize, deadline: Instant) -> StartResult {
        let order = self.insertion_order(start);
        debug!(start, nodes = order.len(), "construction start");

        match self.construct(&order, deadline) {
            StartResult::Feasible(mut candidate) => {
                self.local_search(&mut candidate, deadline);
                StartResult::Feasible(candidate)
            }
            other => other,
        }
    }

    /// Mandatory nodes first, then optional ones, each ordered by the
    /// strategy selected by `start`.
    fn insertion_order(&self, start: usize) -> Vec<usize> {
        let usable = |node: &usize| !self.domains[*node].is_empty();
        let mut mandatory: Vec<usize> = (1..self.nodes.len())
            .filter(|&node| self.nodes[node].mandatory)
            .filter(usable)
            .collect();
        let mut optional: Vec<usize> = (1..self.nodes.len())
            .filter(|&node| !self.nodes[node].mandatory)
            .filter(usable)
            .collect();

        let earliest = |node: &usize| (self.domains[*node].min().unwrap_or(Tick::MAX), *node);
        let latest = |node: &usize| (self.domains[*node].max().unwrap_or(Tick::MAX), *node);
        let width = |node: &usize| {
            let span: Tick = self.domains[*node].ranges().iter().map(|range| range.len() + 1).sum();
            (span, *node)
        };
        let from_depot = |node: &usize| (self.matrix.get(DEPOT, *node).unwrap_or(Tick::MAX), *node);

        match start % 4 {
            0 => {
                mandatory.sort_by_key(earliest);
                optional.sort_by_key(earliest);
            }
            1 => {
                mandatory.sort_by_key(latest);
                optional.sort_by_key(latest);
            }
            2 => {
                mandatory.sort_by_key(width);
                optional.sort_by_key(width);
            }
            _ => {
                mandatory.sort_by_key(earliest);
                optional.sort_by_key(from_depot);
            }
        }
        if !optional.is_empty() {
            let shift = (start / 4) % optional.len();
            optional.rotate_left(shift);
        }

        mandatory.extend(optional);
        mandatory
    }

    /// Cheapest insertion of each node in `order`.
    fn construct(&self, order: &[usize], deadline: Instant) -> StartResult {
        let mut sequence: Vec<usize> = Vec::new();
        let Some(mut current) = self.evaluate(&sequence) else {
            return StartResult::Unplaced(vec![DEPOT]);
        };
        let mut unplaced = Vec::new();

        for &node in order {
            if Instant::now() >= deadline {
                return StartResult::TimedOut;
            }

            let mut best: Option<(usize, Evaluation)> = None;
            for position in 0..=sequence.len() {
                let mut candidate = sequence.clone();
                candidate.insert(position, node);
                if let Some(evaluation) = self.evaluate(&candidate) {
                    let better = best.as_ref().is_none_or(|(_, b)| {
                        (evaluation.transit, evaluation.end_arrival) < (b.transit, b.end_arrival)
                    });
                    if better {
                        best = Some((position, evaluation));
                    }
                }
            }

            match best {
                Some((position, evaluation)) => {
                    sequence.insert(position, node);
                    current = evaluation;
                }
                None if self.nodes[node].mandatory => unplaced.push(node),
                None => {}
            }
        }

        if !unplaced.is_empty() {
            return StartResult::Unplaced(unplaced);
        }
        let penalty = self.penalty(&sequence);
        StartResult::Feasible(Candidate {
            sequence,
            evaluation: current,
            penalty,
        })
    }

    fn penalty(&self, sequence: &[usize]) -> i64 {
        let visited_optional = sequence
            .iter()
            .filter(|&&node| !self.nodes[node].mandatory)
            .count();
        (self.optional_total - visited_optional) as i64 * self.options.skip_penalty
    }

    fn candidate(&self, sequence: Vec<usize>) -> Option<Candidate> {
        let evaluation = self.evaluate(&sequence)?;
        let penalty = self.penalty(&sequence);
        Some(Candidate {
            sequence,
            evaluation,
            penalty,
        })
    }

    /// Earliest feasible schedule for `sequence`, or `None` if some arrival
    /// misses every window of its node.
    fn evaluate(&self, sequence: &[usize]) -> Option<Evaluation> {
        let mut positions = Vec::with_capacity(sequence.len() + 1);
        positions.push(DEPOT);
        positions.extend_from_slice(sequence);

        let mut arrivals = Vec::with_capacity(positions.len());
        let mut waits = vec![0; positions.len()];
        arrivals.push(self.domains[DEPOT].min()?);
        let mut transit: i64 = 0;

        for p in 1..positions.len() {
            let (prev, node) = (positions[p - 1], positions[p]);
            let travel = self.matrix.get(prev, node)?;
            transit += i64::from(travel + self.service(prev));

            let ready = arrivals[p - 1] + self.service(prev) + travel;
            let arrival = self.domains[node].earliest_at_or_after(ready)?;
            arrivals.push(arrival);

            let mut wait = arrival - ready;
            if wait > self.max_slack {
                let excess = wait - self.max_slack;
                if !self.delay(&positions, &mut arrivals, &mut waits, p - 1, excess) {
                    return None;
                }
                wait = waits[p];
            }
            if p == 1 && wait > 0 {
                wait -= self.delay_start(&mut arrivals, wait);
            }
            waits[p] = wait;
        }

        let last_position = positions.len() - 1;
        let last = positions[last_position];
        let travel = self.matrix.get(last, DEPOT)?;
        transit += i64::from(travel + self.service(last));
        let ready = arrivals[last_position] + self.service(last) + travel;
        let end_arrival = self.domains[DEPOT].earliest_at_or_after(ready)?;

        Some(Evaluation {
            arrivals,
            end_arrival,
            transit,
        })
    }

    /// Push the arrival at position `q` later by at least `amount`, cascading
    /// backwards whenever the extra wait at `q` exceeds the slack bound.
    ///
    /// A shift that lands in a gap between windows moves on to the next
    /// window, provided the stop after `q` is still reached in time.
    fn delay(&self, positions: &[usize], arrivals: &mut [Tick], waits: &mut [Tick], mut q: usize, mut amount: Tick) -> bool {
        loop {
            let (node, next) = (positions[q], q + 1);
            let Some(travel) = self.matrix.get(node, positions[next]) else {
                return false;
            };
            let latest = arrivals[next] - travel - self.service(node);
            let Some(shifted) = self.domains[node].earliest_at_or_after(arrivals[q] + amount) else {
                return false;
            };
            if shifted > latest {
                return false;
            }

            let shift = shifted - arrivals[q];
            arrivals[q] = shifted;
            waits[next] = arrivals[next] - (shifted + self.service(node) + travel);
            if q == 0 {
                return true;
            }

            waits[q] += shift;
            if waits[q] <= self.max_slack {
                return true;
            }
            amount = waits[q] - self.max_slack;
            q -= 1;
        }
    }

    /// Leave the depot later, by up to `wanted` ticks. Returns the shift applied.
    fn delay_start(&self, arrivals: &mut [Tick], wanted: Tick) -> Tick {
        let start = arrivals[0];
        match self.domains[DEPOT].latest_at_or_before(start + wanted) {
            Some(later) if later > start => {
                arrivals[0] = later;
                later - start
            }
            _ => 0,
        }
    }

    fn skipped(&self, sequence: &[usize]) -> Vec<usize> {
        (1..self.nodes.len())
            .filter(|node| !sequence.contains(node))
            .collect()
    }

    // ============================================================================
    // Local Search Operators
    // ============================================================================

    /// 2-opt: Reverse a segment of the route.
    fn two_opt_improve(&self, candidate: &mut Candidate) -> bool {
        let n = candidate.sequence.len();
        if n < 2 {
            return false;
        }

        for i in 0..n - 1 {
            for j in i + 1..n {
                let mut sequence = candidate.sequence.clone();
                sequence[i..=j].reverse();
                if let Some(improved) = self.candidate(sequence) {
                    if improved.score() < candidate.score() {
                        *candidate = improved;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Relocate: Move one stop to another position.
    fn relocate_improve(&self, candidate: &mut Candidate) -> bool {
        let n = candidate.sequence.len();
        for from in 0..n {
            for to in 0..n {
                if to == from {
                    continue;
                }
                let mut sequence = candidate.sequence.clone();
                let node = sequence.remove(from);
                sequence.insert(to, node);
                if let Some(improved) = self.candidate(sequence) {
                    if improved.score() < candidate.score() {
                        *candidate = improved;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Insert a skipped optional node wherever it lowers the cost.
    fn insert_skipped_improve(&self, candidate: &mut Candidate) -> bool {
        for node in self.skipped(&candidate.sequence) {
            if self.domains[node].is_empty() {
                continue;
            }
            for position in 0..=candidate.sequence.len() {
                let mut sequence = candidate.sequence.clone();
                sequence.insert(position, node);
                if let Some(improved) = self.candidate(sequence) {
                    if improved.score() < candidate.score() {
                        *candidate = improved;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Swap a visited optional node for a skipped one in the same slot.
    fn exchange_skipped_improve(&self, candidate: &mut Candidate) -> bool {
        let skipped = self.skipped(&candidate.sequence);
        for position in 0..candidate.sequence.len() {
            if self.nodes[candidate.sequence[position]].mandatory {
                continue;
            }
            for &node in &skipped {
                if self.domains[node].is_empty() {
                    continue;
                }
                let mut sequence = candidate.sequence.clone();
                sequence[position] = node;
                if let Some(improved) = self.candidate(sequence) {
                    if improved.score() < candidate.score() {
                        *candidate = improved;
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Drop a visited optional node when visiting it costs more than skipping it.
    fn drop_optional_improve(&self, candidate: &mut Candidate) -> bool {
        for position in 0..candidate.sequence.len() {
            if self.nodes[candidate.sequence[position]].mandatory {
                continue;
            }
            let mut sequence = candidate.sequence.clone();
            sequence.remove(position);
            if let Some(improved) = self.candidate(sequence) {
                if improved.score() < candidate.score() {
                    *candidate = improved;
                    return true;
                }
            }
        }
        false
    }

    /// Run local search until no move improves, the iteration cap is hit or
    /// the deadline passes.
    fn local_search(&self, candidate: &mut Candidate, deadline: Instant) {
        for _ in 0..self.options.local_search_iterations {
            if Instant::now() >= deadline {
                warn!("search time limit reached during local search");
                break;
            }

            let mut improved = false;
            if self.insert_skipped_improve(candidate) {
                improved = true;
            }
            if self.two_opt_improve(candidate) {
                improved = true;
            }
            if self.relocate_improve(candidate) {
                improved = true;
            }
            if self.exchange_skipped_improve(candidate) {
                improved = true;
            }
            if self.drop_optional_improve(candidate) {
                improved = true;
            }

            if !improved {
                break;
            }
        }
    }

    // ============================================================================
    // Route Extraction
    // ============================================================================

    fn route_result(&self, candidate: &Candidate) -> RouteResult {
        let evaluation = &candidate.evaluation;
        let mut stops = Vec::with_capacity(candidate.sequence.len() + 2);

        let start = evaluation.arrivals[0];
        stops.push(RouteStop {
            node: DEPOT,
            kind: self.nodes[DEPOT].kind,
            arrival: start,
            departure: start + self.service(DEPOT),
            waiting: 0,
            travel: 0,
        });

        let mut previous = DEPOT;
        let mut previous_departure = start + self.service(DEPOT);
        let visits = candidate
            .sequence
            .iter()
            .zip(evaluation.arrivals.iter().skip(1))
            .map(|(&node, &arrival)| (node, arrival))
            .chain(std::iter::once((DEPOT, evaluation.end_arrival)));

        for (index, (node, arrival)) in visits.enumerate() {
            let travel = self.matrix.get(previous, node).unwrap_or_default();
            let is_return = index == candidate.sequence.len();
            let departure = if is_return { arrival } else { arrival + self.service(node) };
            stops.push(RouteStop {
                node,
                kind: self.nodes[node].kind,
                arrival,
                departure,
                waiting: (arrival - (previous_departure + travel)).max(0),
                travel,
            });
            previous = node;
            previous_departure = departure;
        }

        let total_waiting = stops.iter().map(|stop| stop.waiting).sum();
        RouteResult {
            skipped: self.skipped(&candidate.sequence),
            total_time: evaluation.end_arrival,
            total_waiting,
            skip_penalty: candidate.penalty,
            cost: candidate.score().0,
            stops,
        }
    }
}
