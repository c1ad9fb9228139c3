//! Request-to-route pipeline: normalize, build the matrix, solve, format.

use serde::Serialize;
use tracing::info;

use crate::error::PlannerError;
use crate::format::{FormattedRoute, format_route};
use crate::haversine::HaversineMatrix;
use crate::itinerary::{ItineraryRequest, NormalizedItinerary, normalize};
use crate::matrix::build_duration_matrix;
use crate::memory::InMemoryDurationCache;
use crate::solver::{SolveOptions, SolveOutcome, solve};
use crate::traits::{DistanceMatrixProvider, DurationCache, PlaceDirectory, PlaceId, PlanStage, ProgressSink};

/// Everything a planning call produced.
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    /// Normalized nodes plus the activities removed before solving.
    pub itinerary: NormalizedItinerary,
    pub outcome: SolveOutcome,
    /// Day/clock view of the route, present when one was found.
    pub route: Option<FormattedRoute>,
    /// Matrix entries left unknown after the cache and the distance service.
    pub unknown_arcs: usize,
}

impl PlanResult {
    pub fn is_found(&self) -> bool {
        self.outcome.is_found()
    }

    /// Place ids of the mandatory nodes that could not be scheduled.
    pub fn unplaced_places(&self) -> Vec<&PlaceId> {
        match &self.outcome {
            SolveOutcome::Infeasible { unplaced } => unplaced
                .iter()
                .map(|&node| &self.itinerary.place_of(node).id)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Plans multi-day itineraries against a set of collaborators.
#[derive(Debug)]
pub struct ItineraryPlanner<P, C, M> {
    directory: P,
    cache: C,
    provider: M,
    options: SolveOptions,
}

impl<P, C, M> ItineraryPlanner<P, C, M>
where
    P: PlaceDirectory,
    C: DurationCache,
    M: DistanceMatrixProvider,
{
    pub fn new(directory: P, cache: C, provider: M) -> Self {
        Self {
            directory,
            cache,
            provider,
            options: SolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SolveOptions {
        &self.options
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn plan(&self, request: &ItineraryRequest) -> Result<PlanResult, PlannerError> {
        self.plan_with_progress(request, &())
    }

    /// Like [`plan`](Self::plan), reporting each stage to `progress` as it starts.
    pub fn plan_with_progress<S>(&self, request: &ItineraryRequest, progress: &S) -> Result<PlanResult, PlannerError>
    where
        S: ProgressSink + ?Sized,
    {
        progress.report(PlanStage::Normalizing);
        let itinerary = normalize(request, &self.directory)?;

        progress.report(PlanStage::BuildingMatrix);
        let matrix = build_duration_matrix(&itinerary.node_places(), &self.cache, &self.provider);

        progress.report(PlanStage::Solving);
        let outcome = solve(&itinerary.nodes, &matrix, itinerary.horizon(), &self.options);

        progress.report(PlanStage::Formatting);
        let route = outcome.route().map(|route| format_route(route, &itinerary));

        info!(
            days = itinerary.days,
            nodes = itinerary.nodes.len(),
            dropped = itinerary.dropped.len(),
            found = outcome.is_found(),
            "itinerary planned"
        );
        progress.report(PlanStage::Done);

        Ok(PlanResult {
            unknown_arcs: matrix.unknown_count(),
            itinerary,
            outcome,
            route,
        })
    }
}

impl<P: PlaceDirectory> ItineraryPlanner<P, InMemoryDurationCache, HaversineMatrix> {
    /// Planner that needs no external services: great-circle travel times
    /// and a process-local duration cache.
    pub fn offline(directory: P) -> Self {
        Self::new(directory, InMemoryDurationCache::new(), HaversineMatrix::default())
    }
}
