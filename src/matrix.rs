//! Travel-time matrix in solver ticks and its cache-backed builder.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::MatrixError;
use crate::itinerary::Place;
use crate::ticks::{self, Tick};
use crate::traits::{CachedDuration, DistanceMatrixProvider, DurationCache, PlaceId};

/// Square travel-time matrix. `None` marks a pair with unknown duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationMatrix {
    size: usize,
    cells: Vec<Option<Tick>>,
}

impl DurationMatrix {
    /// Matrix with a zero diagonal and every other entry unknown.
    pub fn new(size: usize) -> Self {
        let mut cells = vec![None; size * size];
        for i in 0..size {
            cells[i * size + i] = Some(0);
        }
        Self { size, cells }
    }

    /// Fully known matrix from dense rows.
    ///
    /// # Panics
    ///
    /// Panics if `rows` is not square.
    pub fn from_rows(rows: Vec<Vec<Tick>>) -> Self {
        let size = rows.len();
        assert!(
            rows.iter().all(|row| row.len() == size),
            "duration matrix rows must be square"
        );
        Self {
            size,
            cells: rows.into_iter().flatten().map(Some).collect(),
        }
    }

    /// Same travel time between every pair of distinct nodes.
    pub fn uniform(size: usize, travel: Tick) -> Self {
        let mut matrix = Self::new(size);
        for from in 0..size {
            for to in 0..size {
                if from != to {
                    matrix.set(from, to, Some(travel));
                }
            }
        }
        matrix
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> Option<Tick> {
        self.cells[from * self.size + to]
    }

    pub fn set(&mut self, from: usize, to: usize, value: Option<Tick>) {
        self.cells[from * self.size + to] = value;
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn unknown_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    pub fn rows(&self) -> Vec<Vec<Option<Tick>>> {
        self.cells.chunks(self.size.max(1)).map(<[_]>::to_vec).collect()
    }
}

/// Build the travel-time matrix for `places` in node order.
///
/// Places may repeat (the accommodation appears once per day); repeats are
/// resolved once and copied into every row and column that shares the id.
/// Durations come from `cache` first; the rest are fetched from `provider` in
/// one request and written back to the cache. When the provider fails the
/// matrix is returned with the unresolved entries left unknown.
pub fn build_duration_matrix<C, M>(places: &[&Place], cache: &C, provider: &M) -> DurationMatrix
where
    C: DurationCache + ?Sized,
    M: DistanceMatrixProvider + ?Sized,
{
    let mut unique: Vec<&Place> = Vec::new();
    let mut index_of: HashMap<&PlaceId, usize> = HashMap::new();
    let node_to_unique: Vec<usize> = places
        .iter()
        .map(|&place| {
            *index_of.entry(&place.id).or_insert_with(|| {
                unique.push(place);
                unique.len() - 1
            })
        })
        .collect();

    let mut base = DurationMatrix::new(unique.len());
    let pairs: Vec<(PlaceId, PlaceId)> = ordered_pairs(unique.len())
        .map(|(from, to)| (unique[from].id.clone(), unique[to].id.clone()))
        .collect();
    info!(nodes = places.len(), unique = unique.len(), pairs = pairs.len(), "building duration matrix");

    let cached = if pairs.is_empty() {
        Vec::new()
    } else {
        cache.get(&pairs).unwrap_or_else(|err| {
            warn!(error = %err, "duration cache read failed, fetching every pair");
            Vec::new()
        })
    };
    for entry in &cached {
        if let (Some(&from), Some(&to)) = (index_of.get(&entry.source), index_of.get(&entry.destination)) {
            if from != to {
                base.set(from, to, Some(ticks::seconds_to_ticks(entry.seconds)));
            }
        }
    }

    let missing: Vec<(usize, usize)> = ordered_pairs(unique.len())
        .filter(|&(from, to)| base.get(from, to).is_none())
        .collect();
    info!(cached = cached.len(), missing = missing.len(), "duration cache lookup done");

    if !missing.is_empty() {
        match fetch_missing(&unique, &missing, provider) {
            Ok(fetched) => {
                for entry in &fetched {
                    let from = index_of[&entry.source];
                    let to = index_of[&entry.destination];
                    base.set(from, to, Some(ticks::seconds_to_ticks(entry.seconds)));
                }
                info!(fetched = fetched.len(), "fetched durations from distance matrix service");
                if let Err(err) = cache.upsert(&fetched) {
                    warn!(error = %err, "failed to persist fetched durations");
                }
            }
            Err(err) => {
                warn!(error = %err, unknown = missing.len(), "distance matrix service failed, returning partial matrix");
            }
        }
    }

    let mut matrix = DurationMatrix::new(places.len());
    for (from, &unique_from) in node_to_unique.iter().enumerate() {
        for (to, &unique_to) in node_to_unique.iter().enumerate() {
            matrix.set(from, to, base.get(unique_from, unique_to));
        }
    }
    matrix
}

fn ordered_pairs(size: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..size).flat_map(move |from| (0..size).filter(move |&to| to != from).map(move |to| (from, to)))
}

/// One provider request covering the sources and destinations of `missing`.
fn fetch_missing<M>(
    unique: &[&Place],
    missing: &[(usize, usize)],
    provider: &M,
) -> Result<Vec<CachedDuration>, MatrixError>
where
    M: DistanceMatrixProvider + ?Sized,
{
    let sources: BTreeSet<usize> = missing.iter().map(|&(from, _)| from).collect();
    let destinations: BTreeSet<usize> = missing.iter().map(|&(_, to)| to).collect();
    let involved: Vec<usize> = sources.union(&destinations).copied().collect();
    let api_index: HashMap<usize, usize> = involved
        .iter()
        .enumerate()
        .map(|(api, &unique_index)| (unique_index, api))
        .collect();

    let locations: Vec<(f64, f64)> = involved.iter().map(|&i| unique[i].location).collect();
    let api_sources: Vec<usize> = sources.iter().map(|i| api_index[i]).collect();
    let api_destinations: Vec<usize> = destinations.iter().map(|i| api_index[i]).collect();

    let rows = provider.matrix_for(&locations, &api_sources, &api_destinations)?;
    let cols = rows.first().map_or(0, Vec::len);
    if rows.len() != sources.len() || rows.iter().any(|row| row.len() != destinations.len()) {
        return Err(MatrixError::Shape {
            rows: rows.len(),
            cols,
            expected_rows: sources.len(),
            expected_cols: destinations.len(),
        });
    }

    let mut fetched = Vec::new();
    for (row, &from) in rows.iter().zip(&sources) {
        for (cell, &to) in row.iter().zip(&destinations) {
            if from == to {
                continue;
            }
            if let Some(seconds) = *cell {
                fetched.push(CachedDuration {
                    source: unique[from].id.clone(),
                    destination: unique[to].id.clone(),
                    seconds,
                });
            }
        }
    }
    Ok(fetched)
}
