//! Offline stand-in for the Mapbox matrix.
//!
//! Travel time is the great-circle distance between two places driven at the
//! same speed Mapbox applies to pairs it cannot route (`fallback_speed`). The
//! planner gets durations of the same order as the API without a token or a
//! network connection.

use crate::error::MatrixError;
use crate::mapbox::MapboxConfig;
use crate::traits::DistanceMatrixProvider;

const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Straight-line travel estimator for `(lat, lon)` places.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    /// Uses the fallback speed of a default [`MapboxConfig`].
    fn default() -> Self {
        Self::matching(&MapboxConfig::default())
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Estimator that agrees with what `config` asks Mapbox to assume for
    /// unroutable pairs.
    pub fn matching(config: &MapboxConfig) -> Self {
        Self::new(f64::from(config.fallback_speed_kmh))
    }

    fn travel_seconds(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        great_circle_km(from, to) / self.speed_kmh * SECONDS_PER_HOUR
    }
}

/// Distance along the earth's surface between two `(lat, lon)` points.
fn great_circle_km((lat_a, lon_a): (f64, f64), (lat_b, lon_b): (f64, f64)) -> f64 {
    let (phi_a, phi_b) = (lat_a.to_radians(), lat_b.to_radians());
    let half_dphi = (phi_b - phi_a) / 2.0;
    let half_dlambda = (lon_b - lon_a).to_radians() / 2.0;

    let h = half_dphi.sin().powi(2) + phi_a.cos() * phi_b.cos() * half_dlambda.sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(
        &self,
        locations: &[(f64, f64)],
        sources: &[usize],
        destinations: &[usize],
    ) -> Result<Vec<Vec<Option<f64>>>, MatrixError> {
        let place = |index: usize| {
            locations
                .get(index)
                .copied()
                .ok_or_else(|| MatrixError::Config(format!("no coordinates for place index {index}")))
        };

        sources
            .iter()
            .map(|&from| {
                destinations
                    .iter()
                    .map(|&to| -> Result<Option<f64>, MatrixError> {
                        if from == to {
                            return Ok(Some(0.0));
                        }
                        Ok(Some(self.travel_seconds(place(from)?, place(to)?)))
                    })
                    .collect()
            })
            .collect()
    }
}
