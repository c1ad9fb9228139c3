//! Mapbox Matrix API adapter for travel durations.

use std::env;

use serde::Deserialize;

use crate::error::MatrixError;
use crate::traits::DistanceMatrixProvider;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapboxConfig {
    pub base_url: String,
    /// Routing profile, e.g. `mapbox/driving` or `mapbox/walking`.
    pub profile: String,
    pub access_token: String,
    /// Side-of-road approach sent for every coordinate.
    pub approach: String,
    /// Speed (km/h) Mapbox assumes for pairs it cannot route.
    pub fallback_speed_kmh: u32,
    pub timeout_secs: u64,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            profile: "mapbox/driving".to_string(),
            access_token: String::new(),
            approach: "curb".to_string(),
            fallback_speed_kmh: 45,
            timeout_secs: 10,
        }
    }
}

impl MapboxConfig {
    /// Read `MAPBOX_API_KEY` (and optionally `MAPBOX_BASE_URL`,
    /// `MAPBOX_PROFILE`) from the environment or a `.env` file.
    pub fn from_env() -> Result<Self, MatrixError> {
        dotenvy::dotenv().ok();

        let access_token = env::var("MAPBOX_API_KEY")
            .map_err(|_| MatrixError::Config("MAPBOX_API_KEY is not set".to_string()))?;
        let mut config = Self {
            access_token,
            ..Self::default()
        };
        if let Ok(base_url) = env::var("MAPBOX_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(profile) = env::var("MAPBOX_PROFILE") {
            config.profile = profile;
        }
        Ok(config)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct MapboxClient {
    config: MapboxConfig,
    client: reqwest::blocking::Client,
}

impl MapboxClient {
    pub fn new(config: MapboxConfig) -> Result<Self, MatrixError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn request_url(&self, locations: &[(f64, f64)]) -> String {
        let coords = locations
            .iter()
            .map(|(lat, lng)| format!("{:.6},{:.6}", lng, lat))
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/directions-matrix/v1/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coords
        )
    }

    fn query(&self, count: usize, sources: &[usize], destinations: &[usize]) -> Vec<(&'static str, String)> {
        vec![
            ("access_token", self.config.access_token.clone()),
            ("annotations", "duration".to_string()),
            ("sources", join_indices(sources)),
            ("destinations", join_indices(destinations)),
            ("approaches", vec![self.config.approach.as_str(); count].join(";")),
            ("fallback_speed", self.config.fallback_speed_kmh.to_string()),
        ]
    }
}

fn join_indices(indices: &[usize]) -> String {
    indices
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

impl DistanceMatrixProvider for MapboxClient {
    fn matrix_for(
        &self,
        locations: &[(f64, f64)],
        sources: &[usize],
        destinations: &[usize],
    ) -> Result<Vec<Vec<Option<f64>>>, MatrixError> {
        if locations.is_empty() || sources.is_empty() || destinations.is_empty() {
            return Ok(Vec::new());
        }
        if self.config.access_token.is_empty() {
            return Err(MatrixError::Config("missing Mapbox access token".to_string()));
        }

        tracing::debug!(
            coordinates = locations.len(),
            sources = sources.len(),
            destinations = destinations.len(),
            "requesting Mapbox duration matrix"
        );

        let body = self
            .client
            .get(self.request_url(locations))
            .query(&self.query(locations.len(), sources, destinations))
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<MatrixResponse>())?;

        body.into_durations()
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    durations: Option<Vec<Vec<Option<f64>>>>,
}

impl MatrixResponse {
    fn into_durations(self) -> Result<Vec<Vec<Option<f64>>>, MatrixError> {
        if self.code != "Ok" {
            return Err(MatrixError::Service {
                code: self.code,
                message: self.message.unwrap_or_default(),
            });
        }
        self.durations.ok_or(MatrixError::MissingDurations)
    }
}
