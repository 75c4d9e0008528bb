use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::RoutingConfig;
use crate::models::Coordinate;
use crate::{Result, TravelEtaError, http_client};

/// One driving route candidate: its length and the path to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_km: f64,
    /// Path in (lat, lon) order, ready for display
    pub geometry: Vec<Coordinate>,
}

/// A remote driving route source.
///
/// Distance and geometry come from a single call so they always describe the
/// same candidate.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(&self, from: &Coordinate, to: &Coordinate) -> Result<Route>;

    async fn distance_km(&self, from: &Coordinate, to: &Coordinate) -> Result<f64> {
        Ok(self.route(from, to).await?.distance_km)
    }

    async fn route_geometry(&self, from: &Coordinate, to: &Coordinate) -> Result<Vec<Coordinate>> {
        Ok(self.route(from, to).await?.geometry)
    }
}

/// OSRM `route` service client
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: String,
    profile: String,
}

impl OsrmClient {
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
        })
    }

    /// OSRM expects `lon,lat;lon,lat`
    fn url(&self, from: &Coordinate, to: &Coordinate) -> String {
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, self.profile, from.longitude, from.latitude, to.longitude, to.latitude
        )
    }
}

#[async_trait]
impl RouteProvider for OsrmClient {
    #[instrument(skip(self))]
    async fn route(&self, from: &Coordinate, to: &Coordinate) -> Result<Route> {
        debug!("Calling the routing API");
        let response = self.client.get(self.url(from, to)).send().await?;
        let http_status = response.status();
        let body = response.text().await?;

        let response: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            TravelEtaError::api(format!(
                "Malformed routing response (HTTP {http_status}): {e}"
            ))
        })?;

        let Some(candidate) = response.routes.into_iter().next() else {
            error!(
                "No routes in response (code {}): {}",
                response.code.as_deref().unwrap_or("?"),
                response.message.as_deref().unwrap_or("")
            );
            return Err(TravelEtaError::route_not_found(format!(
                "No route between ({}, {}) and ({}, {})",
                from.latitude, from.longitude, to.latitude, to.longitude
            )));
        };

        let geometry = candidate
            .geometry
            .map(|g| g.coordinates.into_iter().map(Coordinate::from_lon_lat).collect())
            .unwrap_or_default();

        Ok(Route {
            distance_km: candidate.distance / 1000.0,
            geometry,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeometryResponse {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    /// Meters
    distance: f64,
    #[serde(default)]
    geometry: Option<GeometryResponse>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<RouteResponse>,
}
