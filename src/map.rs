//! Map presentation and device location.
//!
//! The estimator only needs to place markers, draw a path and ask for the
//! device position. [`LeafletPresenter`] records those calls into a
//! serializable [`MapScene`] that the web page renders with Leaflet.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::config::{GeolocationConfig, MapConfig};
use crate::models::Coordinate;
use crate::{Result, TravelEtaError, http_client};

pub const PATH_COLOR: &str = "blue";

#[async_trait]
pub trait MapPresenter: Send + Sync {
    fn place_marker(&mut self, coordinate: Coordinate, label: &str);

    fn draw_path(&mut self, path: &[Coordinate]);

    /// Fails when the position cannot be read or no source exists
    async fn current_device_location(&self) -> Result<Coordinate>;
}

/// Source of the device's own position
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinate>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub popup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Coordinate>,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapScene {
    pub center: Coordinate,
    pub zoom: u8,
    pub tile_layer: TileLayer,
    pub polylines: Vec<Polyline>,
    pub markers: Vec<Marker>,
}

impl MapScene {
    /// Empty scene with only the base tile layer
    #[must_use]
    pub fn new(config: &MapConfig) -> Self {
        Self {
            center: Coordinate::new(config.center_latitude, config.center_longitude),
            zoom: config.zoom,
            tile_layer: TileLayer {
                url_template: config.tile_url.clone(),
                attribution: config.attribution.clone(),
            },
            polylines: Vec::new(),
            markers: Vec::new(),
        }
    }

    /// Export paths and markers as a GeoJSON `FeatureCollection` (`[lon, lat]` positions)
    #[must_use]
    pub fn to_geojson(&self) -> Value {
        let lines = self.polylines.iter().map(|line| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": line.points.iter().map(Coordinate::to_lon_lat).collect::<Vec<_>>(),
                },
                "properties": { "color": line.color },
            })
        });
        let points = self.markers.iter().map(|marker| {
            json!({
                "type": "Feature",
                "geometry": {
                    "type": "Point",
                    "coordinates": marker.coordinate.to_lon_lat(),
                },
                "properties": { "popup": marker.popup },
            })
        });

        json!({
            "type": "FeatureCollection",
            "features": lines.chain(points).collect::<Vec<_>>(),
        })
    }
}

/// Records presenter calls into a [`MapScene`]
pub struct LeafletPresenter {
    scene: MapScene,
    locator: Option<Arc<dyn DeviceLocator>>,
}

impl LeafletPresenter {
    #[must_use]
    pub fn new(scene: MapScene, locator: Option<Arc<dyn DeviceLocator>>) -> Self {
        Self { scene, locator }
    }

    #[must_use]
    pub fn scene(&self) -> &MapScene {
        &self.scene
    }

    #[must_use]
    pub fn into_scene(self) -> MapScene {
        self.scene
    }
}

#[async_trait]
impl MapPresenter for LeafletPresenter {
    fn place_marker(&mut self, coordinate: Coordinate, label: &str) {
        self.scene.markers.push(Marker {
            coordinate,
            popup: label.to_string(),
        });
    }

    fn draw_path(&mut self, path: &[Coordinate]) {
        self.scene.polylines.push(Polyline {
            points: path.to_vec(),
            color: PATH_COLOR.to_string(),
        });
    }

    async fn current_device_location(&self) -> Result<Coordinate> {
        match &self.locator {
            Some(locator) => locator.locate().await,
            None => Err(TravelEtaError::GeolocationUnsupported),
        }
    }
}

/// Approximates the device position from its public IP address
pub struct IpGeolocator {
    client: reqwest::Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(config: &GeolocationConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl DeviceLocator for IpGeolocator {
    #[instrument(skip(self))]
    async fn locate(&self) -> Result<Coordinate> {
        debug!("Calling the IP geolocation API");
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| TravelEtaError::geolocation(e.to_string()))?;

        let result: IpApiResult = response
            .json()
            .await
            .map_err(|e| TravelEtaError::geolocation(format!("Invalid response: {e}")))?;

        if result.error.unwrap_or(false) {
            let reason = result.reason.unwrap_or_else(|| "unknown".to_string());
            warn!("IP geolocation refused: {}", reason);
            return Err(TravelEtaError::geolocation(reason));
        }

        let latitude = result
            .latitude
            .ok_or_else(|| TravelEtaError::geolocation("no latitude"))?;
        let longitude = result
            .longitude
            .ok_or_else(|| TravelEtaError::geolocation("no longitude"))?;

        Coordinate::try_new(latitude, longitude)
            .map_err(|_| TravelEtaError::geolocation("coordinates out of range"))
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResult {
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}
