//! `TravelETA` - traffic and weather adjusted travel time estimation
//!
//! This library resolves named nodes of a small fixed map, derives traffic
//! propositions from the clock and weather propositions from a remote
//! provider, fetches a driving route, and turns its distance into a time
//! estimate that can be drawn on a map.

use std::time::Duration;

pub mod api;
pub mod config;
pub mod error;
pub mod eta;
pub mod location_resolver;
pub mod map;
pub mod models;
pub mod planner;
pub mod routing;
pub mod telemetry;
pub mod traffic;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::TravelEtaConfig;
pub use error::TravelEtaError;
pub use eta::{EtaCalculator, EtaResult, estimate_minutes, multiplier};
pub use location_resolver::CoordinateResolver;
pub use map::{DeviceLocator, IpGeolocator, LeafletPresenter, MapPresenter, MapScene};
pub use models::{Coordinate, ResolvedPoint};
pub use planner::{DisplayBoard, EtaPlanner, RouteReport, RunOutcome};
pub use routing::{OsrmClient, Route, RouteProvider};
pub use traffic::{TrafficEstimator, TrafficState};
pub use weather::{OpenWeatherClient, WeatherEstimator, WeatherProvider, WeatherState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelEtaError>;

/// HTTP client shared by the remote providers. A zero timeout leaves the
/// transport default in place.
pub fn http_client(timeout_seconds: u32) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(concat!("traveleta/", env!("CARGO_PKG_VERSION")));
    if timeout_seconds > 0 {
        builder = builder.timeout(Duration::from_secs(u64::from(timeout_seconds)));
    }
    builder
        .build()
        .map_err(|e| TravelEtaError::config(format!("Failed to build HTTP client: {e}")))
}
