//! Configuration management for `TravelETA`
//!
//! Handles loading configuration from files and environment variables,
//! and provides validation for all configuration settings.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::TravelEtaError;
use crate::location_resolver::{BUILTIN_NODES, CoordinateResolver};
use crate::models::Coordinate;
use crate::traffic::{RushWindow, TrafficEstimator};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TravelEtaConfig {
    /// Weather API configuration
    pub weather: WeatherConfig,
    /// Routing API configuration
    pub routing: RoutingConfig,
    /// Device location lookup
    pub geolocation: GeolocationConfig,
    /// Rush windows and the clock they are read in
    pub traffic: TrafficConfig,
    pub estimator: EstimatorConfig,
    /// Base map settings
    pub map: MapConfig,
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Named nodes of the fixed map
    pub nodes: Vec<NodeConfig>,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key; weather is reported as unknown without one
    pub api_key: Option<String>,
    /// Base URL for weather API
    pub base_url: String,
    /// City identifier queried on every estimation
    pub city_id: String,
    pub units: String,
    /// Request timeout in seconds, 0 disables
    pub timeout_seconds: u32,
}

/// Routing API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Base URL of an OSRM server
    pub base_url: String,
    /// OSRM profile, e.g. driving
    pub profile: String,
    /// Request timeout in seconds, 0 disables
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    pub enabled: bool,
    /// IP geolocation endpoint
    pub base_url: String,
    pub timeout_seconds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// IANA timezone of the map area
    pub timezone: String,
    /// `HH:MM`, inclusive
    pub morning_rush_start: String,
    pub morning_rush_end: String,
    pub evening_rush_start: String,
    pub evening_rush_end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Free-flow average speed in km/h
    pub average_speed_kmh: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub zoom: u8,
    /// Tile URL template with `{s}`, `{z}`, `{x}`, `{y}` placeholders
    pub tile_url: String,
    pub attribution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the static map page
    pub static_dir: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_city_id() -> String {
    "3936456".to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_routing_base_url() -> String {
    "https://router.project-osrm.org".to_string()
}

fn default_profile() -> String {
    "driving".to_string()
}

fn default_geolocation_url() -> String {
    "https://ipapi.co/json/".to_string()
}

fn default_timezone() -> String {
    "America/Lima".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_nodes() -> Vec<NodeConfig> {
    BUILTIN_NODES
        .iter()
        .map(|(label, coordinate)| NodeConfig {
            label: (*label).to_string(),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        })
        .collect()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_weather_base_url(),
            city_id: default_city_id(),
            units: default_units(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: default_routing_base_url(),
            profile: default_profile(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_geolocation_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            morning_rush_start: "08:00".to_string(),
            morning_rush_end: "09:00".to_string(),
            evening_rush_start: "17:00".to_string(),
            evening_rush_end: "19:00".to_string(),
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            average_speed_kmh: crate::eta::AVERAGE_SPEED_KMH,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_latitude: -15.840221,
            center_longitude: -70.021880,
            zoom: 13,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: "frontend".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl TrafficConfig {
    pub fn timezone(&self) -> crate::Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|_| {
            TravelEtaError::config(format!("Unknown timezone '{}'", self.timezone))
        })
    }

    pub fn estimator(&self) -> crate::Result<TrafficEstimator> {
        let morning = RushWindow::from_times(
            parse_clock(&self.morning_rush_start)?,
            parse_clock(&self.morning_rush_end)?,
        )?;
        let evening = RushWindow::from_times(
            parse_clock(&self.evening_rush_start)?,
            parse_clock(&self.evening_rush_end)?,
        )?;
        Ok(TrafficEstimator::new(morning, evening))
    }
}

fn parse_clock(value: &str) -> crate::Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| TravelEtaError::config(format!("Invalid clock time '{value}', expected HH:MM")))
}

impl TravelEtaConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // TRAVELETA_WEATHER__API_KEY -> weather.api_key
        builder = builder.add_source(
            Environment::with_prefix("TRAVELETA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: TravelEtaConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("traveleta").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.city_id.is_empty() {
            self.weather.city_id = default_city_id();
        }
        if self.weather.units.is_empty() {
            self.weather.units = default_units();
        }
        if self.weather.api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            self.weather.api_key = None;
        }
        if self.routing.base_url.is_empty() {
            self.routing.base_url = default_routing_base_url();
        }
        if self.routing.profile.is_empty() {
            self.routing.profile = default_profile();
        }
        if self.geolocation.base_url.is_empty() {
            self.geolocation.base_url = default_geolocation_url();
        }
        if self.traffic.timezone.is_empty() {
            self.traffic.timezone = default_timezone();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.nodes.is_empty() {
            self.nodes = default_nodes();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_urls()?;
        self.validate_traffic()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        self.validate_nodes()?;
        Ok(())
    }

    fn validate_urls(&self) -> Result<()> {
        for (name, url) in [
            ("Weather API", &self.weather.base_url),
            ("Routing API", &self.routing.base_url),
            ("Geolocation API", &self.geolocation.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(TravelEtaError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }
        Ok(())
    }

    fn validate_traffic(&self) -> Result<()> {
        self.traffic.timezone()?;
        self.traffic.estimator()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        for timeout in [
            self.weather.timeout_seconds,
            self.routing.timeout_seconds,
            self.geolocation.timeout_seconds,
        ] {
            if timeout > 300 {
                return Err(
                    TravelEtaError::config("Request timeout cannot exceed 300 seconds").into(),
                );
            }
        }

        let speed = self.estimator.average_speed_kmh;
        if !speed.is_finite() || speed <= 0.0 {
            return Err(TravelEtaError::config("Average speed must be positive").into());
        }

        if self.map.zoom > 19 {
            return Err(TravelEtaError::config("Map zoom cannot exceed 19").into());
        }

        if Coordinate::try_new(self.map.center_latitude, self.map.center_longitude).is_err() {
            return Err(TravelEtaError::config("Map center is not a valid coordinate").into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(TravelEtaError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(TravelEtaError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }

    fn validate_nodes(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            let label = crate::location_resolver::normalize_label(&node.label);
            if label.is_empty() {
                return Err(TravelEtaError::config("Node labels cannot be empty").into());
            }
            if !seen.insert(label.clone()) {
                return Err(TravelEtaError::config(format!("Duplicate node label '{label}'")).into());
            }
            if Coordinate::try_new(node.latitude, node.longitude).is_err() {
                return Err(TravelEtaError::config(format!(
                    "Node '{label}' has invalid coordinates"
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Label table for the resolver
    #[must_use]
    pub fn resolver(&self) -> CoordinateResolver {
        if self.nodes.is_empty() {
            return CoordinateResolver::builtin();
        }
        CoordinateResolver::new(
            self.nodes
                .iter()
                .map(|node| (node.label.as_str(), Coordinate::new(node.latitude, node.longitude))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TravelEtaConfig::default();
        assert_eq!(config.weather.base_url, "https://api.openweathermap.org/data/2.5");
        assert_eq!(config.weather.city_id, "3936456");
        assert_eq!(config.weather.units, "metric");
        assert!(config.weather.api_key.is_none());
        assert_eq!(config.routing.profile, "driving");
        assert_eq!(config.traffic.timezone, "America/Lima");
        assert_eq!(config.estimator.average_speed_kmh, 50.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.nodes.is_empty());
    }

    #[test]
    fn test_apply_defaults_fills_nodes() {
        let mut config = TravelEtaConfig::default();
        config.weather.api_key = Some("  ".to_string());
        config.apply_defaults();
        assert_eq!(config.nodes.len(), 4);
        assert!(config.weather.api_key.is_none());
        assert!(config.validate().is_ok());
        assert!(config.resolver().resolve("d").is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = TravelEtaConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_timezone() {
        let mut config = TravelEtaConfig::default();
        config.traffic.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Unknown timezone"));
    }

    #[test]
    fn test_config_validation_inverted_rush_window() {
        let mut config = TravelEtaConfig::default();
        config.traffic.morning_rush_start = "10:00".to_string();
        assert!(config.validate().is_err());

        config.traffic.morning_rush_start = "8am".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("HH:MM"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = TravelEtaConfig::default();
        config.routing.timeout_seconds = 500;
        assert!(config.validate().unwrap_err().to_string().contains("timeout cannot exceed"));

        let mut config = TravelEtaConfig::default();
        config.estimator.average_speed_kmh = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_urls() {
        let mut config = TravelEtaConfig::default();
        config.routing.base_url = "router.project-osrm.org".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("Routing API"));
    }

    #[test]
    fn test_config_validation_duplicate_nodes() {
        let mut config = TravelEtaConfig::default();
        config.nodes = vec![
            NodeConfig {
                label: "a".to_string(),
                latitude: -15.0,
                longitude: -70.0,
            },
            NodeConfig {
                label: " A ".to_string(),
                latitude: -15.1,
                longitude: -70.1,
            },
        ];
        assert!(config.validate().unwrap_err().to_string().contains("Duplicate node"));
    }

    #[test]
    fn test_traffic_config_builds_estimator() {
        let estimator = TrafficConfig::default().estimator().unwrap();
        assert_eq!(estimator, TrafficEstimator::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[weather]
api_key = "file_key_12345"
city_id = "3931276"

[estimator]
average_speed_kmh = 40.0

[[nodes]]
label = "plaza"
latitude = -15.8402
longitude = -70.0219
"#
        )
        .unwrap();

        let config = TravelEtaConfig::load_from_path(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.weather.api_key.as_deref(), Some("file_key_12345"));
        assert_eq!(config.weather.city_id, "3931276");
        assert_eq!(config.weather.units, "metric");
        assert_eq!(config.estimator.average_speed_kmh, 40.0);
        assert_eq!(config.nodes.len(), 1);
        assert!(config.resolver().resolve("PLAZA").is_ok());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[logging]\nformat = \"xml\"").unwrap();

        let result = TravelEtaConfig::load_from_path(Some(file.path().to_path_buf()));
        assert!(result.unwrap_err().to_string().contains("Invalid log format"));
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = TravelEtaConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("traveleta"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
