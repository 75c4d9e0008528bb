//! Location model for geographic coordinates

use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};

use crate::{Result, TravelEtaError};

/// A (latitude, longitude) pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a coordinate, rejecting values outside the WGS84 ranges
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coordinate = Self::new(latitude, longitude);
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(TravelEtaError::validation(format!(
                "Coordinates out of range: lat={latitude}, lng={longitude}"
            )))
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Build from a GeoJSON / OSRM position, which is ordered `[lon, lat]`
    #[must_use]
    pub fn from_lon_lat(position: [f64; 2]) -> Self {
        Self::new(position[1], position[0])
    }

    #[must_use]
    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Text written into the start field by the device location action
    #[must_use]
    pub fn format_literal(&self) -> String {
        format!("({}, {})", self.latitude, self.longitude)
    }

    /// Parse `(lat, lng)` or `lat,lng`
    #[must_use]
    pub fn parse_literal(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let inner = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);

        let (lat, lng) = inner.split_once(',')?;
        let latitude = lat.trim().parse::<f64>().ok()?;
        let longitude = lng.trim().parse::<f64>().ok()?;
        Self::try_new(latitude, longitude).ok()
    }

    /// Great-circle distance in kilometers
    #[must_use]
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let from = HaversineLocation {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        let to = HaversineLocation {
            latitude: other.latitude,
            longitude: other.longitude,
        };
        distance(from, to, Units::Kilometers)
    }
}

/// An endpoint after label resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPoint {
    /// Normalized label, or the coordinate literal for free coordinates
    pub label: String,
    pub coordinate: Coordinate,
}

impl ResolvedPoint {
    #[must_use]
    pub fn new<S: Into<String>>(label: S, coordinate: Coordinate) -> Self {
        Self {
            label: label.into(),
            coordinate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_literal_with_parentheses() {
        let coordinate = Coordinate::parse_literal("(-15.8375, -70.021)").unwrap();
        assert_eq!(coordinate, Coordinate::new(-15.8375, -70.021));
    }

    #[test]
    fn test_parse_literal_without_parentheses() {
        let coordinate = Coordinate::parse_literal(" -15.84,-70.015 ").unwrap();
        assert_eq!(coordinate, Coordinate::new(-15.84, -70.015));
    }

    #[test]
    fn test_parse_literal_rejects_garbage() {
        assert!(Coordinate::parse_literal("A").is_none());
        assert!(Coordinate::parse_literal("(1.0)").is_none());
        assert!(Coordinate::parse_literal("(95.0, 10.0)").is_none());
        assert!(Coordinate::parse_literal("(abc, 10.0)").is_none());
    }

    #[test]
    fn test_literal_round_trip_of_device_location_text() {
        let coordinate = Coordinate::new(-15.840221, -70.02188);
        assert_eq!(coordinate.format_literal(), "(-15.840221, -70.02188)");
        assert_eq!(
            Coordinate::parse_literal(&coordinate.format_literal()),
            Some(coordinate)
        );
    }

    #[test]
    fn test_lon_lat_flip() {
        let coordinate = Coordinate::from_lon_lat([-70.0210, -15.8375]);
        assert_eq!(coordinate.latitude, -15.8375);
        assert_eq!(coordinate.longitude, -70.0210);
        assert_eq!(coordinate.to_lon_lat(), [-70.0210, -15.8375]);
    }

    #[test]
    fn test_try_new_range_checks() {
        assert!(Coordinate::try_new(-15.8, -70.0).is_ok());
        assert!(Coordinate::try_new(-91.0, 0.0).is_err());
        assert!(Coordinate::try_new(0.0, 181.0).is_err());
        assert!(Coordinate::try_new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_km() {
        let a = Coordinate::new(-15.8375, -70.0210);
        assert_relative_eq!(a.distance_km(&a), 0.0);

        // One degree of latitude is roughly 111 km
        let north = Coordinate::new(-14.8375, -70.0210);
        let d = a.distance_km(&north);
        assert!(d > 110.0 && d < 112.5, "unexpected distance {d}");
    }
}
