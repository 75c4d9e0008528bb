//! Location Resolution Module
//!
//! Maps the short node labels of the fixed map to coordinates. Labels are
//! trimmed and upper-cased before lookup; a coordinate literal such as
//! `(-15.84, -70.02)` is accepted as a free endpoint.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Coordinate, ResolvedPoint};
use crate::{Result, TravelEtaError};

/// Built-in node table around Puno, Perú
pub const BUILTIN_NODES: &[(&str, Coordinate)] = &[
    ("A", Coordinate::new(-15.8375, -70.0210)),
    ("B", Coordinate::new(-15.8400, -70.0150)),
    ("C", Coordinate::new(-15.8435, -70.0200)),
    ("D", Coordinate::new(-15.8450, -70.0300)),
];

/// Read-only label table, built once at startup
#[derive(Debug, Clone)]
pub struct CoordinateResolver {
    nodes: BTreeMap<String, Coordinate>,
}

impl Default for CoordinateResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CoordinateResolver {
    /// Build a resolver from `(label, coordinate)` pairs. Labels are normalized.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinate)>,
        S: AsRef<str>,
    {
        let nodes = nodes
            .into_iter()
            .map(|(label, coordinate)| (normalize_label(label.as_ref()), coordinate))
            .collect();
        Self { nodes }
    }

    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_NODES.iter().copied())
    }

    /// Resolve a single label or coordinate literal
    pub fn resolve(&self, input: &str) -> Result<ResolvedPoint> {
        let label = normalize_label(input);

        if let Some(coordinate) = self.nodes.get(&label) {
            debug!("Resolved node {} to ({}, {})", label, coordinate.latitude, coordinate.longitude);
            return Ok(ResolvedPoint::new(label, *coordinate));
        }

        if let Some(coordinate) = Coordinate::parse_literal(input) {
            debug!("Using coordinate literal {}", coordinate.format_literal());
            return Ok(ResolvedPoint::new(coordinate.format_literal(), coordinate));
        }

        Err(TravelEtaError::invalid_node(input.trim()))
    }

    /// Resolve both endpoints; fails on the first invalid one
    pub fn resolve_pair(&self, start: &str, end: &str) -> Result<(ResolvedPoint, ResolvedPoint)> {
        let start = self.resolve(start)?;
        let end = self.resolve(end)?;
        Ok((start, end))
    }

    /// Closest named node to `coordinate` and its great-circle distance in km
    #[must_use]
    pub fn nearest(&self, coordinate: &Coordinate) -> Option<(&str, f64)> {
        self.nodes
            .iter()
            .map(|(label, node)| (label.as_str(), coordinate.distance_km(node)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.nodes.iter().map(|(label, coordinate)| (label.as_str(), coordinate))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Trim and upper-case a user supplied label
#[must_use]
pub fn normalize_label(input: &str) -> String {
    input.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A", -15.8375, -70.0210)]
    #[case(" b ", -15.8400, -70.0150)]
    #[case("c", -15.8435, -70.0200)]
    #[case("D\n", -15.8450, -70.0300)]
    fn test_resolve_builtin_labels(#[case] input: &str, #[case] lat: f64, #[case] lon: f64) {
        let resolver = CoordinateResolver::builtin();
        let point = resolver.resolve(input).unwrap();
        assert_eq!(point.coordinate, Coordinate::new(lat, lon));
        assert_eq!(point.label, input.trim().to_uppercase());
    }

    #[rstest]
    #[case("Z")]
    #[case("")]
    #[case("AB")]
    #[case("(1000, 5)")]
    fn test_resolve_unknown_label(#[case] input: &str) {
        let resolver = CoordinateResolver::builtin();
        let err = resolver.resolve(input).unwrap_err();
        assert!(matches!(err, TravelEtaError::InvalidNode { .. }));
    }

    #[test]
    fn test_resolve_coordinate_literal() {
        let resolver = CoordinateResolver::builtin();
        let point = resolver.resolve("(-15.841, -70.022)").unwrap();
        assert_eq!(point.coordinate, Coordinate::new(-15.841, -70.022));
        assert_eq!(point.label, "(-15.841, -70.022)");
    }

    #[test]
    fn test_resolve_pair_reports_invalid_endpoint() {
        let resolver = CoordinateResolver::builtin();
        assert!(resolver.resolve_pair("a", "b").is_ok());

        let err = resolver.resolve_pair("A", "X").unwrap_err();
        assert!(matches!(err, TravelEtaError::InvalidNode { ref label } if label == "X"));
    }

    #[test]
    fn test_custom_table_normalizes_labels() {
        let resolver = CoordinateResolver::new([("plaza", Coordinate::new(-15.84, -70.02))]);
        assert_eq!(resolver.len(), 1);
        assert!(resolver.resolve("PLAZA").is_ok());
        assert!(resolver.resolve("A").is_err());
    }

    #[test]
    fn test_nearest_node() {
        let resolver = CoordinateResolver::builtin();
        let (label, km) = resolver.nearest(&Coordinate::new(-15.8376, -70.0211)).unwrap();
        assert_eq!(label, "A");
        assert!(km < 0.05);

        assert!(CoordinateResolver::new(Vec::<(&str, Coordinate)>::new())
            .nearest(&Coordinate::new(0.0, 0.0))
            .is_none());
    }
}
