//! Data models for the TravelETA library
//!
//! - Location: geographic coordinates and resolved map points

pub mod location;

pub use location::{Coordinate, ResolvedPoint};
