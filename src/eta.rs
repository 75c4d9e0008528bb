//! Travel time estimation from distance, traffic and weather.

use serde::{Deserialize, Serialize};

use crate::traffic::TrafficState;
use crate::weather::WeatherState;
use crate::{Result, TravelEtaError};

/// Free-flow average speed
pub const AVERAGE_SPEED_KMH: f64 = 50.0;

/// Slowdown factor for the given traffic and weather propositions.
/// First matching rule wins.
#[must_use]
pub fn multiplier(traffic: &TrafficState, weather: &WeatherState) -> f64 {
    if traffic.morning_rush || traffic.evening_rush {
        return if weather.rain { 3.5 } else { 2.5 };
    }
    if traffic.normal_traffic {
        return if weather.clear { 1.0 } else { 1.8 };
    }
    1.0
}

/// Minutes to cover `distance_km` at [`AVERAGE_SPEED_KMH`], scaled by `multiplier`
#[must_use]
pub fn estimate_minutes(distance_km: f64, multiplier: f64) -> f64 {
    estimate_minutes_at(distance_km, multiplier, AVERAGE_SPEED_KMH)
}

fn estimate_minutes_at(distance_km: f64, multiplier: f64, speed_kmh: f64) -> f64 {
    (distance_km / speed_kmh) * multiplier * 60.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EtaResult {
    pub distance_km: f64,
    pub multiplier: f64,
    pub minutes: f64,
}

impl EtaResult {
    /// e.g. "Tiempo estimado: 6.00 minutos"
    #[must_use]
    pub fn time_text(&self) -> String {
        format!("Tiempo estimado: {:.2} minutos", self.minutes)
    }

    /// e.g. "Distancia: 5.00 km"
    #[must_use]
    pub fn distance_text(&self) -> String {
        format!("Distancia: {:.2} km", self.distance_km)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaCalculator {
    average_speed_kmh: f64,
}

impl Default for EtaCalculator {
    fn default() -> Self {
        Self {
            average_speed_kmh: AVERAGE_SPEED_KMH,
        }
    }
}

impl EtaCalculator {
    pub fn new(average_speed_kmh: f64) -> Result<Self> {
        if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
            return Err(TravelEtaError::validation(format!(
                "Average speed must be positive, got {average_speed_kmh}"
            )));
        }
        Ok(Self { average_speed_kmh })
    }

    #[must_use]
    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }

    /// Estimate for a provider distance. Negative or non-finite distances are
    /// rejected; zero yields zero minutes.
    pub fn estimate(
        &self,
        distance_km: f64,
        traffic: &TrafficState,
        weather: &WeatherState,
    ) -> Result<EtaResult> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(TravelEtaError::validation(format!(
                "Distance must be a non-negative number of kilometers, got {distance_km}"
            )));
        }

        let multiplier = multiplier(traffic, weather);
        Ok(EtaResult {
            distance_km,
            multiplier,
            minutes: estimate_minutes_at(distance_km, multiplier, self.average_speed_kmh),
        })
    }
}
