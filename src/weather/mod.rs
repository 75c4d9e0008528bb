//! Weather propositions from a remote weather provider.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::Result;

pub mod open_weather;

pub use open_weather::OpenWeatherClient;

/// Current conditions as reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Primary condition category, e.g. "Rain", "Clouds"
    pub category: String,
    /// Human-readable description from the provider
    pub description: Option<String>,
    /// Temperature in Celsius
    pub temperature_c: Option<f64>,
    /// Provider's name for the queried city
    pub location_name: Option<String>,
}

impl WeatherObservation {
    pub fn new<S: Into<String>>(category: S) -> Self {
        Self {
            category: category.into(),
            description: None,
            temperature_c: None,
            location_name: None,
        }
    }
}

/// A remote source of current weather, keyed by a city identifier
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(&self, city_id: &str) -> Result<WeatherObservation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Rain,
    Snow,
    Clear,
    Unknown,
}

impl WeatherCondition {
    /// Display label used in the weather output region
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            WeatherCondition::Rain => "Lluvia",
            WeatherCondition::Snow => "Nieve",
            WeatherCondition::Clear => "Despejado",
            WeatherCondition::Unknown => "Desconocido",
        }
    }
}

/// Weather propositions for one estimation request.
/// At most one flag is set; all false means unknown weather.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherState {
    pub rain: bool,
    pub snow: bool,
    pub clear: bool,
}

impl WeatherState {
    /// Match a provider category case-insensitively against rain/snow/clear
    #[must_use]
    pub fn from_category(category: &str) -> Self {
        let category = category.trim().to_lowercase();
        Self {
            rain: category == "rain",
            snow: category == "snow",
            clear: category == "clear",
        }
    }

    #[must_use]
    pub fn condition(&self) -> WeatherCondition {
        if self.rain {
            WeatherCondition::Rain
        } else if self.snow {
            WeatherCondition::Snow
        } else if self.clear {
            WeatherCondition::Clear
        } else {
            WeatherCondition::Unknown
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        self.condition().label()
    }

    /// Text for the weather output region, e.g. "Clima: Despejado"
    #[must_use]
    pub fn display_text(&self) -> String {
        format!("Clima: {}", self.label())
    }
}

/// Turns provider observations into weather propositions.
/// Provider failures degrade to the all-false (unknown) state.
#[derive(Clone)]
pub struct WeatherEstimator {
    provider: Arc<dyn WeatherProvider>,
    city_id: String,
}

impl WeatherEstimator {
    pub fn new<S: Into<String>>(provider: Arc<dyn WeatherProvider>, city_id: S) -> Self {
        Self {
            provider,
            city_id: city_id.into(),
        }
    }

    #[must_use]
    pub fn city_id(&self) -> &str {
        &self.city_id
    }

    pub async fn current_weather_state(&self) -> WeatherState {
        match self.provider.current_conditions(&self.city_id).await {
            Ok(observation) => {
                let state = WeatherState::from_category(&observation.category);
                debug!(
                    "Weather for city {}: {} -> {:?}",
                    self.city_id,
                    observation.category,
                    state.condition()
                );
                state
            }
            Err(e) => {
                error!("Failed to fetch weather for city {}: {}", self.city_id, e);
                WeatherState::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TravelEtaError;
    use rstest::rstest;

    struct FixedWeather(Option<&'static str>);

    #[async_trait]
    impl WeatherProvider for FixedWeather {
        async fn current_conditions(&self, _city_id: &str) -> Result<WeatherObservation> {
            match self.0 {
                Some(category) => Ok(WeatherObservation::new(category)),
                None => Err(TravelEtaError::api("status 401")),
            }
        }
    }

    #[rstest]
    #[case("Rain", WeatherState { rain: true, snow: false, clear: false }, "Lluvia")]
    #[case("SNOW", WeatherState { rain: false, snow: true, clear: false }, "Nieve")]
    #[case("clear", WeatherState { rain: false, snow: false, clear: true }, "Despejado")]
    #[case("Clouds", WeatherState::default(), "Desconocido")]
    #[case("Drizzle", WeatherState::default(), "Desconocido")]
    #[case("", WeatherState::default(), "Desconocido")]
    fn test_from_category(
        #[case] category: &str,
        #[case] expected: WeatherState,
        #[case] label: &str,
    ) {
        let state = WeatherState::from_category(category);
        assert_eq!(state, expected);
        assert_eq!(state.label(), label);
    }

    #[test]
    fn test_unknown_category_display_text() {
        let state = WeatherState::from_category("clouds");
        assert!(!state.rain && !state.snow && !state.clear);
        assert_eq!(state.display_text(), "Clima: Desconocido");
    }

    #[tokio::test]
    async fn test_estimator_maps_observation() {
        let estimator = WeatherEstimator::new(Arc::new(FixedWeather(Some("Rain"))), "3936456");
        let state = estimator.current_weather_state().await;
        assert!(state.rain);
        assert_eq!(estimator.city_id(), "3936456");
    }

    #[tokio::test]
    async fn test_estimator_failure_degrades_to_unknown() {
        let estimator = WeatherEstimator::new(Arc::new(FixedWeather(None)), "3936456");
        let state = estimator.current_weather_state().await;
        assert_eq!(state, WeatherState::default());
        assert_eq!(state.condition(), WeatherCondition::Unknown);
    }
}
