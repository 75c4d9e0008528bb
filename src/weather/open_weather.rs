//! OpenWeatherMap current weather client

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{WeatherObservation, WeatherProvider};
use crate::config::WeatherConfig;
use crate::{Result, TravelEtaError, http_client};

pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    units: String,
}

impl OpenWeatherClient {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            units: config.units.clone(),
        })
    }

    fn url(&self, city_id: &str, api_key: &str) -> String {
        format!(
            "{}/weather?id={}&appid={}&units={}",
            self.base_url,
            urlencoding::encode(city_id),
            urlencoding::encode(api_key),
            urlencoding::encode(&self.units)
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn current_conditions(&self, city_id: &str) -> Result<WeatherObservation> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| TravelEtaError::config("Missing weather API key"))?;

        debug!("Calling the weather API");
        let response = self.client.get(self.url(city_id, api_key)).send().await?;
        let http_status = response.status();
        let body = response.text().await?;

        // Error bodies carry their own `cod`, so parse regardless of the HTTP status
        let parsed: CurrentWeatherResponse = serde_json::from_str(&body).map_err(|e| {
            TravelEtaError::api(format!(
                "Malformed weather response (HTTP {http_status}): {e}"
            ))
        })?;

        let code = parsed.cod.as_u16();
        if code != Some(200) {
            let message = parsed.message.unwrap_or_else(|| "no message".to_string());
            warn!("Weather provider returned status {:?}: {}", parsed.cod, message);
            return Err(TravelEtaError::api(format!(
                "Weather provider status {}: {}",
                parsed.cod, message
            )));
        }

        let condition = parsed
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| TravelEtaError::api("Weather response has no condition entries"))?;

        Ok(WeatherObservation {
            category: condition.main,
            description: condition.description,
            temperature_c: parsed.main.map(|m| m.temp),
            location_name: parsed.name,
        })
    }
}

/// `cod` is numeric on success but often a string on errors
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusCode {
    Number(u16),
    Text(String),
}

impl StatusCode {
    fn as_u16(&self) -> Option<u16> {
        match self {
            StatusCode::Number(code) => Some(*code),
            StatusCode::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Number(code) => write!(f, "{code}"),
            StatusCode::Text(text) => write!(f, "{text}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    cod: StatusCode,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    weather: Vec<ConditionEntry>,
    #[serde(default)]
    main: Option<MainReadings>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server, api_key: Option<&str>) -> OpenWeatherClient {
        let config = WeatherConfig {
            base_url: server.url(),
            api_key: api_key.map(str::to_string),
            ..WeatherConfig::default()
        };
        OpenWeatherClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_parses_success_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Regex(r"^/weather".to_string()))
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "3936456".into()),
                Matcher::UrlEncoded("appid".into(), "test_key_123".into()),
                Matcher::UrlEncoded("units".into(), "metric".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"cod":200,"name":"Puno","weather":[{"main":"Clear","description":"clear sky"}],"main":{"temp":11.5}}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key_123"));
        let observation = client.current_conditions("3936456").await.unwrap();

        assert_eq!(observation.category, "Clear");
        assert_eq!(observation.description.as_deref(), Some("clear sky"));
        assert_eq!(observation.temperature_c, Some(11.5));
        assert_eq!(observation.location_name.as_deref(), Some("Puno"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_cod_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/weather".to_string()))
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"cod":401,"message":"Invalid API key"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("bad_key_123"));
        let err = client.current_conditions("3936456").await.unwrap_err();
        assert!(matches!(err, TravelEtaError::Api { .. }));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_string_cod_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/weather".to_string()))
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"cod":"404","message":"city not found"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key_123"));
        let err = client.current_conditions("0").await.unwrap_err();
        assert!(err.to_string().contains("city not found"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", Matcher::Regex(r"^/weather".to_string()))
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let client = client_for(&server, Some("test_key_123"));
        let err = client.current_conditions("3936456").await.unwrap_err();
        assert!(err.to_string().contains("Malformed weather response"));
    }

    #[tokio::test]
    async fn test_missing_api_key_skips_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server, None);
        let err = client.current_conditions("3936456").await.unwrap_err();
        assert!(matches!(err, TravelEtaError::Config { .. }));
        mock.assert_async().await;
    }
}
