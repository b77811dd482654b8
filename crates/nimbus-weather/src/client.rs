//! `OpenWeatherMap` current-weather client.

use std::time::Duration;

use async_trait::async_trait;
use nimbus_settings::WeatherSettings;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::errors::WeatherError;
use crate::types::{WeatherLookup, WeatherRecord};

// ── Provider response shape ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct CurrentWeather {
    main: MainBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    wind: WindBlock,
    name: String,
}

#[derive(Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct ConditionBlock {
    description: String,
}

#[derive(Deserialize)]
struct WindBlock {
    speed: f64,
}

#[derive(Deserialize)]
struct ProviderError {
    message: Option<String>,
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i64 {
    value.round() as i64
}

impl TryFrom<CurrentWeather> for WeatherRecord {
    type Error = WeatherError;

    fn try_from(data: CurrentWeather) -> Result<Self, Self::Error> {
        let conditions = data
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .ok_or_else(|| WeatherError::Decode("missing weather conditions".into()))?;
        Ok(Self {
            temperature: round(data.main.temp),
            conditions,
            humidity: round(data.main.humidity),
            wind_speed: round(data.wind.speed),
            city: data.name,
        })
    }
}

// ── Client ──────────────────────────────────────────────────────────────────

/// HTTP client for the provider's `/weather` endpoint.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    units: String,
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherClient {
    /// Build a client from weather settings. Fails if no API key is set.
    pub fn from_settings(settings: &WeatherSettings) -> Result<Self, WeatherError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(WeatherError::MissingApiKey)?;
        Self::new(
            api_key,
            &settings.base_url,
            &settings.units,
            Duration::from_millis(settings.timeout_ms),
        )
    }

    /// Build a client with explicit parameters.
    pub fn new(
        api_key: String,
        base_url: &str,
        units: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_owned(),
            units: units.to_owned(),
        })
    }
}

#[async_trait]
impl WeatherLookup for OpenWeatherClient {
    #[instrument(skip(self), fields(city = %city))]
    async fn lookup(&self, city: &str) -> Result<WeatherRecord, WeatherError> {
        let resp = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("city not found upstream");
            return Err(WeatherError::NotFound(city.to_owned()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderError>(&text)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "weather provider error");
            return Err(WeatherError::Api(message));
        }

        let body = resp.text().await?;
        let data: CurrentWeather =
            serde_json::from_str(&body).map_err(|e| WeatherError::Decode(e.to_string()))?;
        WeatherRecord::try_from(data)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(
            "test-key".into(),
            &server.uri(),
            "metric",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn london_body() -> serde_json::Value {
        serde_json::json!({
            "main": { "temp": 14.6, "humidity": 72 },
            "weather": [{ "description": "light rain" }, { "description": "mist" }],
            "wind": { "speed": 4.4 },
            "name": "London"
        })
    }

    #[tokio::test]
    async fn maps_success_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "london"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .mount(&server)
            .await;

        let record = client_for(&server).lookup("london").await.unwrap();
        assert_eq!(
            record,
            WeatherRecord {
                temperature: 15,
                conditions: "light rain".into(),
                humidity: 72,
                wind_speed: 4,
                city: "London".into(),
            }
        );
    }

    #[tokio::test]
    async fn not_found_names_the_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("Atlantis").await.unwrap_err();
        assert_matches!(&err, WeatherError::NotFound(city) if city == "Atlantis");
        assert_eq!(err.to_string(), "City 'Atlantis' not found");
    }

    #[tokio::test]
    async fn other_status_uses_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"cod": 401, "message": "Invalid API key"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("London").await.unwrap_err();
        assert_eq!(err.to_string(), "Weather API error: Invalid API key");
    }

    #[tokio::test]
    async fn other_status_without_message_falls_back_to_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("London").await.unwrap_err();
        assert_eq!(err.to_string(), "Weather API error: HTTP 503");
    }

    #[tokio::test]
    async fn empty_conditions_is_decode_error() {
        let server = MockServer::start().await;
        let mut body = london_body();
        body["weather"] = serde_json::json!([]);
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = client_for(&server).lookup("London").await.unwrap_err();
        assert_matches!(err, WeatherError::Decode(_));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(london_body())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(
            "test-key".into(),
            &server.uri(),
            "metric",
            Duration::from_millis(100),
        )
        .unwrap();
        let err = client.lookup("London").await.unwrap_err();
        assert_matches!(err, WeatherError::Http(_));
    }

    #[test]
    fn from_settings_requires_key() {
        let settings = WeatherSettings::default();
        assert_matches!(
            OpenWeatherClient::from_settings(&settings),
            Err(WeatherError::MissingApiKey)
        );

        let settings = WeatherSettings {
            api_key: Some("k".into()),
            ..WeatherSettings::default()
        };
        assert!(OpenWeatherClient::from_settings(&settings).is_ok());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = OpenWeatherClient::new(
            "k".into(),
            "http://example.test/data/2.5/",
            "metric",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://example.test/data/2.5");
    }
}
