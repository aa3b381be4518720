//! Current weather from the `OpenWeatherMap` API

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::models::{Location, WeatherCondition, WeatherObservation};
use crate::{Result, SkyframeError};

const SERVICE: &str = "OpenWeatherMap";
const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Source of the current weather at a location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_weather(&self, location: &Location) -> Result<WeatherObservation>;
}

/// `OpenWeatherMap` current-weather client
pub struct OpenWeatherMapClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherMapClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Skyframe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SkyframeError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    fn request_url(&self, location: &Location) -> String {
        format!(
            "{}/weather?lat={}&lon={}&appid={}",
            self.base_url,
            location.latitude,
            location.longitude,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    #[instrument(skip(self, location), fields(location = %location.name))]
    async fn current_weather(&self, location: &Location) -> Result<WeatherObservation> {
        let start_time = Instant::now();
        let url = self.request_url(location);
        debug!(
            "Requesting current weather for {}",
            location.format_coordinates()
        );

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => SkyframeError::collaborator(SERVICE, "Invalid API key (HTTP 401)"),
                429 => SkyframeError::collaborator(SERVICE, "Rate limit exceeded (HTTP 429)"),
                _ => SkyframeError::collaborator(SERVICE, format!("HTTP {status}: {body}")),
            });
        }

        let payload: CurrentWeatherResponse = response.json().await.map_err(|e| {
            SkyframeError::collaborator(SERVICE, format!("Failed to parse response: {e}"))
        })?;
        let observation = payload.into_observation()?;

        let elapsed = start_time.elapsed();
        info!(
            "Current weather: {} at {:.1}°C ({:.3}s)",
            observation.condition,
            observation.temperature_celsius(),
            elapsed.as_secs_f64()
        );
        if elapsed.as_secs() > 5 {
            warn!("Slow weather response: {:.3}s", elapsed.as_secs_f64());
        }

        Ok(observation)
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    weather: Vec<WeatherEntry>,
    main: MainReadings,
}

#[derive(Debug, Deserialize)]
struct WeatherEntry {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    /// Kelvin, the API's default unit
    temp: f64,
}

impl CurrentWeatherResponse {
    fn into_observation(self) -> Result<WeatherObservation> {
        let description = self
            .weather
            .into_iter()
            .next()
            .map(|entry| entry.description)
            .ok_or_else(|| SkyframeError::collaborator(SERVICE, "Response has no weather entry"))?;

        let condition: WeatherCondition = description.parse()?;
        Ok(WeatherObservation::new(condition, self.main.temp))
    }
}
