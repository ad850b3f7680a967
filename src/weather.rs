//! Weather polling
//!
//! Fetches current conditions from an Open-Meteo compatible forecast
//! endpoint and writes them into the environment snapshot.

use std::time::Duration;

use serde::Deserialize;

use crate::environment::SnapshotWriter;
use crate::{Error, Result};

/// Default forecast API
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com";

/// Default poll period (15 minutes)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(900);

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: i64,
}

/// One successful weather reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherReading {
    pub temperature_label: String,
    pub condition_label: String,
}

/// Map a weather code to a short label
///
/// Deliberately coarse: 0 is clear, 1-3 partly cloudy, 51 and up rainy,
/// and everything else (including 4-50) is unknown.
#[must_use]
pub const fn classify(code: i64) -> &'static str {
    match code {
        0 => "Clear Sky",
        1..=3 => "Partly Cloudy",
        c if c >= 51 => "Rainy",
        _ => "Unknown",
    }
}

/// Format a temperature for display, rounding halves up
#[must_use]
pub fn temperature_label(celsius: f64) -> String {
    // Adding 0.0 turns -0 into 0
    let rounded = (celsius + 0.5).floor() + 0.0;
    format!("{rounded}°C")
}

/// Polls the forecast endpoint for one location
pub struct WeatherSource {
    client: reqwest::Client,
    base_url: String,
    latitude: f64,
    longitude: f64,
}

impl WeatherSource {
    /// Create a weather source for a location
    #[must_use]
    pub fn new(base_url: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            latitude,
            longitude,
        }
    }

    /// Fetch current conditions
    ///
    /// # Errors
    ///
    /// Returns error on network failure, non-success status or an
    /// unexpected response shape
    pub async fn fetch(&self) -> Result<WeatherReading> {
        let url = format!("{}/v1/forecast", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", self.latitude.to_string()),
                ("longitude", self.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Weather(format!("forecast API returned {status}")));
        }

        let body: ForecastResponse = response.json().await?;
        let current = body.current_weather;

        Ok(WeatherReading {
            temperature_label: temperature_label(current.temperature),
            condition_label: classify(current.weathercode).to_string(),
        })
    }

    /// Fetch and store into the snapshot
    ///
    /// Failures are logged and swallowed; the previous values stay in place.
    pub async fn poll(&self, writer: &SnapshotWriter) {
        match self.fetch().await {
            Ok(reading) => {
                tracing::info!(
                    temperature = %reading.temperature_label,
                    condition = %reading.condition_label,
                    "weather updated"
                );
                writer.update_weather(reading.temperature_label, reading.condition_label);
            }
            Err(e) => {
                tracing::warn!(error = %e, "weather poll failed, keeping previous reading");
            }
        }
    }

    /// Poll immediately, then every `period`, until the task is dropped
    pub async fn run(self, writer: SnapshotWriter, period: Duration) {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            self.poll(&writer).await;
        }
    }
}
