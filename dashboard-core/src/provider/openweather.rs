use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{
    config::ProviderConfig,
    error::WeatherError,
    model::{RawWeather, ResolvedPlace},
};

use super::WeatherProvider;

/// OpenWeather One Call 3.0 + Geocoding 1.0 client.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    settings: ProviderConfig,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, settings: ProviderConfig) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| WeatherError::Network(e.to_string()))?;

        Ok(Self { api_key, settings, http })
    }

    /// Issue a GET and return the body of a successful response.
    async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
        what: &str,
    ) -> Result<String, WeatherError> {
        debug!(url = %url, "Requesting OpenWeather {what}");

        let res = self
            .http
            .get(url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                WeatherError::Network(format!("Failed to send OpenWeather {what} request: {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            WeatherError::Network(format!("Failed to read OpenWeather {what} response body: {e}"))
        })?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "OpenWeather {what} request failed");
            return Err(WeatherError::Provider {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }

    fn parse_places(body: &str) -> Result<Vec<ResolvedPlace>, WeatherError> {
        let parsed: Vec<OwPlace> = serde_json::from_str(body).map_err(|e| {
            WeatherError::MalformedPayload(format!("Failed to parse OpenWeather geocoding JSON: {e}"))
        })?;

        Ok(parsed.into_iter().map(ResolvedPlace::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct OwPlace {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    country: String,
    #[serde(default)]
    state: Option<String>,
}

impl From<OwPlace> for ResolvedPlace {
    fn from(place: OwPlace) -> Self {
        ResolvedPlace {
            name: place.name,
            country: place.country,
            state: place.state,
            lat: place.lat,
            lon: place.lon,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), fields(lat = %lat, lon = %lon))]
    async fn one_call(&self, lat: f64, lon: f64) -> Result<RawWeather, WeatherError> {
        let url = format!("{}/onecall", self.settings.weather_base_url);
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("exclude", "minutely,alerts".to_string()),
            ("units", "metric".to_string()),
        ];

        let body = self.get_text(&url, &params, "one call").await?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            WeatherError::MalformedPayload(format!("Failed to parse OpenWeather one call JSON: {e}"))
        })?;

        Ok(RawWeather(value))
    }

    #[instrument(skip(self), fields(lat = %lat, lon = %lon))]
    async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
        limit: u8,
    ) -> Result<Vec<ResolvedPlace>, WeatherError> {
        let url = format!("{}/reverse", self.settings.geo_base_url);
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("limit", limit.to_string()),
        ];

        let body = self.get_text(&url, &params, "reverse geocoding").await?;
        Self::parse_places(&body)
    }

    #[instrument(skip(self))]
    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<ResolvedPlace>, WeatherError> {
        let url = format!("{}/direct", self.settings.geo_base_url);
        let params = [("q", query.to_string()), ("limit", limit.to_string())];

        let body = self.get_text(&url, &params, "geocoding").await?;
        Self::parse_places(&body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
