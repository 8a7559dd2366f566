use crate::{
    Config,
    error::WeatherError,
    model::{RawWeather, ResolvedPlace},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Transport seam between the client and a weather/geocoding service.
///
/// Each call is a single outbound request: no caching, no retry.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current, hourly and daily weather for a coordinate pair.
    async fn one_call(&self, lat: f64, lon: f64) -> Result<RawWeather, WeatherError>;

    /// Places near a coordinate pair, best match first.
    async fn reverse_geocode(
        &self,
        lat: f64,
        lon: f64,
        limit: u8,
    ) -> Result<Vec<ResolvedPlace>, WeatherError>;

    /// Places matching a free-form name, best match first.
    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<ResolvedPlace>, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key()?;
    let provider = OpenWeatherProvider::new(api_key.to_owned(), config.provider.clone())?;
    Ok(Box::new(provider))
}
