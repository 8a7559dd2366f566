//! Device position lookup.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::WeatherError, model::Coordinates};

#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    /// Current device coordinates, or a denial/unavailable failure.
    async fn current_position(&self) -> Result<Coordinates, WeatherError>;
}

/// A position known up front, e.g. from configuration or command-line flags.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl Geolocator for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates, WeatherError> {
        if !self.0.is_valid() {
            return Err(WeatherError::GeolocationUnavailable(format!(
                "configured position ({}, {}) is out of range",
                self.0.lat, self.0.lon
            )));
        }
        Ok(self.0)
    }
}

/// Used when the platform offers no way to locate the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl Geolocator for NoGeolocation {
    async fn current_position(&self) -> Result<Coordinates, WeatherError> {
        Err(WeatherError::GeolocationUnavailable(
            "no device position configured".to_string(),
        ))
    }
}

/// Pick a geolocator for an optional configured position.
pub fn geolocator_for(position: Option<Coordinates>) -> Box<dyn Geolocator> {
    match position {
        Some(coords) => Box::new(FixedPosition(coords)),
        None => Box::new(NoGeolocation),
    }
}
