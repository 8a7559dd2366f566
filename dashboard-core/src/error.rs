use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong while resolving a location into a snapshot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    /// The provider could not be reached at all.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-success status.
    #[error("Provider request failed with status {status}: {body}")]
    Provider { status: u16, body: String },

    /// Geocoding yielded zero matches.
    #[error("Location not found: {0}")]
    PlaceNotFound(String),

    /// A required field was missing or had the wrong shape.
    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid coordinates ({lat}, {lon}): latitude must be -90 to 90, longitude must be -180 to 180")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Geolocation permission denied")]
    GeolocationDenied,

    #[error("Geolocation is not available: {0}")]
    GeolocationUnavailable(String),
}

/// Fieldless classification of [`WeatherError`], exposed through session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Provider,
    PlaceNotFound,
    MalformedPayload,
    InvalidCoordinates,
    GeolocationDenied,
    GeolocationUnavailable,
}

impl WeatherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::Network(_) => ErrorKind::Network,
            WeatherError::Provider { .. } => ErrorKind::Provider,
            WeatherError::PlaceNotFound(_) => ErrorKind::PlaceNotFound,
            WeatherError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            WeatherError::InvalidCoordinates { .. } => ErrorKind::InvalidCoordinates,
            WeatherError::GeolocationDenied => ErrorKind::GeolocationDenied,
            WeatherError::GeolocationUnavailable(_) => ErrorKind::GeolocationUnavailable,
        }
    }

    pub fn is_geolocation(&self) -> bool {
        matches!(
            self,
            WeatherError::GeolocationDenied | WeatherError::GeolocationUnavailable(_)
        )
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(WeatherError::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(
            WeatherError::Provider { status: 401, body: String::new() }.kind(),
            ErrorKind::Provider
        );
        assert_eq!(WeatherError::GeolocationDenied.kind(), ErrorKind::GeolocationDenied);
    }

    #[test]
    fn geolocation_errors_are_flagged() {
        assert!(WeatherError::GeolocationDenied.is_geolocation());
        assert!(WeatherError::GeolocationUnavailable("no gps".into()).is_geolocation());
        assert!(!WeatherError::PlaceNotFound("Atlantis".into()).is_geolocation());
    }

    #[test]
    fn provider_error_mentions_status() {
        let err = WeatherError::Provider { status: 503, body: "down".into() };
        assert!(err.to_string().contains("503"));
    }
}
