//! Location resolution on top of a [`WeatherProvider`].
//!
//! Turns coordinates or a place name into the pair of raw weather payload and
//! resolved place that the normalizer consumes.

use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{Coordinates, RawWeather, ResolvedPlace},
    provider::WeatherProvider,
};

/// Matches used when resolving a single place.
const RESOLVE_LIMIT: u8 = 1;
/// Matches offered to autocomplete-style search.
pub const SEARCH_LIMIT: u8 = 5;

#[derive(Debug)]
pub struct WeatherClient {
    provider: Box<dyn WeatherProvider>,
}

impl WeatherClient {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    /// Weather plus reverse-geocoded place for a coordinate pair.
    ///
    /// Both requests run concurrently. The returned place carries the requested
    /// coordinates, not the geocoder's.
    #[instrument(skip(self))]
    pub async fn resolve_by_coordinates(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<(RawWeather, ResolvedPlace), WeatherError> {
        if !Coordinates::new(lat, lon).is_valid() {
            return Err(WeatherError::InvalidCoordinates { lat, lon });
        }

        let (weather, places) = tokio::try_join!(
            self.provider.one_call(lat, lon),
            self.provider.reverse_geocode(lat, lon, RESOLVE_LIMIT),
        )?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::PlaceNotFound(format!("{lat}, {lon}")))?;

        debug!(name = %place.name, country = %place.country, "Reverse geocoded");

        Ok((weather, ResolvedPlace { lat, lon, ..place }))
    }

    /// Forward-geocode `query` to its best match, then fetch weather there.
    #[instrument(skip(self))]
    pub async fn resolve_by_name(
        &self,
        query: &str,
    ) -> Result<(RawWeather, ResolvedPlace), WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::PlaceNotFound(String::new()));
        }

        let place = self
            .provider
            .geocode(query, RESOLVE_LIMIT)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::PlaceNotFound(query.to_string()))?;

        debug!(name = %place.name, lat = place.lat, lon = place.lon, "Geocoded");

        let weather = self.provider.one_call(place.lat, place.lon).await?;
        Ok((weather, place))
    }

    /// Up to five candidate places for `query`, without fetching weather.
    #[instrument(skip(self))]
    pub async fn search_places(&self, query: &str) -> Result<Vec<ResolvedPlace>, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut places = self.provider.geocode(query, SEARCH_LIMIT).await?;
        places.truncate(usize::from(SEARCH_LIMIT));
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug, Default)]
    struct Calls {
        one_call: AtomicUsize,
        reverse: AtomicUsize,
        geocode: AtomicUsize,
    }

    #[derive(Debug)]
    struct FakeProvider {
        places: Vec<ResolvedPlace>,
        weather_status: Option<u16>,
        calls: Arc<Calls>,
    }

    impl FakeProvider {
        fn new(places: Vec<ResolvedPlace>) -> (Self, Arc<Calls>) {
            let calls = Arc::new(Calls::default());
            let provider = Self { places, weather_status: None, calls: calls.clone() };
            (provider, calls)
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn one_call(&self, lat: f64, lon: f64) -> Result<RawWeather, WeatherError> {
            self.calls.one_call.fetch_add(1, Ordering::SeqCst);
            match self.weather_status {
                Some(status) => Err(WeatherError::Provider { status, body: "nope".into() }),
                None => Ok(RawWeather(json!({ "lat": lat, "lon": lon }))),
            }
        }

        async fn reverse_geocode(
            &self,
            _lat: f64,
            _lon: f64,
            limit: u8,
        ) -> Result<Vec<ResolvedPlace>, WeatherError> {
            self.calls.reverse.fetch_add(1, Ordering::SeqCst);
            Ok(self.places.iter().take(limit.into()).cloned().collect())
        }

        async fn geocode(
            &self,
            _query: &str,
            _limit: u8,
        ) -> Result<Vec<ResolvedPlace>, WeatherError> {
            self.calls.geocode.fetch_add(1, Ordering::SeqCst);
            Ok(self.places.clone())
        }
    }

    fn place(name: &str, lat: f64, lon: f64) -> ResolvedPlace {
        ResolvedPlace { name: name.into(), country: "XX".into(), state: None, lat, lon }
    }

    fn many_places() -> Vec<ResolvedPlace> {
        (0..8).map(|i| place(&format!("Springfield {i}"), 40.0 + f64::from(i), -89.0)).collect()
    }

    #[tokio::test]
    async fn coordinates_resolution_keeps_requested_coordinates() {
        let (provider, calls) = FakeProvider::new(vec![place("Westminster", 51.4995, -0.1248)]);
        let client = WeatherClient::new(Box::new(provider));

        let (raw, resolved) = client.resolve_by_coordinates(51.5, -0.12).await.unwrap();

        assert_eq!(resolved.name, "Westminster");
        assert_eq!(resolved.lat, 51.5);
        assert_eq!(resolved.lon, -0.12);
        assert_eq!(raw.0["lat"], 51.5);
        assert_eq!(calls.one_call.load(Ordering::SeqCst), 1);
        assert_eq!(calls.reverse.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn coordinates_without_place_is_not_found() {
        let (provider, _) = FakeProvider::new(vec![]);
        let client = WeatherClient::new(Box::new(provider));

        let err = client.resolve_by_coordinates(0.0, -160.0).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PlaceNotFound);
    }

    #[tokio::test]
    async fn invalid_coordinates_make_no_calls() {
        let (provider, calls) = FakeProvider::new(vec![place("x", 0.0, 0.0)]);
        let client = WeatherClient::new(Box::new(provider));

        let err = client.resolve_by_coordinates(95.0, 0.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCoordinates { .. }));
        assert_eq!(calls.one_call.load(Ordering::SeqCst), 0);
        assert_eq!(calls.reverse.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_status_error_propagates() {
        let (mut provider, _) = FakeProvider::new(vec![place("x", 1.0, 1.0)]);
        provider.weather_status = Some(401);
        let client = WeatherClient::new(Box::new(provider));

        let err = client.resolve_by_coordinates(1.0, 1.0).await.unwrap_err();
        assert_eq!(err, WeatherError::Provider { status: 401, body: "nope".into() });
    }

    #[tokio::test]
    async fn name_resolution_uses_best_match() {
        let (provider, calls) = FakeProvider::new(many_places());
        let client = WeatherClient::new(Box::new(provider));

        let (raw, resolved) = client.resolve_by_name("  Springfield ").await.unwrap();

        assert_eq!(resolved.name, "Springfield 0");
        assert_eq!(raw.0["lat"], 40.0);
        assert_eq!(calls.geocode.load(Ordering::SeqCst), 1);
        assert_eq!(calls.one_call.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn name_without_match_is_not_found_and_skips_weather() {
        let (provider, calls) = FakeProvider::new(vec![]);
        let client = WeatherClient::new(Box::new(provider));

        let err = client.resolve_by_name("Atlantis").await.unwrap_err();
        assert_eq!(err, WeatherError::PlaceNotFound("Atlantis".into()));
        assert_eq!(calls.one_call.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_name_is_not_found_without_network() {
        let (provider, calls) = FakeProvider::new(many_places());
        let client = WeatherClient::new(Box::new(provider));

        assert!(client.resolve_by_name("   ").await.is_err());
        assert_eq!(calls.geocode.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_is_capped_at_five() {
        let (provider, calls) = FakeProvider::new(many_places());
        let client = WeatherClient::new(Box::new(provider));

        let places = client.search_places("Springfield").await.unwrap();

        assert_eq!(places.len(), 5);
        assert_eq!(places[4].name, "Springfield 4");
        assert_eq!(calls.one_call.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_search_makes_no_call() {
        let (provider, calls) = FakeProvider::new(many_places());
        let client = WeatherClient::new(Box::new(provider));

        assert!(client.search_places("").await.unwrap().is_empty());
        assert_eq!(calls.geocode.load(Ordering::SeqCst), 0);
    }
}
