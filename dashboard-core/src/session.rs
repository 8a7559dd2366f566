//! Session controller: drives resolutions and publishes observable state.
//!
//! Every resolution (geolocation, picking a location, searching by name) moves
//! the session through `Loading` into either `Ready` or `Failed`. Requests may
//! overlap; each one takes a token from a monotonically increasing counter and
//! only the most recently started one is allowed to touch the state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::{
    client::WeatherClient,
    error::{ErrorKind, WeatherError},
    geolocation::Geolocator,
    model::{Location, WeatherSnapshot},
    normalize::normalize,
    store::LocationStore,
};

/// Why the last resolution failed, in user-facing terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Ready(Arc<WeatherSnapshot>),
    Failed(Failure),
}

/// Everything a front end needs to render the dashboard.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub favorites: Vec<Location>,
    pub current_location: Option<Location>,
}

impl SessionState {
    pub fn snapshot(&self) -> Option<&Arc<WeatherSnapshot>> {
        match &self.phase {
            Phase::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading)
    }

    pub fn error(&self) -> Option<&Failure> {
        match &self.phase {
            Phase::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Whether a finished resolution was applied or dropped as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Superseded,
}

#[derive(Debug, Clone, Copy)]
enum Intent {
    Geolocation,
    Select,
    Search,
}

impl Intent {
    fn failure_message(self, err: &WeatherError) -> String {
        let msg = match (self, err) {
            (_, WeatherError::GeolocationUnavailable(_)) => {
                "Geolocation is not supported on this device"
            }
            (_, WeatherError::GeolocationDenied) => {
                "Failed to get your location. Please search for a location manually."
            }
            (Intent::Geolocation, _) => "Failed to fetch weather data for your location",
            (Intent::Select, _) => "Failed to fetch weather data",
            (Intent::Search, _) => "Failed to fetch weather data for this location",
        };
        msg.to_string()
    }

    /// Selection keeps the caller's flag; other resolutions derive it from the favorites.
    fn derives_favorite_flag(self) -> bool {
        !matches!(self, Intent::Select)
    }
}

#[derive(Debug)]
pub struct SessionController {
    client: WeatherClient,
    geolocator: Box<dyn Geolocator>,
    /// Guards the store together with the latest token.
    inner: Mutex<Inner>,
    state: watch::Sender<SessionState>,
}

#[derive(Debug)]
struct Inner {
    store: LocationStore,
    latest: u64,
}

impl SessionController {
    pub fn new(client: WeatherClient, geolocator: Box<dyn Geolocator>, store: LocationStore) -> Self {
        let initial = SessionState {
            phase: Phase::Idle,
            favorites: store.favorites().to_vec(),
            current_location: store.current().cloned(),
        };
        let (state, _) = watch::channel(initial);

        Self {
            client,
            geolocator,
            inner: Mutex::new(Inner { store, latest: 0 }),
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Re-resolve the persisted location, or fall back to geolocation.
    pub async fn start(&self) -> Outcome {
        let persisted = self.lock().store.current().cloned();
        match persisted {
            Some(location) => {
                info!(location = %location.display_name(), "Restoring saved location");
                self.select_location(location).await
            }
            None => self.request_geolocation().await,
        }
    }

    /// Retry after a failure; resolves the device position again.
    pub async fn retry(&self) -> Outcome {
        self.request_geolocation().await
    }

    #[instrument(skip(self))]
    pub async fn request_geolocation(&self) -> Outcome {
        let token = self.begin();
        let result = self.resolve_device_position().await;
        self.finish(token, Intent::Geolocation, result)
    }

    #[instrument(skip(self, location), fields(place = %location.display_name()))]
    pub async fn select_location(&self, location: Location) -> Outcome {
        let token = self.begin();
        let result = self.resolve_location(location).await;
        self.finish(token, Intent::Select, result)
    }

    #[instrument(skip(self))]
    pub async fn search_by_name(&self, query: &str) -> Outcome {
        let token = self.begin();
        let result = self.resolve_name(query).await;
        self.finish(token, Intent::Search, result)
    }

    /// Candidate places for `query`, flagged if already a favorite. Leaves the phase alone.
    pub async fn search_places(&self, query: &str) -> Result<Vec<Location>, WeatherError> {
        let places = self.client.search_places(query).await?;

        let inner = self.lock();
        let favorites = inner.store.favorites();
        let locations = places
            .into_iter()
            .map(|place| {
                let is_favorite = favorites.contains_place(place.lat, place.lon);
                place.into_location().with_favorite(is_favorite)
            })
            .collect();
        Ok(locations)
    }

    /// Flip the favorite flag of the current location. `None` without a current location.
    pub fn toggle_favorite(&self) -> Option<bool> {
        let mut inner = self.lock();
        if let Err(e) = inner.store.toggle_current_favorite() {
            warn!(error = %e, "Failed to persist favorites");
        }

        self.publish_locations(&inner.store);
        inner.store.current().map(|c| c.is_favorite)
    }

    /// Returns whether the favorites changed; a failed write is only logged.
    pub fn add_favorite(&self, location: Location) -> bool {
        let mut inner = self.lock();
        let added = !inner.store.favorites().contains_id(&location.id);
        if let Err(e) = inner.store.add_favorite(location) {
            warn!(error = %e, "Failed to persist favorites");
        }
        self.publish_locations(&inner.store);
        added
    }

    pub fn remove_favorite(&self, id: &str) -> bool {
        let mut inner = self.lock();
        let removed = inner.store.favorites().contains_id(id);
        if let Err(e) = inner.store.remove_favorite(id) {
            warn!(error = %e, "Failed to persist favorites");
        }
        self.publish_locations(&inner.store);
        removed
    }

    async fn resolve_device_position(&self) -> Result<(WeatherSnapshot, Location), WeatherError> {
        let position = self.geolocator.current_position().await?;
        let (raw, place) = self.client.resolve_by_coordinates(position.lat, position.lon).await?;
        let snapshot = normalize(&raw, &place)?;
        Ok((snapshot, place.into_location()))
    }

    async fn resolve_location(
        &self,
        location: Location,
    ) -> Result<(WeatherSnapshot, Location), WeatherError> {
        let (raw, place) = self.client.resolve_by_coordinates(location.lat, location.lon).await?;
        let snapshot = normalize(&raw, &place)?;
        Ok((snapshot, location))
    }

    async fn resolve_name(&self, query: &str) -> Result<(WeatherSnapshot, Location), WeatherError> {
        let (raw, place) = self.client.resolve_by_name(query).await?;
        let snapshot = normalize(&raw, &place)?;
        Ok((snapshot, place.into_location()))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a new token and enter `Loading`.
    fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.latest += 1;
        self.state.send_modify(|s| s.phase = Phase::Loading);
        debug!(token = inner.latest, "Resolution started");
        inner.latest
    }

    fn finish(
        &self,
        token: u64,
        intent: Intent,
        result: Result<(WeatherSnapshot, Location), WeatherError>,
    ) -> Outcome {
        let mut inner = self.lock();
        if inner.latest != token {
            debug!(token, latest = inner.latest, "Discarding stale resolution");
            return Outcome::Superseded;
        }

        match result {
            Ok((snapshot, mut location)) => {
                if intent.derives_favorite_flag() {
                    location.is_favorite =
                        inner.store.favorites().contains_place(location.lat, location.lon);
                }
                info!(location = %location.display_name(), "Weather ready");

                if let Err(e) = inner.store.set_current(location) {
                    warn!(error = %e, "Failed to persist current location");
                }
                let favorites = inner.store.favorites().to_vec();
                let current = inner.store.current().cloned();
                self.state.send_modify(|s| {
                    s.phase = Phase::Ready(Arc::new(snapshot));
                    s.favorites = favorites;
                    s.current_location = current;
                });
            }
            Err(err) => {
                warn!(error = %err, "Resolution failed");
                let failure = Failure { kind: err.kind(), message: intent.failure_message(&err) };
                self.state.send_modify(|s| s.phase = Phase::Failed(failure));
            }
        }

        Outcome::Applied
    }

    fn publish_locations(&self, store: &LocationStore) {
        let favorites = store.favorites().to_vec();
        let current = store.current().cloned();
        self.state.send_modify(|s| {
            s.favorites = favorites;
            s.current_location = current;
        });
    }
}
