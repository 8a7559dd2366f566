//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration handling (API key, endpoints, device position)
//! - A provider abstraction with an OpenWeather implementation
//! - Location resolution and payload normalization into immutable snapshots
//! - Persisted favorites and current location
//! - A session controller publishing observable state
//!
//! It is used by `dashboard-cli`, but can also be driven by any other front end.

pub mod client;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod session;
pub mod store;

pub use client::WeatherClient;
pub use config::{Config, ProviderConfig};
pub use error::{ErrorKind, WeatherError};
pub use geolocation::{FixedPosition, Geolocator, NoGeolocation};
pub use model::{Coordinates, FavoritesSet, Location, ResolvedPlace, WeatherCondition, WeatherSnapshot};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use session::{Outcome, Phase, SessionController, SessionState};
pub use store::LocationStore;
