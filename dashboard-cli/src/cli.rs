use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use dashboard_core::{
    Config, Coordinates, Location, LocationStore, Outcome, Phase, SessionController, SessionState,
    WeatherClient, geolocation::geolocator_for, provider::provider_from_config,
};
use inquire::{Password, PasswordDisplayMode, Text, validator::Validation};
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-dashboard", version, about = "Current weather and forecast for your places")]
pub struct Cli {
    /// Device latitude, overriding the configured position.
    #[arg(long, global = true, allow_hyphen_values = true, requires = "lon")]
    pub lat: Option<f64>,

    /// Device longitude, overriding the configured position.
    #[arg(long, global = true, allow_hyphen_values = true, requires = "lat")]
    pub lon: Option<f64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the OpenWeather API key and an optional device position.
    Configure,

    /// Weather for the saved location, or the device position on first run.
    Show,

    /// Weather for the device position.
    Here,

    /// Weather for the best match of a place name.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// List places matching a name without fetching weather.
    Places {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Weather for a saved location, by id (see `favorites`).
    Select { id: String },

    /// List favorite locations.
    Favorites,

    /// Toggle the current location in favorites.
    Favorite,

    /// Remove a favorite by id.
    Unfavorite { id: String },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let position = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        match self.command {
            Command::Configure => configure()?,
            Command::Favorites => {
                let store = open_store()?;
                print_favorites(&store.favorites().to_vec());
            }
            Command::Favorite => {
                let mut store = open_store()?;
                let name = store.current().map(Location::display_name);
                match (store.toggle_current_favorite()?, name) {
                    (Some(true), Some(name)) => println!("Added {name} to favorites."),
                    (Some(false), Some(name)) => println!("Removed {name} from favorites."),
                    _ => bail!(
                        "No current location yet.\n\
                         Hint: run `weather-dashboard show` or `search` first."
                    ),
                }
            }
            Command::Unfavorite { id } => {
                let mut store = open_store()?;
                if store.remove_favorite(&id)? {
                    println!("Removed {id} from favorites.");
                } else {
                    println!("{id} is not a favorite.");
                }
            }
            Command::Places { query } => {
                let controller = open_session(position)?;
                let places = controller
                    .search_places(&query.join(" "))
                    .await
                    .context("Failed to search for places")?;
                if places.is_empty() {
                    println!("No places found.");
                }
                for place in &places {
                    println!("{}", render::location_line(place));
                }
            }
            Command::Show => {
                let controller = open_session(position)?;
                let outcome = controller.start().await;
                report(outcome, &controller.state())?;
            }
            Command::Here => {
                let controller = open_session(position)?;
                let outcome = controller.request_geolocation().await;
                report(outcome, &controller.state())?;
            }
            Command::Search { query } => {
                let controller = open_session(position)?;
                let outcome = controller.search_by_name(&query.join(" ")).await;
                report(outcome, &controller.state())?;
            }
            Command::Select { id } => {
                let controller = open_session(position)?;
                let location = find_saved(&controller.state(), &id).ok_or_else(|| {
                    anyhow!(
                        "No saved location with id {id}.\n\
                         Hint: run `weather-dashboard favorites` to list saved ids."
                    )
                })?;
                let outcome = controller.select_location(location).await;
                report(outcome, &controller.state())?;
            }
        }

        Ok(())
    }
}

/// Favorites and the current location only; needs no API key.
fn open_store() -> Result<LocationStore> {
    let config = Config::load()?;
    Ok(LocationStore::open(config.data_dir()?))
}

fn open_session(position: Option<Coordinates>) -> Result<SessionController> {
    let config = Config::load()?;
    build_controller(&config, position)
}

fn build_controller(config: &Config, position: Option<Coordinates>) -> Result<SessionController> {
    let provider = provider_from_config(config)?;
    let store = LocationStore::open(config.data_dir()?);
    let geolocator = geolocator_for(position.or(config.device));
    debug!(?geolocator, "Session configured");

    Ok(SessionController::new(WeatherClient::new(provider), geolocator, store))
}

fn find_saved(state: &SessionState, id: &str) -> Option<Location> {
    state
        .favorites
        .iter()
        .chain(state.current_location.as_ref())
        .find(|l| l.id == id)
        .cloned()
}

fn report(outcome: Outcome, state: &SessionState) -> Result<()> {
    if outcome == Outcome::Superseded {
        bail!("Request was superseded by a newer one");
    }

    match &state.phase {
        Phase::Ready(snapshot) => {
            if let Some(current) = &state.current_location {
                let star = if current.is_favorite { " ★" } else { "" };
                println!("[{}]{star}", current.id);
            }
            print!("{}", render::snapshot(snapshot));
            Ok(())
        }
        Phase::Failed(failure) => Err(anyhow!(
            "{}\nHint: run `weather-dashboard here` to try again, or `search <place>`.",
            failure.message
        )),
        Phase::Idle | Phase::Loading => bail!("No weather data available"),
    }
}

fn print_favorites(favorites: &[Location]) {
    if favorites.is_empty() {
        println!("No favorites yet. Run `weather-dashboard favorite` to save the current location.");
        return;
    }
    for location in favorites {
        println!("{}", render::location_line(location));
    }
}

fn configure() -> Result<()> {
    let path = Config::config_file_path()?;
    let mut config = Config::load_from(&path)?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Needs access to One Call 3.0 and Geocoding")
        .prompt()
        .context("Failed to read API key")?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key.trim().to_string());

    let current = config.device.map(|c| format!("{}, {}", c.lat, c.lon)).unwrap_or_default();
    let position = Text::new("Device position (lat, lon):")
        .with_initial_value(&current)
        .with_help_message("Used by `here`; leave empty to skip")
        .with_validator(|input: &str| {
            Ok(match parse_position(input) {
                Ok(_) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()
        .context("Failed to read device position")?;
    config.set_device_position(parse_position(&position)?);

    config.save_to(&path)?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// Parse `"lat, lon"`; blank input means no position.
fn parse_position(input: &str) -> Result<Option<Coordinates>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (lat, lon) = input
        .split_once(',')
        .ok_or_else(|| anyhow!("Expected `lat, lon`"))?;
    let lat: f64 = lat.trim().parse().context("Latitude is not a number")?;
    let lon: f64 = lon.trim().parse().context("Longitude is not a number")?;

    let coords = Coordinates::new(lat, lon);
    if !coords.is_valid() {
        bail!("Latitude must be within ±90 and longitude within ±180");
    }
    Ok(Some(coords))
}
