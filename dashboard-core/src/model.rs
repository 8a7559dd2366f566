use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derive the stable identity key for a coordinate pair.
///
/// Coordinates are canonicalized to 4 decimal places (roughly 11 m) so that
/// the same place reported with slightly different precision by different
/// provider responses maps to the same id.
pub fn location_id(lat: f64, lon: f64) -> String {
    format!("{:.4}:{:.4}", canonical(lat), canonical(lon))
}

fn canonical(value: f64) -> f64 {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    // -0.0 and 0.0 must share an id
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A place the user can look at, pick, or keep as a favorite.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "LocationRecord")]
pub struct Location {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub id: String,
    #[serde(rename = "isFavorite", default)]
    pub is_favorite: bool,
}

impl Location {
    pub fn new(name: impl Into<String>, country: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            lat,
            lon,
            id: location_id(lat, lon),
            is_favorite: false,
        }
    }

    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// True when both locations refer to the same coordinates.
    pub fn same_place(&self, other: &Location) -> bool {
        location_id(self.lat, self.lon) == location_id(other.lat, other.lon)
    }

    pub fn display_name(&self) -> String {
        if self.country.is_empty() {
            self.name.clone()
        } else {
            format!("{}, {}", self.name, self.country)
        }
    }
}

/// Persisted shape of a [`Location`]. The stored id is not trusted.
#[derive(Deserialize)]
struct LocationRecord {
    name: String,
    country: String,
    lat: f64,
    lon: f64,
    #[serde(rename = "isFavorite", default)]
    is_favorite: bool,
}

impl From<LocationRecord> for Location {
    fn from(record: LocationRecord) -> Self {
        Location::new(record.name, record.country, record.lat, record.lon)
            .with_favorite(record.is_favorite)
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.same_place(other)
    }
}

/// Output of geocoding: a named place with coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl ResolvedPlace {
    pub fn into_location(self) -> Location {
        Location::new(self.name, self.country, self.lat, self.lon)
    }
}

/// Raw provider payload for current + hourly + daily weather, not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWeather(pub serde_json::Value);

/// Named weather conditions the dashboard distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Smoke,
    Haze,
    Dust,
    Fog,
    Sand,
    Ash,
    Squall,
    Tornado,
}

impl WeatherCondition {
    pub const ALL: [WeatherCondition; 15] = [
        WeatherCondition::Clear,
        WeatherCondition::Clouds,
        WeatherCondition::Rain,
        WeatherCondition::Drizzle,
        WeatherCondition::Thunderstorm,
        WeatherCondition::Snow,
        WeatherCondition::Mist,
        WeatherCondition::Smoke,
        WeatherCondition::Haze,
        WeatherCondition::Dust,
        WeatherCondition::Fog,
        WeatherCondition::Sand,
        WeatherCondition::Ash,
        WeatherCondition::Squall,
        WeatherCondition::Tornado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "clear",
            WeatherCondition::Clouds => "clouds",
            WeatherCondition::Rain => "rain",
            WeatherCondition::Drizzle => "drizzle",
            WeatherCondition::Thunderstorm => "thunderstorm",
            WeatherCondition::Snow => "snow",
            WeatherCondition::Mist => "mist",
            WeatherCondition::Smoke => "smoke",
            WeatherCondition::Haze => "haze",
            WeatherCondition::Dust => "dust",
            WeatherCondition::Fog => "fog",
            WeatherCondition::Sand => "sand",
            WeatherCondition::Ash => "ash",
            WeatherCondition::Squall => "squall",
            WeatherCondition::Tornado => "tornado",
        }
    }
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider condition entry together with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub code: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
    pub condition: WeatherCondition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotLocation {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReading {
    pub temp: i32,
    pub feels_like: i32,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_deg: f64,
    pub pressure: f64,
    pub uvi: f64,
    /// Meters; the provider omits it for some stations.
    pub visibility: Option<f64>,
    pub condition: ConditionSummary,
    /// Epoch seconds, UTC.
    pub dt: i64,
    pub sunrise: i64,
    pub sunset: i64,
}

impl CurrentReading {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        unix_to_utc(self.dt)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyReading {
    pub dt: i64,
    pub temp: i32,
    pub condition: ConditionSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: i32,
    pub min: i32,
    pub max: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReading {
    pub dt: i64,
    pub temp: DailyTemperature,
    pub condition: ConditionSummary,
    pub humidity: u8,
    pub wind_speed: f64,
    /// Probability of precipitation, 0..=1.
    pub pop: f64,
}

/// Immutable point-in-time weather for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: SnapshotLocation,
    pub current: CurrentReading,
    pub hourly: Vec<HourlyReading>,
    pub forecast: Vec<DailyReading>,
    pub is_day: bool,
}

/// Favorite locations keyed by id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Location>", into = "Vec<Location>")]
pub struct FavoritesSet {
    entries: Vec<Location>,
}

impl FavoritesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a location; returns `false` if one with the same id is already present.
    pub fn insert(&mut self, location: Location) -> bool {
        if self.contains_id(&location.id) {
            return false;
        }
        self.entries.push(location);
        true
    }

    /// Remove by id; returns the removed entry, if any.
    pub fn remove(&mut self, id: &str) -> Option<Location> {
        let pos = self.entries.iter().position(|loc| loc.id == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.entries.iter().any(|loc| loc.id == id)
    }

    /// Membership by coordinates rather than by a provider-supplied id.
    pub fn contains_place(&self, lat: f64, lon: f64) -> bool {
        self.contains_id(&location_id(lat, lon))
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.entries.iter().find(|loc| loc.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Location> {
        self.entries.clone()
    }
}

impl FromIterator<Location> for FavoritesSet {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        let mut set = FavoritesSet::new();
        for location in iter {
            set.insert(location);
        }
        set
    }
}

impl From<Vec<Location>> for FavoritesSet {
    fn from(entries: Vec<Location>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<FavoritesSet> for Vec<Location> {
    fn from(set: FavoritesSet) -> Self {
        set.entries
    }
}

pub fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_derived_from_coordinates() {
        let a = Location::new("London", "GB", 51.5, -0.12);
        assert_eq!(a.id, "51.5000:-0.1200");
    }

    #[test]
    fn same_coordinates_are_the_same_location() {
        let a = Location::new("London", "GB", 51.5074, -0.1278);
        let b = Location::new("LONDON", "gb", 51.507_400_001, -0.127_8);
        assert_eq!(a, b);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn negative_zero_shares_id_with_zero() {
        assert_eq!(location_id(-0.00001, 0.0), location_id(0.0, 0.0));
    }

    #[test]
    fn location_serializes_favorite_flag_in_camel_case() {
        let loc = Location::new("Paris", "FR", 48.85, 2.35).with_favorite(true);
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["isFavorite"], serde_json::Value::Bool(true));
        assert_eq!(json["id"], "48.8500:2.3500");
    }

    #[test]
    fn coordinates_validation() {
        assert!(Coordinates::new(90.0, 180.0).is_valid());
        assert!(Coordinates::new(-90.0, -180.0).is_valid());
        assert!(!Coordinates::new(90.5, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.1).is_valid());
    }

    #[test]
    fn favorites_insert_is_idempotent() {
        let mut set = FavoritesSet::new();
        let loc = Location::new("Oslo", "NO", 59.91, 10.75);

        assert!(set.insert(loc.clone()));
        assert!(!set.insert(loc));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn favorites_remove_unknown_is_noop() {
        let mut set = FavoritesSet::new();
        set.insert(Location::new("Oslo", "NO", 59.91, 10.75));

        assert!(set.remove("0.0000:0.0000").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn favorites_preserve_insertion_order() {
        let set: FavoritesSet = [
            Location::new("Rome", "IT", 41.9, 12.5),
            Location::new("Lima", "PE", -12.05, -77.04),
            Location::new("Rome again", "IT", 41.9, 12.5),
            Location::new("Nairobi", "KE", -1.29, 36.82),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = set.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Rome", "Lima", "Nairobi"]);
    }

    #[test]
    fn favorites_match_by_place() {
        let mut set = FavoritesSet::new();
        set.insert(Location::new("Oslo", "NO", 59.9139, 10.7522));
        assert!(set.contains_place(59.913_9, 10.752_2));
        assert!(!set.contains_place(59.92, 10.75));
    }

    #[test]
    fn deserialized_location_rebuilds_its_id() {
        let loc: Location = serde_json::from_str(
            r#"{"name":"London","country":"GB","lat":51.5,"lon":-0.12,"id":"51.5--0.12","isFavorite":true}"#,
        )
        .unwrap();

        assert_eq!(loc.id, "51.5000:-0.1200");
        assert!(loc.is_favorite);
    }

    #[test]
    fn deserialized_favorites_drop_duplicates() {
        let london = Location::new("London", "GB", 51.5, -0.12);
        let json = serde_json::to_string(&vec![london.clone(), london]).unwrap();

        let set: FavoritesSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn condition_names_are_lowercase() {
        assert_eq!(WeatherCondition::Thunderstorm.to_string(), "thunderstorm");
        assert_eq!(WeatherCondition::ALL.len(), 15);
    }
}
