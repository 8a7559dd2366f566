//! Pure transformation from provider payloads into a [`WeatherSnapshot`].
//!
//! Nothing in here touches the network or the clock: the day/night flag is
//! computed from the reading's own timestamps, so identical input always
//! yields an identical snapshot.

use serde::Deserialize;

use crate::{
    error::WeatherError,
    model::{
        ConditionSummary, CurrentReading, DailyReading, DailyTemperature, HourlyReading,
        RawWeather, ResolvedPlace, SnapshotLocation, WeatherCondition, WeatherSnapshot,
    },
};

pub const MAX_HOURLY: usize = 24;
pub const MAX_DAILY: usize = 5;

/// Build a snapshot from a raw one-call payload and the place it was fetched for.
pub fn normalize(raw: &RawWeather, place: &ResolvedPlace) -> Result<WeatherSnapshot, WeatherError> {
    let parsed = OwOneCall::deserialize(&raw.0)
        .map_err(|e| WeatherError::MalformedPayload(e.to_string()))?;

    let current = parsed.current;
    let is_day = is_day(current.dt, current.sunrise, current.sunset);

    let hourly = parsed
        .hourly
        .into_iter()
        .take(MAX_HOURLY)
        .map(|hour| HourlyReading {
            dt: hour.dt,
            temp: round_temperature(hour.temp),
            condition: summarize(&hour.weather),
        })
        .collect();

    let forecast = parsed
        .daily
        .into_iter()
        .take(MAX_DAILY)
        .map(|day| DailyReading {
            dt: day.dt,
            temp: DailyTemperature {
                day: round_temperature(day.temp.day),
                min: round_temperature(day.temp.min),
                max: round_temperature(day.temp.max),
            },
            condition: summarize(&day.weather),
            humidity: day.humidity,
            wind_speed: day.wind_speed,
            pop: day.pop,
        })
        .collect();

    Ok(WeatherSnapshot {
        location: SnapshotLocation {
            name: place.name.clone(),
            country: place.country.clone(),
            lat: place.lat,
            lon: place.lon,
        },
        current: CurrentReading {
            temp: round_temperature(current.temp),
            feels_like: round_temperature(current.feels_like),
            humidity: current.humidity,
            wind_speed: current.wind_speed,
            wind_deg: current.wind_deg,
            pressure: current.pressure,
            uvi: current.uvi,
            visibility: current.visibility,
            condition: summarize(&current.weather),
            dt: current.dt,
            sunrise: current.sunrise,
            sunset: current.sunset,
        },
        hourly,
        forecast,
        is_day,
    })
}

/// Map a provider condition code onto one of the named conditions.
///
/// Total: codes outside the table fall back to [`WeatherCondition::Clear`].
/// Clouds are exactly 801–804; 805 and above are unassigned and take the fallback.
pub fn classify(code: u32) -> WeatherCondition {
    match code {
        200..=299 => WeatherCondition::Thunderstorm,
        300..=399 => WeatherCondition::Drizzle,
        500..=599 => WeatherCondition::Rain,
        600..=699 => WeatherCondition::Snow,
        701 => WeatherCondition::Mist,
        711 => WeatherCondition::Smoke,
        721 => WeatherCondition::Haze,
        731 | 761 => WeatherCondition::Dust,
        741 => WeatherCondition::Fog,
        751 => WeatherCondition::Sand,
        762 => WeatherCondition::Ash,
        771 => WeatherCondition::Squall,
        781 => WeatherCondition::Tornado,
        800 => WeatherCondition::Clear,
        801..=804 => WeatherCondition::Clouds,
        _ => WeatherCondition::Clear,
    }
}

/// Half-open daylight interval: `sunrise <= dt < sunset`.
pub fn is_day(dt: i64, sunrise: i64, sunset: i64) -> bool {
    sunrise <= dt && dt < sunset
}

/// Round half up, so `21.5 -> 22` and `-0.5 -> 0`.
pub fn round_temperature(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

fn summarize(weather: &[OwWeather]) -> ConditionSummary {
    match weather.first() {
        Some(w) => ConditionSummary {
            code: w.id,
            main: w.main.clone(),
            description: w.description.clone(),
            icon: w.icon.clone(),
            condition: classify(w.id),
        },
        None => ConditionSummary {
            code: 0,
            main: "Unknown".to_string(),
            description: "unknown".to_string(),
            icon: String::new(),
            condition: WeatherCondition::default(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    dt: i64,
    sunrise: i64,
    sunset: i64,
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: u8,
    uvi: f64,
    #[serde(default)]
    visibility: Option<f64>,
    wind_speed: f64,
    #[serde(default)]
    wind_deg: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwHourly {
    dt: i64,
    temp: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwDailyTemp {
    day: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwDaily {
    dt: i64,
    temp: OwDailyTemp,
    humidity: u8,
    wind_speed: f64,
    #[serde(default)]
    pop: f64,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwOneCall {
    current: OwCurrent,
    hourly: Vec<OwHourly>,
    daily: Vec<OwDaily>,
}
