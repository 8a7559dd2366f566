//! Plain-text rendering of session state.

use std::fmt::Write;

use chrono::{DateTime, Local, TimeZone};
use dashboard_core::{Location, WeatherSnapshot, model::unix_to_utc};

const DIRECTIONS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass direction for a wind bearing in degrees.
pub fn wind_direction(degrees: f64) -> &'static str {
    let index = (degrees.rem_euclid(360.0) / 22.5).round() as usize % DIRECTIONS.len();
    DIRECTIONS[index]
}

fn local<Tz: TimeZone>(ts: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    unix_to_utc(ts).map(|dt| dt.with_timezone(tz))
}

/// e.g. `6:05 AM`
pub fn time_of_day<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    local(ts, tz).map(|dt| dt.format("%-I:%M %p").to_string()).unwrap_or_else(|| "--".into())
}

/// e.g. `Monday, Jun 10`
pub fn day_label<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    local(ts, tz).map(|dt| dt.format("%A, %b %-d").to_string()).unwrap_or_else(|| "--".into())
}

pub fn location_line(location: &Location) -> String {
    let star = if location.is_favorite { "★" } else { " " };
    format!("{star} {:<32} {}  ({:.4}, {:.4})", location.display_name(), location.id, location.lat, location.lon)
}

pub fn snapshot(snapshot: &WeatherSnapshot) -> String {
    snapshot_in(snapshot, &Local)
}

pub fn snapshot_in<Tz: TimeZone>(snapshot: &WeatherSnapshot, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let current = &snapshot.current;
    let loc = &snapshot.location;

    let _ = writeln!(out, "{}, {}  ({:.2}, {:.2})", loc.name, loc.country, loc.lat, loc.lon);
    let _ = writeln!(
        out,
        "{}°C  {}  (feels like {}°C)  [{}]",
        current.temp,
        current.condition.description,
        current.feels_like,
        if snapshot.is_day { "day" } else { "night" },
    );
    let _ = writeln!(
        out,
        "Humidity {}%  Wind {:.1} m/s {}  Pressure {} hPa  UV {:.1}",
        current.humidity,
        current.wind_speed,
        wind_direction(current.wind_deg),
        current.pressure,
        current.uvi,
    );
    if let Some(visibility) = current.visibility {
        let _ = writeln!(out, "Visibility {:.1} km", visibility / 1000.0);
    }
    let _ = writeln!(
        out,
        "Sunrise {}  Sunset {}  (observed {})",
        time_of_day(current.sunrise, tz),
        time_of_day(current.sunset, tz),
        time_of_day(current.dt, tz),
    );

    if !snapshot.hourly.is_empty() {
        let _ = writeln!(out, "\nNext hours:");
        for hour in &snapshot.hourly {
            let _ = writeln!(
                out,
                "  {:>8}  {:>4}°C  {}",
                time_of_day(hour.dt, tz),
                hour.temp,
                hour.condition.condition,
            );
        }
    }

    if !snapshot.forecast.is_empty() {
        let _ = writeln!(out, "\nForecast:");
        for day in &snapshot.forecast {
            let _ = writeln!(
                out,
                "  {:<20} {:>4}°C / {:>4}°C  {:<12} rain {:>3.0}%  humidity {}%  wind {:.1} m/s",
                day_label(day.dt, tz),
                day.temp.max,
                day.temp.min,
                day.condition.condition,
                day.pop * 100.0,
                day.humidity,
                day.wind_speed,
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn wind_direction_buckets() {
        assert_eq!(wind_direction(0.0), "N");
        assert_eq!(wind_direction(11.0), "N");
        assert_eq!(wind_direction(12.0), "NNE");
        assert_eq!(wind_direction(90.0), "E");
        assert_eq!(wind_direction(250.0), "WSW");
        assert_eq!(wind_direction(350.0), "N");
        assert_eq!(wind_direction(-90.0), "W");
    }

    #[test]
    fn formats_times_in_given_zone() {
        // 2024-06-10 06:05:00 UTC
        let ts = 1_717_999_500;
        assert_eq!(time_of_day(ts, &Utc), "6:05 AM");
        assert_eq!(day_label(ts, &Utc), "Monday, Jun 10");
    }

    #[test]
    fn favorite_locations_are_starred() {
        let loc = Location::new("Oslo", "NO", 59.91, 10.75).with_favorite(true);
        let line = location_line(&loc);
        assert!(line.starts_with('★'));
        assert!(line.contains("Oslo, NO"));
        assert!(line.contains("59.9100:10.7500"));
    }
}
