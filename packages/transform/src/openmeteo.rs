//! Open-Meteo hourly JSON to [`Weather`] records.

use chrono::NaiveDateTime;
use grid_ingest_transform_models::{CanonicalRecord, Weather};
use serde_json::Value;

use crate::dates::detect_datetime;

/// Data source label for Open-Meteo rows.
pub const OPENMETEO_SOURCE: &str = "OpenMeteo";

/// Celsius to Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius.mul_add(9.0 / 5.0, 32.0)
}

/// Metres per second to miles per hour.
#[must_use]
pub fn ms_to_mph(metres_per_second: f64) -> f64 {
    metres_per_second * 2.237
}

fn series(hourly: &Value, key: &str) -> Vec<Option<f64>> {
    hourly
        .get(key)
        .and_then(Value::as_array)
        .map(|values| values.iter().map(Value::as_f64).collect())
        .unwrap_or_default()
}

/// Converts one location's API response into hourly weather records.
///
/// Hours without a temperature are skipped. `fetched_at` becomes each
/// record's `forecast_time`.
#[must_use]
pub fn parse_weather_response(
    response: &Value,
    location: &str,
    zone: &str,
    fetched_at: NaiveDateTime,
) -> Vec<CanonicalRecord> {
    let Some(hourly) = response.get("hourly") else {
        log::warn!("No hourly data in API response for {location}");
        return Vec::new();
    };

    let times: Vec<&str> = hourly
        .get("time")
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if times.is_empty() {
        log::warn!("No time data in API response for {location}");
        return Vec::new();
    }

    let temperatures = series(hourly, "temperature_2m");
    let humidities = series(hourly, "relativehumidity_2m");
    let irradiances = series(hourly, "direct_normal_irradiance");
    let wind_speeds = series(hourly, "wind_speed_10m");
    let at = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();

    let mut records = Vec::with_capacity(times.len());
    for (i, time) in times.iter().enumerate() {
        let Some(timestamp) = detect_datetime(time) else {
            log::warn!("Error parsing hour {i} for {location}: bad time {time:?}");
            continue;
        };
        let Some(celsius) = at(&temperatures, i) else {
            continue;
        };

        records.push(CanonicalRecord::Weather(Weather {
            timestamp,
            forecast_time: fetched_at,
            location: location.to_string(),
            vintage: "Actual".to_string(),
            temperature_f: Some(celsius_to_fahrenheit(celsius)),
            humidity_percent: at(&humidities, i),
            wind_speed_mph: at(&wind_speeds, i).map(ms_to_mph),
            wind_direction: String::new(),
            cloud_cover_percent: None,
            zone_name: Some(zone.to_string()),
            irradiance_w_m2: at(&irradiances, i),
            data_source: OPENMETEO_SOURCE.to_string(),
        }));
    }

    log::info!("Parsed {} weather records for {location}", records.len());
    records
}
