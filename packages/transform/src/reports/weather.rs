use grid_ingest_transform_models::{CanonicalRecord, RecordFamily, Weather};

use super::{ReportTransformer, TimestampColumn};
use crate::table::Table;

/// Data source label for the publisher's own forecast.
pub const NYISO_SOURCE: &str = "NYISO";

/// Weather forecast by station (P-7A).
///
/// The report carries daily max/min dry-bulb and wet-bulb temperatures.
/// Temperature is the max/min mean; humidity is a rough estimate from the
/// dry-bulb/wet-bulb spread, `100 - spread * 10` clamped to `0..=100`.
#[derive(Debug, Clone, Copy)]
pub struct WeatherTransformer;

fn mean_or_either(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f64::midpoint(a, b)),
        (a, b) => a.or(b),
    }
}

/// Relative humidity estimated from the dry-bulb/wet-bulb spread.
#[must_use]
pub fn estimate_humidity(temperature: f64, wet_bulb: f64) -> Option<f64> {
    let spread = temperature - wet_bulb;
    (spread > 0.0).then(|| 10.0f64.mul_add(-spread, 100.0).clamp(0.0, 100.0))
}

impl ReportTransformer for WeatherTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Weather
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                let ts = timestamp.of(&row)?;
                let temperature = mean_or_either(row.number("Max Temp"), row.number("Min Temp"));
                let wet_bulb = row
                    .number("Max Wet Bulb")
                    .zip(row.number("Min Wet Bulb"))
                    .map(|(max, min)| f64::midpoint(max, min));
                let humidity_percent = temperature
                    .zip(wet_bulb)
                    .and_then(|(t, w)| estimate_humidity(t, w));

                Some(CanonicalRecord::Weather(Weather {
                    timestamp: ts,
                    forecast_time: row.datetime("Vintage Date").unwrap_or(ts),
                    location: row
                        .first_text(&["Station ID", "Location", "Station"])
                        .unwrap_or_default(),
                    vintage: row.text("Vintage").unwrap_or_default(),
                    temperature_f: temperature,
                    humidity_percent,
                    wind_speed_mph: None,
                    wind_direction: String::new(),
                    cloud_cover_percent: None,
                    zone_name: None,
                    irradiance_w_m2: None,
                    data_source: NYISO_SOURCE.to_string(),
                }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn averages_temperatures_and_estimates_humidity() {
        let table = parse(
            "Forecast Date,Vintage Date,Vintage,Station ID,Max Temp,Min Temp,Max Wet Bulb,Min Wet Bulb\n\
             11/14/2025,11/13/2025,Forecast,ALB,50,40,44,40\n\
             11/14/2025,11/13/2025,Actual,BGM,48,,,\n",
        )
        .unwrap();
        let ts = TimestampColumn::resolve(&table).unwrap();
        let records = WeatherTransformer.transform(&table, &ts);

        let CanonicalRecord::Weather(alb) = &records[0] else {
            panic!("expected weather");
        };
        assert_eq!(alb.location, "ALB");
        assert_eq!(alb.vintage, "Forecast");
        assert_eq!(alb.temperature_f, Some(45.0));
        assert_eq!(alb.humidity_percent, Some(70.0));
        assert_eq!(alb.forecast_time.format("%Y-%m-%d").to_string(), "2025-11-13");
        assert_eq!(alb.data_source, "NYISO");

        let CanonicalRecord::Weather(bgm) = &records[1] else {
            panic!("expected weather");
        };
        assert_eq!(bgm.temperature_f, Some(48.0));
        assert_eq!(bgm.humidity_percent, None);
    }

    #[test]
    fn humidity_requires_positive_spread() {
        assert_eq!(estimate_humidity(50.0, 50.0), None);
        assert_eq!(estimate_humidity(50.0, 30.0), Some(0.0));
        assert_eq!(estimate_humidity(50.0, 49.5), Some(95.0));
    }
}
