#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report source configuration types and update cadence buckets.
//!
//! A [`SourceConfig`] describes one published report: where its daily CSV
//! lives, where its monthly zip archive lives, the file name to look for
//! inside that archive, and how often the publisher refreshes it.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Placeholder substituted with the target day (`%Y%m%d`) in direct URLs
/// and filename patterns.
pub const DAY_PLACEHOLDER: &str = "{YYYYMMDD}";

/// Placeholder substituted with the first day of the target month
/// (`%Y%m01`) in archive URLs.
pub const MONTH_PLACEHOLDER: &str = "{YYYYMM01}";

/// Polling bucket derived from a report's free-text update frequency.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Cadence {
    /// Real-time reports refreshed every five minutes.
    FiveMinute,
    /// Reports refreshed every hour.
    Hourly,
    /// Reports refreshed several times a day.
    MultipleDaily,
    /// Reports refreshed once a day.
    Daily,
    /// No recognizable frequency; never polled.
    Unscheduled,
}

impl Cadence {
    /// Buckets a declared update frequency such as `"Real-time (5-minute)"`
    /// or `"Multiple times daily"`.
    ///
    /// "multiple times daily" is checked before plain "daily" so it is not
    /// swallowed by the broader match.
    #[must_use]
    pub fn from_frequency(frequency: Option<&str>) -> Self {
        let lower = frequency.unwrap_or_default().to_lowercase();

        if lower.contains("5-minute") || lower.contains("real-time") {
            Self::FiveMinute
        } else if lower.contains("multiple times daily") {
            Self::MultipleDaily
        } else if lower.contains("hourly") {
            Self::Hourly
        } else if lower.contains("daily") {
            Self::Daily
        } else {
            Self::Unscheduled
        }
    }

    /// Concrete polling interval for this bucket.
    ///
    /// Everything slower than five-minute data is polled hourly so no report
    /// goes more than an hour without a refresh attempt.
    #[must_use]
    pub fn poll_interval(self) -> Option<Duration> {
        match self {
            Self::FiveMinute => Some(Duration::minutes(5)),
            Self::Hourly | Self::MultipleDaily | Self::Daily => Some(Duration::hours(1)),
            Self::Unscheduled => None,
        }
    }
}

/// Configuration for one published report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Human-readable data type (e.g. "Real-Time Zonal LBMP").
    pub data_type: String,
    /// Unique report identifier (e.g. `P-24A`).
    pub report_code: String,
    /// Short dataset name used in the publisher's paths.
    pub dataset_name: String,
    /// Expected file name, parameterized by [`DAY_PLACEHOLDER`].
    pub filename_pattern: String,
    /// Direct CSV URL, parameterized by [`DAY_PLACEHOLDER`].
    pub direct_url_template: String,
    /// Monthly archive URL, parameterized by [`MONTH_PLACEHOLDER`].
    pub archive_url_template: String,
    /// Category from the lookup file.
    pub category: Option<String>,
    /// Free-text update frequency from the lookup file.
    pub update_frequency: Option<String>,
    /// Description from the lookup file.
    pub description: Option<String>,
}

impl SourceConfig {
    /// Direct CSV URL for `date`.
    #[must_use]
    pub fn direct_url(&self, date: NaiveDate) -> String {
        self.direct_url_template
            .replace(DAY_PLACEHOLDER, &day_string(date))
    }

    /// Monthly archive URL for the month containing `date`.
    #[must_use]
    pub fn archive_url(&self, date: NaiveDate) -> String {
        self.archive_url_template
            .replace(MONTH_PLACEHOLDER, &month_string(date))
    }

    /// File name expected inside the archive for `date`.
    #[must_use]
    pub fn filename_for(&self, date: NaiveDate) -> String {
        self.filename_pattern
            .replace(DAY_PLACEHOLDER, &day_string(date))
    }

    /// Whether an archive URL is configured at all.
    #[must_use]
    pub fn has_archive(&self) -> bool {
        !self.archive_url_template.trim().is_empty()
    }

    /// Polling bucket for this report.
    #[must_use]
    pub fn cadence(&self) -> Cadence {
        Cadence::from_frequency(self.update_frequency.as_deref())
    }
}

/// Formats `date` as `YYYYMMDD`.
#[must_use]
pub fn day_string(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Formats the first day of `date`'s month as `YYYYMM01`.
#[must_use]
pub fn month_string(date: NaiveDate) -> String {
    format!("{:04}{:02}01", date.year(), date.month())
}

/// A named point used by the secondary weather source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherLocation {
    /// Grid zone the point stands in for (e.g. `N.Y.C.`).
    pub zone: &'static str,
    /// Display name of the point (e.g. "Central Park").
    pub name: &'static str,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lbmp_config() -> SourceConfig {
        SourceConfig {
            data_type: "Real-Time Zonal LBMP".to_string(),
            report_code: "P-24A".to_string(),
            dataset_name: "realtime_zone".to_string(),
            filename_pattern: "{YYYYMMDD}realtime_zone.csv".to_string(),
            direct_url_template:
                "http://mis.nyiso.com/public/csv/realtime/{YYYYMMDD}realtime_zone.csv".to_string(),
            archive_url_template:
                "http://mis.nyiso.com/public/csv/realtime/{YYYYMM01}realtime_zone_csv.zip"
                    .to_string(),
            category: Some("Pricing".to_string()),
            update_frequency: Some("Real-time (5-minute)".to_string()),
            description: None,
        }
    }

    #[test]
    fn substitutes_day_placeholder() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 13).unwrap();
        assert_eq!(
            lbmp_config().direct_url(date),
            "http://mis.nyiso.com/public/csv/realtime/20251113realtime_zone.csv"
        );
        assert_eq!(lbmp_config().filename_for(date), "20251113realtime_zone.csv");
    }

    #[test]
    fn substitutes_month_placeholder() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 28).unwrap();
        assert_eq!(
            lbmp_config().archive_url(date),
            "http://mis.nyiso.com/public/csv/realtime/20250201realtime_zone_csv.zip"
        );
    }

    #[test]
    fn buckets_frequencies() {
        assert_eq!(
            Cadence::from_frequency(Some("Real-time (5-minute)")),
            Cadence::FiveMinute
        );
        assert_eq!(
            Cadence::from_frequency(Some("Multiple times daily")),
            Cadence::MultipleDaily
        );
        assert_eq!(Cadence::from_frequency(Some("Hourly")), Cadence::Hourly);
        assert_eq!(Cadence::from_frequency(Some("Daily")), Cadence::Daily);
        assert_eq!(Cadence::from_frequency(Some("Monthly")), Cadence::Unscheduled);
        assert_eq!(Cadence::from_frequency(None), Cadence::Unscheduled);
    }

    #[test]
    fn slower_cadences_poll_hourly() {
        assert_eq!(Cadence::FiveMinute.poll_interval(), Some(Duration::minutes(5)));
        for cadence in [Cadence::Hourly, Cadence::MultipleDaily, Cadence::Daily] {
            assert_eq!(cadence.poll_interval(), Some(Duration::hours(1)));
        }
        assert_eq!(Cadence::Unscheduled.poll_interval(), None);
    }
}
