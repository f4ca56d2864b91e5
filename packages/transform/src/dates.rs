//! Date/time detection.
//!
//! Columns are parsed with the first entry of an ordered [`DateFormats`]
//! list that matches any value; columns no format fits fall back to
//! [`detect_datetime`] per value.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::TransformError;

const EMBEDDED_FORMATS: &str = include_str!("date_formats.toml");

/// Lowercased substrings that mark a column as a date/time column.
pub const DATE_KEYWORDS: &[&str] = &["time", "date", "timestamp"];

/// Formats [`detect_datetime`] tries after RFC 3339.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
];

const FALLBACK_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m-%d-%Y", "%d-%b-%Y", "%m/%d/%y"];

/// Whether `column` names a date/time column.
#[must_use]
pub fn is_date_column(column: &str) -> bool {
    let lower = column.to_lowercase();
    DATE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[derive(Debug, Deserialize)]
struct FormatsFile {
    formats: Vec<String>,
}

/// Ordered `strftime` formats tried per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormats {
    formats: Vec<String>,
}

impl Default for DateFormats {
    fn default() -> Self {
        Self::embedded().unwrap_or_else(|e| {
            log::error!("{e}; falling back to per-value detection only");
            Self::new(Vec::new())
        })
    }
}

impl DateFormats {
    /// Wraps an explicit list.
    #[must_use]
    pub const fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }

    /// The list compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::DateFormats`] if the embedded file is
    /// malformed.
    pub fn embedded() -> Result<Self, TransformError> {
        Self::from_toml(EMBEDDED_FORMATS)
    }

    /// Parses a `formats = [...]` TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::DateFormats`] if the document does not
    /// parse.
    pub fn from_toml(source: &str) -> Result<Self, TransformError> {
        let file: FormatsFile = toml::from_str(source).map_err(|e| TransformError::DateFormats {
            message: e.to_string(),
        })?;
        Ok(Self::new(file.formats))
    }

    /// Formats in trial order.
    #[must_use]
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// First format that parses at least one of `values`.
    #[must_use]
    pub fn select<'a>(&self, values: impl Iterator<Item = &'a str> + Clone) -> Option<&str> {
        self.formats
            .iter()
            .find(|fmt| values.clone().any(|v| parse_with(v, fmt).is_some()))
            .map(String::as_str)
    }
}

/// Parses `value` with one format, accepting date-only formats as midnight.
#[must_use]
pub fn parse_with(value: &str, format: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Best-effort parse of a single value in an unknown format.
///
/// Offsets are dropped and the wall-clock time kept.
#[must_use]
pub fn detect_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn embedded_list_is_in_order() {
        let formats = DateFormats::embedded().unwrap();
        assert_eq!(formats.formats().len(), 6);
        assert_eq!(formats.formats()[0], "%m/%d/%Y %H:%M:%S");
        assert_eq!(formats.formats()[5], "%Y-%m-%d");
    }

    #[test]
    fn selects_first_matching_format() {
        let formats = DateFormats::default();
        let values = ["01/02/2025 00:05", "garbage"];
        assert_eq!(formats.select(values.iter().copied()), Some("%m/%d/%Y %H:%M"));
        assert_eq!(formats.select(["EST", "EDT"].iter().copied()), None);
    }

    #[test]
    fn date_only_format_yields_midnight() {
        assert_eq!(parse_with("11/13/2025", "%m/%d/%Y"), Some(at(2025, 11, 13, 0, 0)));
        assert_eq!(parse_with("11/13/2025 01:00:00", "%m/%d/%Y"), None);
    }

    #[test]
    fn detects_fallback_shapes() {
        assert_eq!(detect_datetime("2025-01-01T13:00"), Some(at(2025, 1, 1, 13, 0)));
        assert_eq!(detect_datetime("2025-01-01T13:00:00-05:00"), Some(at(2025, 1, 1, 13, 0)));
        assert_eq!(detect_datetime("01/01/2025 01:30 PM"), Some(at(2025, 1, 1, 13, 30)));
        assert_eq!(detect_datetime("2025/01/01"), Some(at(2025, 1, 1, 0, 0)));
        assert_eq!(detect_datetime("EST"), None);
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            DateFormats::from_toml("formats = 3"),
            Err(TransformError::DateFormats { .. })
        ));
    }

    #[test]
    fn recognizes_date_columns() {
        assert!(is_date_column("Time Stamp"));
        assert!(is_date_column("Vintage Date"));
        assert!(is_date_column("Time Zone"));
        assert!(!is_date_column("Name"));
    }
}
