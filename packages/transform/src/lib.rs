#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report parsing and normalization.
//!
//! Two stages: [`parse::parse`] reads raw CSV into a [`Table`] with typed
//! date/time and numeric cells, then [`transform_for_storage`] hands the
//! table to the report's [`ReportTransformer`] to produce
//! [`CanonicalRecord`]s. [`openmeteo`] covers the secondary JSON weather
//! source.

pub mod dates;
pub mod numeric;
pub mod openmeteo;
pub mod parse;
pub mod reports;
pub mod table;

pub use dates::DateFormats;
pub use grid_ingest_transform_models::{CanonicalRecord, RecordFamily};
pub use parse::parse;
pub use reports::{ReportTransformer, TimestampColumn, dedicated_transformer, transformer_for};
pub use table::{Cell, Row, Table};

/// Errors that can occur while parsing or transforming a report.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The input had no data rows.
    #[error("CSV file is empty")]
    Empty,

    /// The CSV itself was malformed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No column could serve as the row timestamp.
    #[error("No timestamp column found. Available columns: {columns:?}")]
    NoTimestampColumn {
        /// Columns the table did have.
        columns: Vec<String>,
    },

    /// A date format list could not be loaded.
    #[error("Invalid date format list: {message}")]
    DateFormats {
        /// Description of what went wrong.
        message: String,
    },
}

/// Transforms a parsed table with the strategy registered for
/// `report_code`.
///
/// # Errors
///
/// Returns [`TransformError::NoTimestampColumn`] if the table has no
/// date/time column.
pub fn transform_for_storage(
    table: &Table,
    report_code: &str,
) -> Result<Vec<CanonicalRecord>, TransformError> {
    transform_with(table, transformer_for(report_code).as_ref())
}

/// Transforms a parsed table with an explicit strategy.
///
/// # Errors
///
/// Returns [`TransformError::NoTimestampColumn`] if the table has no
/// date/time column.
pub fn transform_with(
    table: &Table,
    transformer: &dyn ReportTransformer,
) -> Result<Vec<CanonicalRecord>, TransformError> {
    let timestamp = TimestampColumn::resolve(table)?;
    Ok(transformer.transform(table, &timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_lbmp() {
        let table = parse(
            "Time Stamp,Name,LBMP ($/MWHr)\n\
             11/13/2025 00:05:00,WEST,25.10\n\
             11/13/2025 00:05:00,CAPITL,31.02\n",
        )
        .unwrap();

        let records = transform_for_storage(&table, "P-24A").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind() == "zonal_price"));
    }

    #[test]
    fn unknown_report_falls_back_to_generic() {
        let table = parse("Time Stamp,Foo\n11/13/2025 00:05:00,bar\n").unwrap();
        let records = transform_for_storage(&table, "X-1").unwrap();
        let CanonicalRecord::Generic(generic) = &records[0] else {
            panic!("expected generic");
        };
        assert_eq!(generic.fields[1], ("Foo".to_string(), Some("bar".to_string())));
    }
}
