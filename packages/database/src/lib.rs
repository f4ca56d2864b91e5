#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `DuckDB` storage for the ingestion pipeline.
//!
//! [`store::open`] creates the schema idempotently. Every repository
//! function takes an explicit [`duckdb::Connection`]; a
//! [`duckdb::Transaction`] derefs to one, so the same functions run inside
//! [`writer::upsert_batch`]'s transaction.

pub mod facts;
pub mod jobs;
pub mod paths;
pub mod reference;
pub mod sources;
pub mod store;
pub mod writer;

pub use facts::{FactWriter, Upsert};
pub use grid_ingest_database_models::UpsertCounts;
pub use writer::upsert_batch;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// Filesystem error preparing the database directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A writer was handed a record of the wrong shape.
    #[error("{writer} writer cannot store a {record} record")]
    RecordMismatch {
        /// Table the writer targets.
        writer: &'static str,
        /// Variant it was given.
        record: &'static str,
    },

    /// A job transition was not allowed from its current state.
    #[error("Job {job_id}: {message}")]
    JobState {
        /// The job.
        job_id: i64,
        /// Description of what went wrong.
        message: String,
    },

    /// Stored data could not be converted back.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Maps `QueryReturnedNoRows` to `None`.
pub(crate) fn optional<T>(result: duckdb::Result<T>) -> Result<Option<T>, DbError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Formats a timestamp for binding as `CAST(? AS TIMESTAMP)`.
pub(crate) fn sql_timestamp(value: chrono::NaiveDateTime) -> String {
    value.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

/// Parses a `DuckDB` `TIMESTAMP::VARCHAR` back into a naive timestamp.
///
/// The cast omits fractional seconds when they are zero and may carry an
/// offset for `TIMESTAMPTZ` values.
pub(crate) fn parse_timestamp(s: &str) -> Option<chrono::NaiveDateTime> {
    use chrono::{DateTime, NaiveDateTime};

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive);
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.naive_utc());
    }

    log::warn!("Failed to parse timestamp: {s:?}");
    None
}

/// Like [`parse_timestamp`] but for a required column.
pub(crate) fn require_timestamp(s: &str) -> Result<chrono::NaiveDateTime, DbError> {
    parse_timestamp(s).ok_or_else(|| DbError::Conversion {
        message: format!("invalid timestamp {s:?}"),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn timestamps_survive_text_round_trip() {
        let ts = NaiveDate::from_ymd_opt(2025, 11, 13)
            .unwrap()
            .and_hms_opt(0, 5, 0)
            .unwrap();
        assert_eq!(sql_timestamp(ts), "2025-11-13 00:05:00");
        assert_eq!(parse_timestamp("2025-11-13 00:05:00"), Some(ts));
        assert_eq!(parse_timestamp("2025-11-13 05:05:00+05"), Some(ts));
        assert_eq!(parse_timestamp("not a time"), None);
    }
}
