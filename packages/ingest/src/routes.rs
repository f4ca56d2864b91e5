//! Report code → (transformer, writer) routing.
//!
//! The transform crate's strategy table is the only list of report codes.
//! Each strategy names the record family it emits, and the writer is picked
//! by that family.

use chrono::NaiveDateTime;
use duckdb::Connection;
use grid_ingest_database::facts::{FactWriter, writer_for};
use grid_ingest_database::{DbError, UpsertCounts, writer};
use grid_ingest_transform::{
    CanonicalRecord, ReportTransformer, Table, TransformError, dedicated_transformer,
    transformer_for,
};

struct Route {
    transformer: Box<dyn ReportTransformer>,
    writer: Box<dyn FactWriter>,
}

fn route(report_code: &str) -> Option<Route> {
    let transformer = dedicated_transformer(report_code)?;
    let writer = writer_for(transformer.family())?;
    Some(Route {
        transformer,
        writer,
    })
}

/// Transformation and storage strategy per report code.
///
/// Unknown codes still parse (through the generic transformer) but are not
/// stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportRoutes;

impl ReportRoutes {
    /// Routes for every report with a dedicated strategy.
    #[must_use]
    pub const fn standard() -> Self {
        Self
    }

    /// Whether `report_code` has a storage table.
    #[must_use]
    pub fn is_routed(&self, report_code: &str) -> bool {
        route(report_code).is_some()
    }

    /// Writer for `report_code`, if it has one.
    #[must_use]
    pub fn writer(&self, report_code: &str) -> Option<Box<dyn FactWriter>> {
        route(report_code).map(|r| r.writer)
    }

    /// Maps a parsed table into canonical records.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NoTimestampColumn`] if the table has no
    /// usable timestamp column.
    pub fn transform(
        &self,
        table: &Table,
        report_code: &str,
    ) -> Result<Vec<CanonicalRecord>, TransformError> {
        let transformer = route(report_code)
            .map_or_else(|| transformer_for(report_code), |r| r.transformer);
        grid_ingest_transform::transform_with(table, transformer.as_ref())
    }

    /// Stores `records` through the writer for `report_code` in one
    /// transaction.
    ///
    /// An unrouted code writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] after rolling back if any record fails.
    pub fn upsert(
        &self,
        conn: &mut Connection,
        report_code: &str,
        records: &[CanonicalRecord],
        now: NaiveDateTime,
    ) -> Result<UpsertCounts, DbError> {
        let Some(route) = route(report_code) else {
            log::warn!(
                "No storage table for {report_code}; dropping {} records",
                records.len()
            );
            return Ok(UpsertCounts::default());
        };

        writer::upsert_batch_at(conn, route.writer.as_ref(), records, now)
    }
}
