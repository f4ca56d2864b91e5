use grid_ingest_transform_models::{CanonicalRecord, Generic, RecordFamily};

use super::{ReportTransformer, TimestampColumn};
use crate::table::Table;

/// Fallback for reports with no dedicated layout: every cell as text.
#[derive(Debug, Clone, Copy)]
pub struct GenericTransformer;

impl ReportTransformer for GenericTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Generic
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::Generic(Generic {
                    timestamp: timestamp.of(&row)?,
                    fields: row
                        .cells()
                        .map(|(column, cell)| (column.to_string(), cell.as_text()))
                        .collect(),
                }))
            })
            .collect()
    }
}
