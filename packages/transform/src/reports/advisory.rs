use grid_ingest_transform_models::{Advisory, CanonicalRecord, RecordFamily};

use super::{ReportTransformer, TimestampColumn};
use crate::table::{Cell, Table};

/// Market advisories (P-31).
///
/// The report is published either as notices (`Advisory Type`, `Title`,
/// `Message`, `Severity`) or as the hour-ahead market energy summary,
/// recognizable by its `Start Time` column. The summary is stored as one
/// `HAM_Energy_Report` advisory per hour.
#[derive(Debug, Clone, Copy)]
pub struct AdvisoryTransformer;

impl AdvisoryTransformer {
    fn ham_energy(table: &Table) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                let start = row.get("Start Time")?;
                if start.as_text().is_none_or(|s| s.eq_ignore_ascii_case("total")) {
                    return None;
                }
                let timestamp = start.as_datetime()?;
                let end = row.get("End Time").and_then(Cell::as_text).unwrap_or_default();
                let start = start.as_text().unwrap_or_default();
                let generation = row.number("Generation Scheduled").unwrap_or(0.0);
                let imports = row.number("Net Imports").unwrap_or(0.0);

                Some(CanonicalRecord::Advisory(Advisory {
                    timestamp,
                    advisory_type: Some("HAM_Energy_Report".to_string()),
                    title: format!("Hour-Ahead Market Energy Report: {start} - {end}"),
                    message: Some(format!(
                        "Generation Scheduled: {generation:.1} MW, Net Imports: {imports:.1} MW"
                    )),
                    severity: Some("info".to_string()),
                }))
            })
            .collect()
    }
}

impl ReportTransformer for AdvisoryTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Advisory
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        if table.has_column("Start Time") {
            return Self::ham_energy(table);
        }

        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::Advisory(Advisory {
                    timestamp: timestamp.of(&row)?,
                    advisory_type: row.text("Advisory Type"),
                    title: row.text("Title").unwrap_or_default(),
                    message: row.text("Message"),
                    severity: row.text("Severity"),
                }))
            })
            .collect()
    }
}
