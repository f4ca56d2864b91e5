use grid_ingest_transform_models::{CanonicalRecord, Load, LoadForecast, RecordFamily};

use super::{ReportTransformer, TimestampColumn, id_field};
use crate::table::Table;

/// Real-time actual load (P-58B).
#[derive(Debug, Clone, Copy)]
pub struct LoadTransformer;

impl ReportTransformer for LoadTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Load
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::Load(Load {
                    timestamp: timestamp.of(&row)?,
                    zone_name: row.text("Name").unwrap_or_default(),
                    ptid: id_field(&row, &["PTID"]),
                    load: row.number("Load"),
                    time_zone: row.text("Time Zone"),
                }))
            })
            .collect()
    }
}

/// Load forecast (P-7), published wide: one column per zone.
///
/// The `NYISO` system total column is not a zone and is skipped.
#[derive(Debug, Clone, Copy)]
pub struct LoadForecastTransformer;

impl ReportTransformer for LoadForecastTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::LoadForecast
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        let zones: Vec<&String> = table
            .columns()
            .iter()
            .filter(|c| c.as_str() != timestamp.name() && c.as_str() != "NYISO")
            .collect();

        let mut records = Vec::with_capacity(table.len() * zones.len());
        for row in table.rows() {
            let Some(ts) = timestamp.of(&row) else {
                continue;
            };
            for zone in &zones {
                records.push(CanonicalRecord::LoadForecast(LoadForecast {
                    timestamp: ts,
                    zone_name: zone.to_uppercase(),
                    forecast_load: row.number(zone),
                }));
            }
        }
        records
    }
}
