use grid_ingest_transform_models::{CanonicalRecord, FuelMix, RecordFamily};

use super::{ReportTransformer, TimestampColumn};
use crate::table::Table;

/// Columns never treated as fuels in the wide layout.
const NON_FUEL_COLUMNS: &[&str] = &["total", "timestamp", "time", "time zone"];

/// Real-time fuel mix (P-63), long or wide.
///
/// Long files have a `Fuel Category` column and a generation MW column;
/// wide files have one column per fuel.
#[derive(Debug, Clone, Copy)]
pub struct FuelMixTransformer;

fn normalize_fuel(name: &str) -> String {
    name.trim().to_lowercase().replace([' ', '-'], "_")
}

impl FuelMixTransformer {
    fn long(table: &Table, timestamp: &TimestampColumn, category: &str) -> Vec<CanonicalRecord> {
        let generation = table
            .columns()
            .iter()
            .find(|c| {
                let lower = c.to_lowercase();
                lower.contains("gen") && lower.contains("mw")
            })
            .map_or("Gen MW", String::as_str);

        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::FuelMix(FuelMix {
                    timestamp: timestamp.of(&row)?,
                    fuel_type: normalize_fuel(&row.text(category)?),
                    generation_mw: row.number(generation)?,
                    percentage: None,
                }))
            })
            .collect()
    }

    fn wide(table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        let fuels: Vec<&String> = table
            .columns()
            .iter()
            .filter(|c| {
                c.as_str() != timestamp.name() && !NON_FUEL_COLUMNS.contains(&c.to_lowercase().as_str())
            })
            .collect();

        let mut records = Vec::new();
        for row in table.rows() {
            let Some(ts) = timestamp.of(&row) else {
                continue;
            };
            for fuel in &fuels {
                let Some(generation_mw) = row.number(fuel).filter(|mw| *mw != 0.0) else {
                    continue;
                };
                records.push(CanonicalRecord::FuelMix(FuelMix {
                    timestamp: ts,
                    fuel_type: normalize_fuel(fuel),
                    generation_mw,
                    percentage: None,
                }));
            }
        }
        records
    }
}

impl ReportTransformer for FuelMixTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::FuelMix
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        let category = table.columns().iter().find(|c| {
            let lower = c.to_lowercase();
            lower.contains("fuel") && lower.contains("category")
        });

        match category {
            Some(category) => Self::long(table, timestamp, category),
            None => Self::wide(table, timestamp),
        }
    }
}
