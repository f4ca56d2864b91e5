//! Per-report transformation strategies.
//!
//! Each published report has its own column layout. A [`ReportTransformer`]
//! turns a parsed [`Table`] into [`CanonicalRecord`]s for one layout and
//! names the [`RecordFamily`] it produces. [`dedicated_transformer`] is the
//! one table from report code to strategy; [`transformer_for`] falls back
//! to [`GenericTransformer`] for codes it does not list.

mod advisory;
mod fuel_mix;
mod generic;
mod load;
mod outages;
mod pricing;
mod transmission;
mod weather;

use chrono::NaiveDateTime;
use grid_ingest_transform_models::{
    CanonicalRecord, ForecastType, MarketType, OutageType, PriceMarket, RecordFamily,
};

pub use advisory::AdvisoryTransformer;
pub use fuel_mix::FuelMixTransformer;
pub use generic::GenericTransformer;
pub use load::{LoadForecastTransformer, LoadTransformer};
pub use outages::OutageTransformer;
pub use pricing::{AncillaryTransformer, ExternalRtoTransformer, ZonalPriceTransformer};
pub use transmission::{AtcTtcTransformer, ConstraintTransformer, InterfaceFlowTransformer};
pub use weather::WeatherTransformer;

use crate::dates::is_date_column;
use crate::parse::TIMESTAMP;
use crate::table::{Row, Table};
use crate::TransformError;

/// Converts one report layout into canonical records.
pub trait ReportTransformer: Send + Sync {
    /// Family of every record this strategy produces.
    fn family(&self) -> RecordFamily;

    /// Produces records for every usable row of `table`.
    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord>;
}

/// The column holding each row's canonical timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampColumn(String);

impl TimestampColumn {
    /// Picks `timestamp`, else `Time Stamp`, else the first date/time
    /// column.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NoTimestampColumn`] if the table has no
    /// date/time column at all.
    pub fn resolve(table: &Table) -> Result<Self, TransformError> {
        let columns = table.columns();
        [TIMESTAMP, "Time Stamp"]
            .iter()
            .find(|name| table.has_column(name))
            .map(|name| (*name).to_string())
            .or_else(|| columns.iter().find(|c| is_date_column(c)).cloned())
            .map(Self)
            .ok_or_else(|| TransformError::NoTimestampColumn {
                columns: columns.to_vec(),
            })
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// This row's timestamp, if it parsed.
    #[must_use]
    pub fn of(&self, row: &Row<'_>) -> Option<NaiveDateTime> {
        row.datetime(&self.0)
    }
}

/// Dedicated strategy for `report_code`, if the report has one.
#[must_use]
pub fn dedicated_transformer(report_code: &str) -> Option<Box<dyn ReportTransformer>> {
    let transformer: Box<dyn ReportTransformer> = match report_code {
        "P-24A" => Box::new(ZonalPriceTransformer::new(PriceMarket::Realtime)),
        "P-2A" => Box::new(ZonalPriceTransformer::new(PriceMarket::Dayahead)),
        "P-4A" => Box::new(ZonalPriceTransformer::new(PriceMarket::Timeweighted)),
        "P-58B" => Box::new(LoadTransformer),
        "P-7" => Box::new(LoadForecastTransformer),
        "P-32" | "P-32-CURRENT" => Box::new(InterfaceFlowTransformer),
        "P-6B" => Box::new(AncillaryTransformer::new(MarketType::Realtime)),
        "P-5" => Box::new(AncillaryTransformer::new(MarketType::Dayahead)),
        "P-31" => Box::new(AdvisoryTransformer),
        "P-33" => Box::new(ConstraintTransformer::new(MarketType::Realtime)),
        "P-511A" => Box::new(ConstraintTransformer::new(MarketType::Dayahead)),
        "P-42" => Box::new(ExternalRtoTransformer),
        "P-8" => Box::new(AtcTtcTransformer::new(ForecastType::ShortTerm)),
        "P-8A" => Box::new(AtcTtcTransformer::new(ForecastType::LongTerm)),
        "P-54A" => Box::new(OutageTransformer::new(OutageType::Scheduled, Some(MarketType::Realtime))),
        "P-54B" => Box::new(OutageTransformer::new(OutageType::Actual, Some(MarketType::Realtime))),
        "P-54C" => Box::new(OutageTransformer::new(OutageType::Scheduled, Some(MarketType::Dayahead))),
        "P-14B" => Box::new(OutageTransformer::new(OutageType::Scheduled, None)),
        "P-15" => Box::new(OutageTransformer::new(OutageType::Maintenance, None)),
        "P-7A" => Box::new(WeatherTransformer),
        "P-63" => Box::new(FuelMixTransformer),
        _ => return None,
    };
    Some(transformer)
}

/// Strategy for `report_code`, [`GenericTransformer`] when it has none.
#[must_use]
pub fn transformer_for(report_code: &str) -> Box<dyn ReportTransformer> {
    dedicated_transformer(report_code).unwrap_or_else(|| Box::new(GenericTransformer))
}

/// Reads an integer id (PTID, point id) from a numeric cell.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn id_field(row: &Row<'_>, names: &[&str]) -> Option<i64> {
    row.first_number(names)
        .filter(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
        .map(|n| n as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn resolves_promoted_timestamp_first() {
        let table = parse("Time Stamp,Name\n11/13/2025 00:05:00,WEST\n").unwrap();
        assert_eq!(TimestampColumn::resolve(&table).unwrap().name(), TIMESTAMP);
    }

    #[test]
    fn falls_back_to_first_date_column() {
        let table = parse("Start Time,Other\n11/13/2025 00:05:00,x\n").unwrap();
        assert_eq!(TimestampColumn::resolve(&table).unwrap().name(), "Start Time");
    }

    #[test]
    fn strategies_declare_the_family_they_emit() {
        let table = parse(
            "Time Stamp,Name,PTID,LBMP ($/MWHr)\n\
             11/13/2025 00:05:00,WEST,61752,25.10\n",
        )
        .unwrap();
        let timestamp = TimestampColumn::resolve(&table).unwrap();

        let transformer = dedicated_transformer("P-2A").unwrap();
        assert_eq!(transformer.family(), RecordFamily::ZonalPrice(PriceMarket::Dayahead));
        let records = transformer.transform(&table, &timestamp);
        assert!(!records.is_empty());
        assert!(records.iter().all(|r| r.family() == transformer.family()));

        assert!(dedicated_transformer("X-1").is_none());
        assert_eq!(transformer_for("X-1").family(), RecordFamily::Generic);
    }

    #[test]
    fn reports_missing_timestamp_column() {
        let table = parse("Name,Value\nWEST,1\n").unwrap();
        match TimestampColumn::resolve(&table) {
            Err(TransformError::NoTimestampColumn { columns }) => {
                assert_eq!(columns, vec!["Name".to_string(), "Value".to_string()]);
            }
            other => panic!("expected NoTimestampColumn, got {other:?}"),
        }
    }
}
