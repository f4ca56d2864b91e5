use grid_ingest_transform_models::{CanonicalRecord, MarketType, Outage, OutageType, RecordFamily};

use super::{ReportTransformer, TimestampColumn};
use crate::table::Table;

/// Generator and transmission outages (P-54A/B/C, P-14B, P-15).
#[derive(Debug, Clone, Copy)]
pub struct OutageTransformer {
    outage_type: OutageType,
    market: Option<MarketType>,
}

impl OutageTransformer {
    #[must_use]
    pub const fn new(outage_type: OutageType, market: Option<MarketType>) -> Self {
        Self {
            outage_type,
            market,
        }
    }
}

impl ReportTransformer for OutageTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Outage
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::Outage(Outage {
                    timestamp: timestamp.of(&row)?,
                    outage_type: self.outage_type,
                    market_type: self.market,
                    resource_name: row
                        .first_text(&["Resource Name", "Name", "Unit"])
                        .unwrap_or_default(),
                    resource_type: row.first_text(&["Resource Type", "Type"]),
                    mw_capacity: row.first_number(&["Capacity (MW)", "Capacity"]),
                    mw_outage: row.first_number(&["Outage (MW)", "Outage"]),
                    start_time: row.first_datetime(&["Start Time", "Start"]),
                    end_time: row.first_datetime(&["End Time", "End"]),
                    status: row.text("Status"),
                }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    #[test]
    fn reads_outage_window() {
        let table = parse(
            "Timestamp,Unit,Type,Capacity,Outage (MW),Start Time,End Time,Status\n\
             11/13/2025 00:00,ROSETON 1,STEAM,600,600,11/12/2025 06:00,11/20/2025 18:00,ACTIVE\n",
        )
        .unwrap();
        let ts = TimestampColumn::resolve(&table).unwrap();
        let records =
            OutageTransformer::new(OutageType::Scheduled, Some(MarketType::Realtime)).transform(&table, &ts);

        let CanonicalRecord::Outage(outage) = &records[0] else {
            panic!("expected outage");
        };
        assert_eq!(outage.resource_name, "ROSETON 1");
        assert_eq!(outage.resource_type.as_deref(), Some("STEAM"));
        assert_eq!(outage.mw_capacity, Some(600.0));
        assert!(outage.start_time.is_some() && outage.end_time.is_some());
        assert_eq!(outage.market_type, Some(MarketType::Realtime));
    }
}
