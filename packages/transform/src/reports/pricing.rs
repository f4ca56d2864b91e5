use grid_ingest_transform_models::{
    Ancillary, CanonicalRecord, ExternalRto, MarketType, PriceMarket, RecordFamily, ZonalPrice,
};

use super::{ReportTransformer, TimestampColumn, id_field};
use crate::table::Table;

// ── Zonal LBMP ───────────────────────────────────────────────────────────

/// Real-time, day-ahead, and time-weighted zonal LBMP (P-24A, P-2A, P-4A).
#[derive(Debug, Clone, Copy)]
pub struct ZonalPriceTransformer {
    market: PriceMarket,
}

impl ZonalPriceTransformer {
    #[must_use]
    pub const fn new(market: PriceMarket) -> Self {
        Self { market }
    }
}

impl ReportTransformer for ZonalPriceTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::ZonalPrice(self.market)
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::ZonalPrice(ZonalPrice {
                    timestamp: timestamp.of(&row)?,
                    market: self.market,
                    zone_name: row.text("Name").unwrap_or_default(),
                    ptid: id_field(&row, &["PTID"]),
                    lbmp: row.number("LBMP ($/MWHr)"),
                    marginal_cost_losses: row.number("Marginal Cost Losses ($/MWHr)"),
                    marginal_cost_congestion: row.number("Marginal Cost Congestion ($/MWHr)"),
                }))
            })
            .collect()
    }
}

// ── Ancillary services ───────────────────────────────────────────────────

/// Service price columns and the label each is stored under.
const SERVICE_COLUMNS: &[(&str, &str)] = &[
    ("10 Min Spinning Reserve ($/MWHr)", "spinning_reserve"),
    ("10 Min Non-Synchronous Reserve ($/MWHr)", "non_sync_reserve"),
    ("30 Min Operating Reserve ($/MWHr)", "operating_reserve"),
    ("NYCA Regulation Capacity ($/MWHr)", "regulation_capacity"),
    ("NYCA Regulation Movement ($/MW)", "regulation_movement"),
];

/// Ancillary service prices (P-6B, P-5), one record per priced service.
///
/// Null and zero prices are not stored.
#[derive(Debug, Clone, Copy)]
pub struct AncillaryTransformer {
    market: MarketType,
}

impl AncillaryTransformer {
    #[must_use]
    pub const fn new(market: MarketType) -> Self {
        Self { market }
    }
}

impl ReportTransformer for AncillaryTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Ancillary
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        let mut records = Vec::new();

        for row in table.rows() {
            let Some(ts) = timestamp.of(&row) else {
                continue;
            };
            let zone_name = row.text("Name").unwrap_or_default();

            for (column, service_type) in SERVICE_COLUMNS {
                let Some(price) = row.number(column).filter(|p| *p != 0.0) else {
                    continue;
                };
                records.push(CanonicalRecord::Ancillary(Ancillary {
                    timestamp: ts,
                    zone_name: zone_name.clone(),
                    market_type: self.market,
                    service_type: (*service_type).to_string(),
                    price,
                }));
            }
        }

        records
    }
}

// ── External RTO (CTS) ───────────────────────────────────────────────────

/// Maps a generator name to the neighbouring RTO it represents.
fn rto_from_generator(name: &str) -> Option<&'static str> {
    let upper = name.to_uppercase();
    if upper.contains("ISO-NE") || upper.contains("N.E.") || upper.contains("NE_") {
        Some("ISO-NE")
    } else if upper.contains("PJM") {
        Some("PJM")
    } else if upper.contains("IESO") {
        Some("IESO")
    } else {
        None
    }
}

/// External RTO CTS prices (P-42).
///
/// Rows whose generator cannot be attributed to an RTO are skipped.
#[derive(Debug, Clone, Copy)]
pub struct ExternalRtoTransformer;

impl ReportTransformer for ExternalRtoTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::ExternalRto
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        let end_stamp = table
            .has_column("RTC End Time Stamp")
            .then_some("RTC End Time Stamp");

        table
            .rows()
            .filter_map(|row| {
                let generator = row.first_text(&["Gen Name", "Generator Name"])?;
                let rto_name = rto_from_generator(&generator)?;
                let ts = match end_stamp {
                    Some(column) => row.datetime(column),
                    None => timestamp.of(&row),
                }?;

                let rtc_price = row.first_number(&["Gen LBMP", "RTC Price", "RTC"]);
                let cts_price = row.first_number(&["External RTO CTS Price", "CTS Price", "CTS"]);
                let price_difference = rtc_price.zip(cts_price).map(|(rtc, cts)| rtc - cts);

                Some(CanonicalRecord::ExternalRto(ExternalRto {
                    timestamp: ts,
                    rto_name: rto_name.to_string(),
                    rtc_price,
                    cts_price,
                    price_difference,
                }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn run(transformer: &dyn ReportTransformer, csv: &str) -> Vec<CanonicalRecord> {
        let table = parse(csv).unwrap();
        let ts = TimestampColumn::resolve(&table).unwrap();
        transformer.transform(&table, &ts)
    }

    #[test]
    fn zonal_price_reads_lbmp_columns() {
        let records = run(
            &ZonalPriceTransformer::new(PriceMarket::Dayahead),
            "Time Stamp,Name,PTID,LBMP ($/MWHr),Marginal Cost Losses ($/MWHr),Marginal Cost Congestion ($/MWHr)\n\
             11/13/2025 00:00,WEST,61752,30.5,1.25,-0.5\n",
        );
        let CanonicalRecord::ZonalPrice(price) = &records[0] else {
            panic!("expected zonal price");
        };
        assert_eq!(price.market, PriceMarket::Dayahead);
        assert_eq!(price.ptid, Some(61752));
        assert_eq!(price.lbmp, Some(30.5));
        assert_eq!(price.marginal_cost_congestion, Some(-0.5));
    }

    #[test]
    fn ancillary_skips_null_and_zero_services() {
        let records = run(
            &AncillaryTransformer::new(MarketType::Realtime),
            "Time Stamp,Name,PTID,10 Min Spinning Reserve ($/MWHr),10 Min Non-Synchronous Reserve ($/MWHr),30 Min Operating Reserve ($/MWHr),NYCA Regulation Capacity ($/MWHr),NYCA Regulation Movement ($/MW)\n\
             11/13/2025 00:05:00,WEST,61752,5.5,0,2.25,,\n",
        );

        let services: Vec<&str> = records
            .iter()
            .map(|r| match r {
                CanonicalRecord::Ancillary(a) => a.service_type.as_str(),
                _ => panic!("expected ancillary"),
            })
            .collect();
        assert_eq!(services, vec!["spinning_reserve", "operating_reserve"]);
    }

    #[test]
    fn external_rto_attributes_generators() {
        let records = run(
            &ExternalRtoTransformer,
            "RTC Execution Time,RTC End Time Stamp,Gen Name,Gen LBMP,External RTO CTS Price\n\
             11/13/2025 00:00:00,11/13/2025 00:15:00,N.E._GEN_SANDY PD,40,35.5\n\
             11/13/2025 00:00:00,11/13/2025 00:15:00,PJM_GEN_KEYSTONE,41,\n\
             11/13/2025 00:00:00,11/13/2025 00:15:00,HQ_GEN_CEDARS,39,38\n",
        );

        assert_eq!(records.len(), 2);
        let CanonicalRecord::ExternalRto(ne) = &records[0] else {
            panic!("expected external rto");
        };
        assert_eq!(ne.rto_name, "ISO-NE");
        assert_eq!(ne.price_difference, Some(4.5));
        assert_eq!(ne.timestamp.format("%H:%M").to_string(), "00:15");
        let CanonicalRecord::ExternalRto(pjm) = &records[1] else {
            panic!("expected external rto");
        };
        assert_eq!(pjm.price_difference, None);
    }

    #[test]
    fn rto_priority_is_fixed() {
        assert_eq!(rto_from_generator("pjm_ne_tie"), Some("ISO-NE"));
        assert_eq!(rto_from_generator("IESO_PJM"), Some("PJM"));
        assert_eq!(rto_from_generator("OH_IESO"), Some("IESO"));
        assert_eq!(rto_from_generator("HQ"), None);
    }
}
