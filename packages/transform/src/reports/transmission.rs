use grid_ingest_transform_models::{
    AtcTtc, CanonicalRecord, Constraint, ForecastType, InterfaceFlow, MarketType, RecordFamily,
};

use super::{ReportTransformer, TimestampColumn, id_field};
use crate::table::{Row, Table};

// ── Interface flows ──────────────────────────────────────────────────────

/// Interface limits and flows (P-32, P-32-CURRENT).
#[derive(Debug, Clone, Copy)]
pub struct InterfaceFlowTransformer;

impl ReportTransformer for InterfaceFlowTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::InterfaceFlow
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::InterfaceFlow(InterfaceFlow {
                    timestamp: timestamp.of(&row)?,
                    interface_name: row.text("Interface Name").unwrap_or_default(),
                    point_id: id_field(&row, &["Point ID"]),
                    flow_mwh: row.number("Flow (MWH)"),
                    positive_limit_mwh: row.number("Positive Limit (MWH)"),
                    negative_limit_mwh: row.number("Negative Limit (MWH)"),
                }))
            })
            .collect()
    }
}

// ── Constraints ──────────────────────────────────────────────────────────

/// Binding transmission constraints (P-33, P-511A).
#[derive(Debug, Clone, Copy)]
pub struct ConstraintTransformer {
    market: MarketType,
}

impl ConstraintTransformer {
    #[must_use]
    pub const fn new(market: MarketType) -> Self {
        Self { market }
    }
}

impl ReportTransformer for ConstraintTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::Constraint
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                Some(CanonicalRecord::Constraint(Constraint {
                    timestamp: timestamp.of(&row)?,
                    constraint_name: row
                        .first_text(&["Constraint Name", "Name"])
                        .unwrap_or_default(),
                    market_type: self.market,
                    shadow_price: row.first_number(&["Shadow Price", "Price"]),
                    binding_status: row.first_text(&["Binding Status", "Status"]),
                    limit_mw: row.first_number(&["Limit (MW)", "Limit"]),
                    flow_mw: row.first_number(&["Flow (MW)", "Flow"]),
                }))
            })
            .collect()
    }
}

// ── ATC / TTC ────────────────────────────────────────────────────────────

const HAM_TTC: &str = "TTC (HAM) xx:00";
const HAM_ATC: &str = "ATC (HAM) xx:00";
const DAM_TTC: &str = "TTC (DAM)";
const DAM_ATC: &str = "ATC (DAM)";

/// Available and total transfer capability (P-8 short term, P-8A long term).
///
/// The short-term report is wide, with day-ahead and several hour-ahead
/// snapshots per row. Only the `xx:00` hour-ahead pair is kept, with the
/// day-ahead pair as fallback when both hour-ahead values are missing.
#[derive(Debug, Clone, Copy)]
pub struct AtcTtcTransformer {
    forecast_type: ForecastType,
}

impl AtcTtcTransformer {
    #[must_use]
    pub const fn new(forecast_type: ForecastType) -> Self {
        Self { forecast_type }
    }

    fn short_term(table: &Table, row: &Row<'_>) -> (Option<f64>, Option<f64>) {
        let pair = |ttc: &str, atc: &str| {
            if table.has_column(ttc) && table.has_column(atc) {
                (row.number(ttc), row.number(atc))
            } else {
                (None, None)
            }
        };

        match pair(HAM_TTC, HAM_ATC) {
            (None, None) => pair(DAM_TTC, DAM_ATC),
            values => values,
        }
    }
}

impl ReportTransformer for AtcTtcTransformer {
    fn family(&self) -> RecordFamily {
        RecordFamily::AtcTtc
    }

    fn transform(&self, table: &Table, timestamp: &TimestampColumn) -> Vec<CanonicalRecord> {
        table
            .rows()
            .filter_map(|row| {
                let ts = timestamp.of(&row)?;
                let interface_name = row
                    .first_text(&["Interface Name", "Interface"])
                    .unwrap_or_default();

                let record = match self.forecast_type {
                    ForecastType::ShortTerm => {
                        let (ttc_mw, atc_mw) = Self::short_term(table, &row);
                        if ttc_mw.is_none() && atc_mw.is_none() {
                            return None;
                        }
                        AtcTtc {
                            timestamp: ts,
                            interface_name,
                            forecast_type: self.forecast_type,
                            atc_mw,
                            ttc_mw,
                            trm_mw: None,
                            direction: String::new(),
                        }
                    }
                    ForecastType::LongTerm => AtcTtc {
                        timestamp: ts,
                        interface_name,
                        forecast_type: self.forecast_type,
                        atc_mw: row.first_number(&["ATC (MW)", "ATC"]),
                        ttc_mw: row.first_number(&["TTC (MW)", "TTC"]),
                        trm_mw: row.first_number(&["TRM (MW)", "TRM"]),
                        direction: row
                            .first_text(&["Direction", "Flow Direction"])
                            .unwrap_or_default(),
                    },
                };

                Some(CanonicalRecord::AtcTtc(record))
            })
            .collect()
    }
}
