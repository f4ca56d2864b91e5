#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Canonical fact records.
//!
//! Every report, whatever its CSV layout, is normalized into one of the
//! [`CanonicalRecord`] shapes below before it reaches storage. Entity
//! references (zones, interfaces) are carried by name; the writer resolves
//! them to ids.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which LBMP table a zonal price belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PriceMarket {
    /// Real-time (5-minute) prices.
    Realtime,
    /// Day-ahead hourly prices.
    Dayahead,
    /// Time-weighted real-time prices.
    Timeweighted,
}

/// Market a constraint, ancillary price, or outage applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MarketType {
    /// Real-time market.
    Realtime,
    /// Day-ahead market.
    Dayahead,
}

/// Horizon of an ATC/TTC figure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ForecastType {
    /// Hour-ahead / day-ahead figures (P-8).
    ShortTerm,
    /// Long-term figures (P-8A).
    LongTerm,
}

/// Kind of outage report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutageType {
    /// Planned outage.
    Scheduled,
    /// Outage in effect.
    Actual,
    /// Maintenance window.
    Maintenance,
}

/// LBMP for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonalPrice {
    pub timestamp: NaiveDateTime,
    pub market: PriceMarket,
    pub zone_name: String,
    pub ptid: Option<i64>,
    pub lbmp: Option<f64>,
    pub marginal_cost_losses: Option<f64>,
    pub marginal_cost_congestion: Option<f64>,
}

/// Actual load for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub timestamp: NaiveDateTime,
    pub zone_name: String,
    pub ptid: Option<i64>,
    pub load: Option<f64>,
    pub time_zone: Option<String>,
}

/// Forecast load for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadForecast {
    pub timestamp: NaiveDateTime,
    pub zone_name: String,
    pub forecast_load: Option<f64>,
}

/// Flow across one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceFlow {
    pub timestamp: NaiveDateTime,
    pub interface_name: String,
    pub point_id: Option<i64>,
    pub flow_mwh: Option<f64>,
    pub positive_limit_mwh: Option<f64>,
    pub negative_limit_mwh: Option<f64>,
}

/// One ancillary service price for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ancillary {
    pub timestamp: NaiveDateTime,
    pub zone_name: String,
    pub market_type: MarketType,
    pub service_type: String,
    pub price: f64,
}

/// A market advisory notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub timestamp: NaiveDateTime,
    pub advisory_type: Option<String>,
    pub title: String,
    pub message: Option<String>,
    pub severity: Option<String>,
}

/// A transmission constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub timestamp: NaiveDateTime,
    pub constraint_name: String,
    pub market_type: MarketType,
    pub shadow_price: Option<f64>,
    pub binding_status: Option<String>,
    pub limit_mw: Option<f64>,
    pub flow_mw: Option<f64>,
}

/// Coordinated transaction scheduling prices against a neighbouring RTO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalRto {
    pub timestamp: NaiveDateTime,
    pub rto_name: String,
    pub rtc_price: Option<f64>,
    pub cts_price: Option<f64>,
    pub price_difference: Option<f64>,
}

/// Available and total transfer capability of one interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtcTtc {
    pub timestamp: NaiveDateTime,
    pub interface_name: String,
    pub forecast_type: ForecastType,
    pub atc_mw: Option<f64>,
    pub ttc_mw: Option<f64>,
    pub trm_mw: Option<f64>,
    pub direction: String,
}

/// A generator or transmission outage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outage {
    pub timestamp: NaiveDateTime,
    pub outage_type: OutageType,
    pub market_type: Option<MarketType>,
    pub resource_name: String,
    pub resource_type: Option<String>,
    pub mw_capacity: Option<f64>,
    pub mw_outage: Option<f64>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub status: Option<String>,
}

/// One hourly weather observation or forecast at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub timestamp: NaiveDateTime,
    pub forecast_time: NaiveDateTime,
    pub location: String,
    pub vintage: String,
    pub temperature_f: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub wind_speed_mph: Option<f64>,
    pub wind_direction: String,
    pub cloud_cover_percent: Option<f64>,
    pub zone_name: Option<String>,
    pub irradiance_w_m2: Option<f64>,
    pub data_source: String,
}

/// Generation from one fuel category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelMix {
    pub timestamp: NaiveDateTime,
    pub fuel_type: String,
    pub generation_mw: f64,
    pub percentage: Option<f64>,
}

/// A row from a report with no dedicated shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generic {
    pub timestamp: NaiveDateTime,
    /// Column name to cell text, in column order.
    pub fields: Vec<(String, Option<String>)>,
}

/// Storage family of a record. Zonal prices are split by market, one table
/// each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordFamily {
    ZonalPrice(PriceMarket),
    Load,
    LoadForecast,
    InterfaceFlow,
    Ancillary,
    Advisory,
    Constraint,
    ExternalRto,
    AtcTtc,
    Outage,
    Weather,
    FuelMix,
    Generic,
}

/// A normalized fact, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CanonicalRecord {
    ZonalPrice(ZonalPrice),
    Load(Load),
    LoadForecast(LoadForecast),
    InterfaceFlow(InterfaceFlow),
    Ancillary(Ancillary),
    Advisory(Advisory),
    Constraint(Constraint),
    ExternalRto(ExternalRto),
    AtcTtc(AtcTtc),
    Outage(Outage),
    Weather(Weather),
    FuelMix(FuelMix),
    Generic(Generic),
}

impl CanonicalRecord {
    /// The record's canonical timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> NaiveDateTime {
        match self {
            Self::ZonalPrice(r) => r.timestamp,
            Self::Load(r) => r.timestamp,
            Self::LoadForecast(r) => r.timestamp,
            Self::InterfaceFlow(r) => r.timestamp,
            Self::Ancillary(r) => r.timestamp,
            Self::Advisory(r) => r.timestamp,
            Self::Constraint(r) => r.timestamp,
            Self::ExternalRto(r) => r.timestamp,
            Self::AtcTtc(r) => r.timestamp,
            Self::Outage(r) => r.timestamp,
            Self::Weather(r) => r.timestamp,
            Self::FuelMix(r) => r.timestamp,
            Self::Generic(r) => r.timestamp,
        }
    }

    /// The family this record is stored under.
    #[must_use]
    pub const fn family(&self) -> RecordFamily {
        match self {
            Self::ZonalPrice(r) => RecordFamily::ZonalPrice(r.market),
            Self::Load(_) => RecordFamily::Load,
            Self::LoadForecast(_) => RecordFamily::LoadForecast,
            Self::InterfaceFlow(_) => RecordFamily::InterfaceFlow,
            Self::Ancillary(_) => RecordFamily::Ancillary,
            Self::Advisory(_) => RecordFamily::Advisory,
            Self::Constraint(_) => RecordFamily::Constraint,
            Self::ExternalRto(_) => RecordFamily::ExternalRto,
            Self::AtcTtc(_) => RecordFamily::AtcTtc,
            Self::Outage(_) => RecordFamily::Outage,
            Self::Weather(_) => RecordFamily::Weather,
            Self::FuelMix(_) => RecordFamily::FuelMix,
            Self::Generic(_) => RecordFamily::Generic,
        }
    }

    /// Short name of the variant, for logs and mismatch errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ZonalPrice(_) => "zonal_price",
            Self::Load(_) => "load",
            Self::LoadForecast(_) => "load_forecast",
            Self::InterfaceFlow(_) => "interface_flow",
            Self::Ancillary(_) => "ancillary",
            Self::Advisory(_) => "advisory",
            Self::Constraint(_) => "constraint",
            Self::ExternalRto(_) => "external_rto",
            Self::AtcTtc(_) => "atc_ttc",
            Self::Outage(_) => "outage",
            Self::Weather(_) => "weather",
            Self::FuelMix(_) => "fuel_mix",
            Self::Generic(_) => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn discriminators_render_as_stored_text() {
        assert_eq!(PriceMarket::Timeweighted.as_ref(), "timeweighted");
        assert_eq!(MarketType::Dayahead.to_string(), "dayahead");
        assert_eq!(ForecastType::ShortTerm.as_ref(), "short_term");
        assert_eq!(OutageType::from_str("maintenance").unwrap(), OutageType::Maintenance);
    }
}
