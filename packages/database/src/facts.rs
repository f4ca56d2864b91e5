//! Natural-key fact writers.
//!
//! Each [`FactWriter`] stores one [`CanonicalRecord`] shape. A row is
//! looked up by its natural key; a hit updates only the value columns, a
//! miss inserts. Zone and interface names are resolved through
//! [`crate::reference`] first.

use chrono::NaiveDateTime;
use duckdb::Connection;
use duckdb::types::Value;
use grid_ingest_transform_models::{CanonicalRecord, PriceMarket, RecordFamily};

use crate::reference::{get_or_create_interface, get_or_create_zone};
use crate::{DbError, optional, parse_timestamp, sql_timestamp};

/// What a single upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    /// The record had no usable entity name and was not stored.
    Skipped,
}

/// Stores one canonical record shape.
pub trait FactWriter: Send + Sync {
    /// Short name used in logs and mismatch errors.
    fn name(&self) -> &'static str;

    /// Inserts or updates `record` by its natural key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::RecordMismatch`] if `record` is not the shape this
    /// writer stores, or [`DbError::DuckDb`] if a query fails.
    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError>;
}

// ── Row plumbing ─────────────────────────────────────────────────────

#[derive(Clone)]
enum SqlValue {
    Text(Option<String>),
    Real(Option<f64>),
    Int(Option<i64>),
    Timestamp(Option<NaiveDateTime>),
}

impl SqlValue {
    fn text(value: &str) -> Self {
        Self::Text(Some(value.to_string()))
    }

    fn opt_text(value: Option<&String>) -> Self {
        Self::Text(value.cloned())
    }

    const fn placeholder(&self) -> &'static str {
        match self {
            Self::Timestamp(_) => "CAST(? AS TIMESTAMP)",
            Self::Text(_) | Self::Real(_) | Self::Int(_) => "?",
        }
    }

    fn into_value(self) -> Value {
        match self {
            Self::Text(Some(s)) => Value::Text(s),
            Self::Real(Some(f)) => Value::Double(f),
            Self::Int(Some(i)) => Value::BigInt(i),
            Self::Timestamp(Some(ts)) => Value::Text(sql_timestamp(ts)),
            Self::Text(None) | Self::Real(None) | Self::Int(None) | Self::Timestamp(None) => {
                Value::Null
            }
        }
    }
}

struct FactRow {
    table: &'static str,
    key: Vec<(&'static str, SqlValue)>,
    values: Vec<(&'static str, SqlValue)>,
}

impl FactRow {
    fn new(table: &'static str, timestamp: NaiveDateTime) -> Self {
        Self {
            table,
            key: vec![("timestamp", SqlValue::Timestamp(Some(timestamp)))],
            values: Vec::new(),
        }
    }

    fn key(mut self, column: &'static str, value: SqlValue) -> Self {
        self.key.push((column, value));
        self
    }

    fn value(mut self, column: &'static str, value: SqlValue) -> Self {
        self.values.push((column, value));
        self
    }

    fn upsert(self, conn: &Connection, now: NaiveDateTime) -> Result<Upsert, DbError> {
        let predicate = self
            .key
            .iter()
            .map(|(column, value)| format!("{column} = {}", value.placeholder()))
            .collect::<Vec<_>>()
            .join(" AND ");

        let existing: Option<i64> = optional(conn.query_row(
            &format!("SELECT id FROM {} WHERE {predicate}", self.table),
            duckdb::params_from_iter(self.key.iter().map(|(_, v)| v.clone().into_value())),
            |row| row.get(0),
        ))?;

        if let Some(id) = existing {
            if self.values.is_empty() {
                return Ok(Upsert::Updated);
            }

            let assignments = self
                .values
                .iter()
                .map(|(column, value)| format!("{column} = {}", value.placeholder()))
                .collect::<Vec<_>>()
                .join(", ");

            let mut params: Vec<Value> =
                self.values.into_iter().map(|(_, v)| v.into_value()).collect();
            params.push(Value::BigInt(id));

            conn.execute(
                &format!("UPDATE {} SET {assignments} WHERE id = ?", self.table),
                duckdb::params_from_iter(params),
            )?;

            return Ok(Upsert::Updated);
        }

        let mut columns = Vec::with_capacity(self.key.len() + self.values.len() + 1);
        let mut placeholders = Vec::with_capacity(columns.capacity());
        let mut params = Vec::with_capacity(columns.capacity());

        for (column, value) in self.key.into_iter().chain(self.values) {
            columns.push(column);
            placeholders.push(value.placeholder());
            params.push(value.into_value());
        }
        columns.push("created_at");
        placeholders.push("CAST(? AS TIMESTAMP)");
        params.push(Value::Text(sql_timestamp(now)));

        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                placeholders.join(", "),
            ),
            duckdb::params_from_iter(params),
        )?;

        Ok(Upsert::Inserted)
    }
}

const fn mismatch(writer: &'static str, record: &CanonicalRecord) -> DbError {
    DbError::RecordMismatch {
        writer,
        record: record.kind(),
    }
}

fn blank(name: &str) -> bool {
    name.trim().is_empty()
}

// ── Writers ──────────────────────────────────────────────────────────

/// Zonal LBMP rows for one market.
#[derive(Debug, Clone, Copy)]
pub struct ZonalPriceWriter {
    market: PriceMarket,
}

impl ZonalPriceWriter {
    #[must_use]
    pub const fn new(market: PriceMarket) -> Self {
        Self { market }
    }

    const fn table(self) -> &'static str {
        match self.market {
            PriceMarket::Realtime => "realtime_lbmp",
            PriceMarket::Dayahead => "dayahead_lbmp",
            PriceMarket::Timeweighted => "timeweighted_lbmp",
        }
    }
}

impl FactWriter for ZonalPriceWriter {
    fn name(&self) -> &'static str {
        self.table()
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::ZonalPrice(r) = record else {
            return Err(mismatch(self.name(), record));
        };
        if r.market != self.market {
            return Err(mismatch(self.name(), record));
        }
        if blank(&r.zone_name) {
            return Ok(Upsert::Skipped);
        }

        let zone = get_or_create_zone(conn, &r.zone_name, r.ptid, now)?;

        FactRow::new(self.table(), r.timestamp)
            .key("zone_id", SqlValue::Int(Some(zone.id)))
            .value("lbmp", SqlValue::Real(r.lbmp))
            .value("marginal_cost_losses", SqlValue::Real(r.marginal_cost_losses))
            .value(
                "marginal_cost_congestion",
                SqlValue::Real(r.marginal_cost_congestion),
            )
            .upsert(conn, now)
    }
}

/// Actual zonal load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadWriter;

impl FactWriter for LoadWriter {
    fn name(&self) -> &'static str {
        "realtime_load"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::Load(r) = record else {
            return Err(mismatch(self.name(), record));
        };
        if blank(&r.zone_name) {
            return Ok(Upsert::Skipped);
        }

        let zone = get_or_create_zone(conn, &r.zone_name, r.ptid, now)?;

        FactRow::new(self.name(), r.timestamp)
            .key("zone_id", SqlValue::Int(Some(zone.id)))
            .value("load", SqlValue::Real(r.load))
            .value("time_zone", SqlValue::opt_text(r.time_zone.as_ref()))
            .upsert(conn, now)
    }
}

/// Zonal load forecasts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadForecastWriter;

impl FactWriter for LoadForecastWriter {
    fn name(&self) -> &'static str {
        "load_forecast"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::LoadForecast(r) = record else {
            return Err(mismatch(self.name(), record));
        };
        if blank(&r.zone_name) {
            return Ok(Upsert::Skipped);
        }

        let zone = get_or_create_zone(conn, &r.zone_name, None, now)?;

        FactRow::new(self.name(), r.timestamp)
            .key("zone_id", SqlValue::Int(Some(zone.id)))
            .value("forecast_load", SqlValue::Real(r.forecast_load))
            .upsert(conn, now)
    }
}

/// Interface flows and limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceFlowWriter;

impl FactWriter for InterfaceFlowWriter {
    fn name(&self) -> &'static str {
        "interface_flows"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::InterfaceFlow(r) = record else {
            return Err(mismatch(self.name(), record));
        };
        if blank(&r.interface_name) {
            return Ok(Upsert::Skipped);
        }

        let interface = get_or_create_interface(conn, &r.interface_name, r.point_id, now)?;

        FactRow::new(self.name(), r.timestamp)
            .key("interface_id", SqlValue::Int(Some(interface.id)))
            .value("flow_mwh", SqlValue::Real(r.flow_mwh))
            .value("positive_limit_mwh", SqlValue::Real(r.positive_limit_mwh))
            .value("negative_limit_mwh", SqlValue::Real(r.negative_limit_mwh))
            .upsert(conn, now)
    }
}

/// Ancillary service prices, one row per service.
#[derive(Debug, Clone, Copy, Default)]
pub struct AncillaryWriter;

impl FactWriter for AncillaryWriter {
    fn name(&self) -> &'static str {
        "ancillary_services"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::Ancillary(r) = record else {
            return Err(mismatch(self.name(), record));
        };
        if blank(&r.zone_name) {
            return Ok(Upsert::Skipped);
        }

        let zone = get_or_create_zone(conn, &r.zone_name, None, now)?;

        FactRow::new(self.name(), r.timestamp)
            .key("zone_id", SqlValue::Int(Some(zone.id)))
            .key("market_type", SqlValue::text(r.market_type.as_ref()))
            .key("service_type", SqlValue::text(&r.service_type))
            .value("price", SqlValue::Real(Some(r.price)))
            .upsert(conn, now)
    }
}

/// Market advisories and notices.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryWriter;

impl FactWriter for AdvisoryWriter {
    fn name(&self) -> &'static str {
        "market_advisories"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::Advisory(r) = record else {
            return Err(mismatch(self.name(), record));
        };

        FactRow::new(self.name(), r.timestamp)
            .key("title", SqlValue::text(&r.title))
            .value("advisory_type", SqlValue::opt_text(r.advisory_type.as_ref()))
            .value("message", SqlValue::opt_text(r.message.as_ref()))
            .value("severity", SqlValue::opt_text(r.severity.as_ref()))
            .upsert(conn, now)
    }
}

/// Transmission constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintWriter;

impl FactWriter for ConstraintWriter {
    fn name(&self) -> &'static str {
        "constraints"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::Constraint(r) = record else {
            return Err(mismatch(self.name(), record));
        };

        FactRow::new(self.name(), r.timestamp)
            .key("constraint_name", SqlValue::text(&r.constraint_name))
            .key("market_type", SqlValue::text(r.market_type.as_ref()))
            .value("shadow_price", SqlValue::Real(r.shadow_price))
            .value("binding_status", SqlValue::opt_text(r.binding_status.as_ref()))
            .value("limit_mw", SqlValue::Real(r.limit_mw))
            .value("flow_mw", SqlValue::Real(r.flow_mw))
            .upsert(conn, now)
    }
}

/// Neighbouring-RTO proxy bus prices.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalRtoWriter;

impl FactWriter for ExternalRtoWriter {
    fn name(&self) -> &'static str {
        "external_rto_prices"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::ExternalRto(r) = record else {
            return Err(mismatch(self.name(), record));
        };

        FactRow::new(self.name(), r.timestamp)
            .key("rto_name", SqlValue::text(&r.rto_name))
            .value("rtc_price", SqlValue::Real(r.rtc_price))
            .value("cts_price", SqlValue::Real(r.cts_price))
            .value("price_difference", SqlValue::Real(r.price_difference))
            .upsert(conn, now)
    }
}

/// Available and total transfer capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtcTtcWriter;

impl FactWriter for AtcTtcWriter {
    fn name(&self) -> &'static str {
        "atc_ttc"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::AtcTtc(r) = record else {
            return Err(mismatch(self.name(), record));
        };
        if blank(&r.interface_name) {
            return Ok(Upsert::Skipped);
        }

        let interface = get_or_create_interface(conn, &r.interface_name, None, now)?;

        FactRow::new(self.name(), r.timestamp)
            .key("interface_id", SqlValue::Int(Some(interface.id)))
            .key("forecast_type", SqlValue::text(r.forecast_type.as_ref()))
            .key("direction", SqlValue::text(&r.direction))
            .value("atc_mw", SqlValue::Real(r.atc_mw))
            .value("ttc_mw", SqlValue::Real(r.ttc_mw))
            .value("trm_mw", SqlValue::Real(r.trm_mw))
            .upsert(conn, now)
    }
}

/// Scheduled, actual, and maintenance outages.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutageWriter;

impl FactWriter for OutageWriter {
    fn name(&self) -> &'static str {
        "outages"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::Outage(r) = record else {
            return Err(mismatch(self.name(), record));
        };

        FactRow::new(self.name(), r.timestamp)
            .key("resource_name", SqlValue::text(&r.resource_name))
            .key("outage_type", SqlValue::text(r.outage_type.as_ref()))
            .value(
                "market_type",
                SqlValue::Text(r.market_type.map(|m| m.to_string())),
            )
            .value("resource_type", SqlValue::opt_text(r.resource_type.as_ref()))
            .value("mw_capacity", SqlValue::Real(r.mw_capacity))
            .value("mw_outage", SqlValue::Real(r.mw_outage))
            .value("start_time", SqlValue::Timestamp(r.start_time))
            .value("end_time", SqlValue::Timestamp(r.end_time))
            .value("status", SqlValue::opt_text(r.status.as_ref()))
            .upsert(conn, now)
    }
}

/// Weather observations and forecasts from either source.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherWriter;

impl FactWriter for WeatherWriter {
    fn name(&self) -> &'static str {
        "weather_forecast"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::Weather(r) = record else {
            return Err(mismatch(self.name(), record));
        };

        FactRow::new(self.name(), r.timestamp)
            .key("forecast_time", SqlValue::Timestamp(Some(r.forecast_time)))
            .key("location", SqlValue::text(&r.location))
            .key("vintage", SqlValue::text(&r.vintage))
            .key("data_source", SqlValue::text(&r.data_source))
            .value("temperature_f", SqlValue::Real(r.temperature_f))
            .value("humidity_percent", SqlValue::Real(r.humidity_percent))
            .value("wind_speed_mph", SqlValue::Real(r.wind_speed_mph))
            .value("wind_direction", SqlValue::text(&r.wind_direction))
            .value("cloud_cover_percent", SqlValue::Real(r.cloud_cover_percent))
            .value("zone_name", SqlValue::opt_text(r.zone_name.as_ref()))
            .value("irradiance_w_m2", SqlValue::Real(r.irradiance_w_m2))
            .upsert(conn, now)
    }
}

/// Generation by fuel type.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuelMixWriter;

impl FactWriter for FuelMixWriter {
    fn name(&self) -> &'static str {
        "fuel_mix"
    }

    fn upsert_one(
        &self,
        conn: &Connection,
        record: &CanonicalRecord,
        now: NaiveDateTime,
    ) -> Result<Upsert, DbError> {
        let CanonicalRecord::FuelMix(r) = record else {
            return Err(mismatch(self.name(), record));
        };

        FactRow::new(self.name(), r.timestamp)
            .key("fuel_type", SqlValue::text(&r.fuel_type))
            .value("generation_mw", SqlValue::Real(Some(r.generation_mw)))
            .value("percentage", SqlValue::Real(r.percentage))
            .upsert(conn, now)
    }
}

/// Writer for records of `family`. Generic records have no table.
#[must_use]
pub fn writer_for(family: RecordFamily) -> Option<Box<dyn FactWriter>> {
    let writer: Box<dyn FactWriter> = match family {
        RecordFamily::ZonalPrice(market) => Box::new(ZonalPriceWriter::new(market)),
        RecordFamily::Load => Box::new(LoadWriter),
        RecordFamily::LoadForecast => Box::new(LoadForecastWriter),
        RecordFamily::InterfaceFlow => Box::new(InterfaceFlowWriter),
        RecordFamily::Ancillary => Box::new(AncillaryWriter),
        RecordFamily::Advisory => Box::new(AdvisoryWriter),
        RecordFamily::Constraint => Box::new(ConstraintWriter),
        RecordFamily::ExternalRto => Box::new(ExternalRtoWriter),
        RecordFamily::AtcTtc => Box::new(AtcTtcWriter),
        RecordFamily::Outage => Box::new(OutageWriter),
        RecordFamily::Weather => Box::new(WeatherWriter),
        RecordFamily::FuelMix => Box::new(FuelMixWriter),
        RecordFamily::Generic => return None,
    };
    Some(writer)
}

/// Most recent `created_at` among weather rows from `data_source`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn latest_weather_write(
    conn: &Connection,
    data_source: &str,
) -> Result<Option<NaiveDateTime>, DbError> {
    let latest: Option<String> = conn.query_row(
        "SELECT CAST(MAX(created_at) AS VARCHAR) FROM weather_forecast WHERE data_source = ?",
        duckdb::params![data_source],
        |row| row.get(0),
    )?;

    Ok(latest.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use grid_ingest_transform_models::{Ancillary, MarketType, Weather, ZonalPrice};

    use super::*;
    use crate::store;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 13)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn every_stored_family_has_a_writer() {
        let families = [
            RecordFamily::ZonalPrice(PriceMarket::Realtime),
            RecordFamily::ZonalPrice(PriceMarket::Dayahead),
            RecordFamily::ZonalPrice(PriceMarket::Timeweighted),
            RecordFamily::Load,
            RecordFamily::LoadForecast,
            RecordFamily::InterfaceFlow,
            RecordFamily::Ancillary,
            RecordFamily::Advisory,
            RecordFamily::Constraint,
            RecordFamily::ExternalRto,
            RecordFamily::AtcTtc,
            RecordFamily::Outage,
            RecordFamily::Weather,
            RecordFamily::FuelMix,
        ];
        let names: Vec<&str> = families
            .into_iter()
            .map(|family| writer_for(family).unwrap().name())
            .collect();

        assert_eq!(names[0], "realtime_lbmp");
        assert_eq!(names[2], "timeweighted_lbmp");
        for name in &names {
            assert!(store::FACT_TABLES.contains(name), "{name}");
        }
        assert!(writer_for(RecordFamily::Generic).is_none());
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    fn price(zone: &str, lbmp: f64) -> CanonicalRecord {
        CanonicalRecord::ZonalPrice(ZonalPrice {
            timestamp: at(0, 5),
            market: PriceMarket::Realtime,
            zone_name: zone.to_string(),
            ptid: Some(61757),
            lbmp: Some(lbmp),
            marginal_cost_losses: None,
            marginal_cost_congestion: None,
        })
    }

    fn reserve(market_type: MarketType, price: f64) -> CanonicalRecord {
        CanonicalRecord::Ancillary(Ancillary {
            timestamp: at(1, 0),
            zone_name: "WEST".to_string(),
            market_type,
            service_type: "10_min_spinning_reserve".to_string(),
            price,
        })
    }

    #[test]
    fn second_write_updates_values_in_place() {
        let conn = store::open_in_memory().unwrap();
        let writer = ZonalPriceWriter::new(PriceMarket::Realtime);

        assert_eq!(
            writer.upsert_one(&conn, &price("CAPITL", 10.0), at(12, 0)).unwrap(),
            Upsert::Inserted
        );
        assert_eq!(
            writer.upsert_one(&conn, &price("capitl", 12.5), at(12, 5)).unwrap(),
            Upsert::Updated
        );

        assert_eq!(count(&conn, "realtime_lbmp"), 1);
        let lbmp: f64 = conn
            .query_row("SELECT lbmp FROM realtime_lbmp", [], |row| row.get(0))
            .unwrap();
        assert!((lbmp - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn market_type_is_part_of_the_key() {
        let conn = store::open_in_memory().unwrap();

        AncillaryWriter
            .upsert_one(&conn, &reserve(MarketType::Realtime, 4.0), at(12, 0))
            .unwrap();
        AncillaryWriter
            .upsert_one(&conn, &reserve(MarketType::Dayahead, 4.0), at(12, 0))
            .unwrap();
        AncillaryWriter
            .upsert_one(&conn, &reserve(MarketType::Dayahead, 6.0), at(12, 0))
            .unwrap();

        assert_eq!(count(&conn, "ancillary_services"), 2);
        let dam: f64 = conn
            .query_row(
                "SELECT price FROM ancillary_services WHERE market_type = 'dayahead'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!((dam - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_zone_is_skipped() {
        let conn = store::open_in_memory().unwrap();
        let writer = ZonalPriceWriter::new(PriceMarket::Realtime);

        assert_eq!(
            writer.upsert_one(&conn, &price("  ", 1.0), at(12, 0)).unwrap(),
            Upsert::Skipped
        );
        assert_eq!(count(&conn, "realtime_lbmp"), 0);
        assert_eq!(count(&conn, "zones"), 0);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let conn = store::open_in_memory().unwrap();

        let err = LoadWriter
            .upsert_one(&conn, &price("WEST", 1.0), at(12, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::RecordMismatch {
                writer: "realtime_load",
                record: "zonal_price"
            }
        ));

        let err = ZonalPriceWriter::new(PriceMarket::Dayahead)
            .upsert_one(&conn, &price("WEST", 1.0), at(12, 0))
            .unwrap_err();
        assert!(matches!(err, DbError::RecordMismatch { .. }));
    }

    #[test]
    fn tracks_latest_weather_write_per_source() {
        let conn = store::open_in_memory().unwrap();
        let sample = |location: &str, source: &str| {
            CanonicalRecord::Weather(Weather {
                timestamp: at(14, 0),
                forecast_time: at(13, 30),
                location: location.to_string(),
                vintage: "Actual".to_string(),
                temperature_f: Some(50.0),
                humidity_percent: None,
                wind_speed_mph: None,
                wind_direction: String::new(),
                cloud_cover_percent: None,
                zone_name: Some("N.Y.C.".to_string()),
                irradiance_w_m2: Some(120.0),
                data_source: source.to_string(),
            })
        };

        assert_eq!(latest_weather_write(&conn, "OpenMeteo").unwrap(), None);

        WeatherWriter
            .upsert_one(&conn, &sample("Central Park", "OpenMeteo"), at(13, 30))
            .unwrap();
        WeatherWriter
            .upsert_one(&conn, &sample("JFK Airport", "OpenMeteo"), at(13, 45))
            .unwrap();
        WeatherWriter
            .upsert_one(&conn, &sample("Central Park", "NYISO"), at(15, 0))
            .unwrap();

        assert_eq!(count(&conn, "weather_forecast"), 3);
        assert_eq!(
            latest_weather_write(&conn, "OpenMeteo").unwrap(),
            Some(at(13, 45))
        );
    }
}
