//! Connection opening and schema creation.
//!
//! The schema is created idempotently on every open, so a fresh file and an
//! existing one go through the same path.

use std::path::Path;

use duckdb::Connection;

use crate::{DbError, paths};

/// Fact tables, each with a descending timestamp index.
pub const FACT_TABLES: &[&str] = &[
    "realtime_lbmp",
    "dayahead_lbmp",
    "timeweighted_lbmp",
    "realtime_load",
    "load_forecast",
    "interface_flows",
    "ancillary_services",
    "market_advisories",
    "constraints",
    "external_rto_prices",
    "atc_ttc",
    "outages",
    "weather_forecast",
    "fuel_mix",
];

/// Opens (or creates) the ingestion database at `path`.
///
/// # Errors
///
/// Returns [`DbError`] if the parent directory cannot be created, the
/// database cannot be opened, or schema creation fails.
pub fn open(path: &Path) -> Result<Connection, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(path)?;
    create_schema(&conn)?;

    log::info!("Opened ingestion database at {}", path.display());

    Ok(conn)
}

/// Opens a schema-initialized in-memory database.
///
/// # Errors
///
/// Returns [`DbError`] if schema creation fails.
pub fn open_in_memory() -> Result<Connection, DbError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Creates every sequence, table, and index if it does not already exist.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;

    for table in FACT_TABLES {
        conn.execute_batch(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_timestamp ON {table} (timestamp DESC);"
        ))?;
    }

    Ok(())
}

const SCHEMA: &str = "
-- ── Reference ────────────────────────────────────────────────────────

CREATE SEQUENCE IF NOT EXISTS data_sources_seq;
CREATE TABLE IF NOT EXISTS data_sources (
    id BIGINT PRIMARY KEY DEFAULT nextval('data_sources_seq'),
    data_type VARCHAR NOT NULL,
    report_code VARCHAR NOT NULL UNIQUE,
    dataset_name VARCHAR NOT NULL,
    filename_pattern VARCHAR NOT NULL,
    direct_csv_url_template VARCHAR NOT NULL,
    archive_zip_url_template VARCHAR NOT NULL DEFAULT '',
    category VARCHAR,
    update_frequency VARCHAR,
    description VARCHAR,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMP NOT NULL,
    updated_at TIMESTAMP NOT NULL
);

CREATE SEQUENCE IF NOT EXISTS zones_seq;
CREATE TABLE IF NOT EXISTS zones (
    id BIGINT PRIMARY KEY DEFAULT nextval('zones_seq'),
    name VARCHAR NOT NULL UNIQUE,
    ptid BIGINT,
    display_name VARCHAR,
    created_at TIMESTAMP NOT NULL
);

CREATE SEQUENCE IF NOT EXISTS interfaces_seq;
CREATE TABLE IF NOT EXISTS interfaces (
    id BIGINT PRIMARY KEY DEFAULT nextval('interfaces_seq'),
    name VARCHAR NOT NULL UNIQUE,
    point_id BIGINT,
    description VARCHAR,
    created_at TIMESTAMP NOT NULL
);

-- ── Pricing ──────────────────────────────────────────────────────────

CREATE SEQUENCE IF NOT EXISTS realtime_lbmp_seq;
CREATE TABLE IF NOT EXISTS realtime_lbmp (
    id BIGINT PRIMARY KEY DEFAULT nextval('realtime_lbmp_seq'),
    timestamp TIMESTAMP NOT NULL,
    zone_id BIGINT NOT NULL,
    lbmp DOUBLE,
    marginal_cost_losses DOUBLE,
    marginal_cost_congestion DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, zone_id)
);

CREATE SEQUENCE IF NOT EXISTS dayahead_lbmp_seq;
CREATE TABLE IF NOT EXISTS dayahead_lbmp (
    id BIGINT PRIMARY KEY DEFAULT nextval('dayahead_lbmp_seq'),
    timestamp TIMESTAMP NOT NULL,
    zone_id BIGINT NOT NULL,
    lbmp DOUBLE,
    marginal_cost_losses DOUBLE,
    marginal_cost_congestion DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, zone_id)
);

CREATE SEQUENCE IF NOT EXISTS timeweighted_lbmp_seq;
CREATE TABLE IF NOT EXISTS timeweighted_lbmp (
    id BIGINT PRIMARY KEY DEFAULT nextval('timeweighted_lbmp_seq'),
    timestamp TIMESTAMP NOT NULL,
    zone_id BIGINT NOT NULL,
    lbmp DOUBLE,
    marginal_cost_losses DOUBLE,
    marginal_cost_congestion DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, zone_id)
);

CREATE SEQUENCE IF NOT EXISTS ancillary_services_seq;
CREATE TABLE IF NOT EXISTS ancillary_services (
    id BIGINT PRIMARY KEY DEFAULT nextval('ancillary_services_seq'),
    timestamp TIMESTAMP NOT NULL,
    zone_id BIGINT NOT NULL,
    market_type VARCHAR NOT NULL DEFAULT '',
    service_type VARCHAR NOT NULL DEFAULT '',
    price DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, zone_id, market_type, service_type)
);

CREATE SEQUENCE IF NOT EXISTS external_rto_prices_seq;
CREATE TABLE IF NOT EXISTS external_rto_prices (
    id BIGINT PRIMARY KEY DEFAULT nextval('external_rto_prices_seq'),
    timestamp TIMESTAMP NOT NULL,
    rto_name VARCHAR NOT NULL DEFAULT '',
    rtc_price DOUBLE,
    cts_price DOUBLE,
    price_difference DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, rto_name)
);

-- ── Load ─────────────────────────────────────────────────────────────

CREATE SEQUENCE IF NOT EXISTS realtime_load_seq;
CREATE TABLE IF NOT EXISTS realtime_load (
    id BIGINT PRIMARY KEY DEFAULT nextval('realtime_load_seq'),
    timestamp TIMESTAMP NOT NULL,
    zone_id BIGINT NOT NULL,
    load DOUBLE,
    time_zone VARCHAR,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, zone_id)
);

CREATE SEQUENCE IF NOT EXISTS load_forecast_seq;
CREATE TABLE IF NOT EXISTS load_forecast (
    id BIGINT PRIMARY KEY DEFAULT nextval('load_forecast_seq'),
    timestamp TIMESTAMP NOT NULL,
    zone_id BIGINT NOT NULL,
    forecast_load DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, zone_id)
);

-- ── Transmission ─────────────────────────────────────────────────────

CREATE SEQUENCE IF NOT EXISTS interface_flows_seq;
CREATE TABLE IF NOT EXISTS interface_flows (
    id BIGINT PRIMARY KEY DEFAULT nextval('interface_flows_seq'),
    timestamp TIMESTAMP NOT NULL,
    interface_id BIGINT NOT NULL,
    flow_mwh DOUBLE,
    positive_limit_mwh DOUBLE,
    negative_limit_mwh DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, interface_id)
);

CREATE SEQUENCE IF NOT EXISTS constraints_seq;
CREATE TABLE IF NOT EXISTS constraints (
    id BIGINT PRIMARY KEY DEFAULT nextval('constraints_seq'),
    timestamp TIMESTAMP NOT NULL,
    constraint_name VARCHAR NOT NULL DEFAULT '',
    market_type VARCHAR NOT NULL DEFAULT '',
    shadow_price DOUBLE,
    binding_status VARCHAR,
    limit_mw DOUBLE,
    flow_mw DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, constraint_name, market_type)
);

CREATE SEQUENCE IF NOT EXISTS atc_ttc_seq;
CREATE TABLE IF NOT EXISTS atc_ttc (
    id BIGINT PRIMARY KEY DEFAULT nextval('atc_ttc_seq'),
    timestamp TIMESTAMP NOT NULL,
    interface_id BIGINT NOT NULL,
    forecast_type VARCHAR NOT NULL DEFAULT '',
    atc_mw DOUBLE,
    ttc_mw DOUBLE,
    trm_mw DOUBLE,
    direction VARCHAR NOT NULL DEFAULT '',
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, interface_id, forecast_type, direction)
);

-- ── Operations ───────────────────────────────────────────────────────

CREATE SEQUENCE IF NOT EXISTS market_advisories_seq;
CREATE TABLE IF NOT EXISTS market_advisories (
    id BIGINT PRIMARY KEY DEFAULT nextval('market_advisories_seq'),
    timestamp TIMESTAMP NOT NULL,
    advisory_type VARCHAR,
    title VARCHAR NOT NULL DEFAULT '',
    message VARCHAR,
    severity VARCHAR,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, title)
);

CREATE SEQUENCE IF NOT EXISTS outages_seq;
CREATE TABLE IF NOT EXISTS outages (
    id BIGINT PRIMARY KEY DEFAULT nextval('outages_seq'),
    timestamp TIMESTAMP NOT NULL,
    outage_type VARCHAR NOT NULL DEFAULT '',
    market_type VARCHAR,
    resource_name VARCHAR NOT NULL DEFAULT '',
    resource_type VARCHAR,
    mw_capacity DOUBLE,
    mw_outage DOUBLE,
    start_time TIMESTAMP,
    end_time TIMESTAMP,
    status VARCHAR,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, resource_name, outage_type)
);

CREATE SEQUENCE IF NOT EXISTS weather_forecast_seq;
CREATE TABLE IF NOT EXISTS weather_forecast (
    id BIGINT PRIMARY KEY DEFAULT nextval('weather_forecast_seq'),
    timestamp TIMESTAMP NOT NULL,
    forecast_time TIMESTAMP NOT NULL,
    location VARCHAR NOT NULL DEFAULT '',
    vintage VARCHAR NOT NULL DEFAULT '',
    temperature_f DOUBLE,
    humidity_percent DOUBLE,
    wind_speed_mph DOUBLE,
    wind_direction VARCHAR,
    cloud_cover_percent DOUBLE,
    zone_name VARCHAR,
    irradiance_w_m2 DOUBLE,
    data_source VARCHAR NOT NULL DEFAULT 'NYISO',
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, forecast_time, location, vintage, data_source)
);

CREATE SEQUENCE IF NOT EXISTS fuel_mix_seq;
CREATE TABLE IF NOT EXISTS fuel_mix (
    id BIGINT PRIMARY KEY DEFAULT nextval('fuel_mix_seq'),
    timestamp TIMESTAMP NOT NULL,
    fuel_type VARCHAR NOT NULL DEFAULT '',
    generation_mw DOUBLE,
    percentage DOUBLE,
    created_at TIMESTAMP NOT NULL,
    UNIQUE (timestamp, fuel_type)
);

-- ── Jobs ─────────────────────────────────────────────────────────────

CREATE SEQUENCE IF NOT EXISTS scraping_jobs_seq;
CREATE TABLE IF NOT EXISTS scraping_jobs (
    id BIGINT PRIMARY KEY DEFAULT nextval('scraping_jobs_seq'),
    data_source_id BIGINT NOT NULL,
    target_date TIMESTAMP NOT NULL,
    status VARCHAR NOT NULL,
    rows_scraped BIGINT NOT NULL DEFAULT 0,
    rows_inserted BIGINT NOT NULL DEFAULT 0,
    rows_updated BIGINT NOT NULL DEFAULT 0,
    error_message VARCHAR,
    started_at TIMESTAMP,
    completed_at TIMESTAMP,
    created_at TIMESTAMP NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scraping_jobs_source_date
    ON scraping_jobs (data_source_id, target_date);

CREATE SEQUENCE IF NOT EXISTS scraping_logs_seq;
CREATE TABLE IF NOT EXISTS scraping_logs (
    id BIGINT PRIMARY KEY DEFAULT nextval('scraping_logs_seq'),
    job_id BIGINT NOT NULL,
    log_level VARCHAR NOT NULL,
    message VARCHAR NOT NULL,
    created_at TIMESTAMP NOT NULL
);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        for table in FACT_TABLES {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table}");
        }
    }

    #[test]
    fn opens_file_in_new_directory() {
        let dir = std::env::temp_dir().join(format!("grid_ingest_store_{}", std::process::id()));
        let path = dir.join("nested").join("test.duckdb");

        drop(open(&path).unwrap());
        assert!(path.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
