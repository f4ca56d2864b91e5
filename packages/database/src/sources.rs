//! `data_sources` table: the registry, as persisted.

use chrono::NaiveDateTime;
use duckdb::Connection;
use grid_ingest_database_models::DataSource;
use grid_ingest_source_models::SourceConfig;

use crate::{DbError, optional, sql_timestamp};

const UPSERT_SQL: &str = "
INSERT INTO data_sources (
    data_type, report_code, dataset_name, filename_pattern,
    direct_csv_url_template, archive_zip_url_template,
    category, update_frequency, description, created_at, updated_at
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
ON CONFLICT (report_code) DO UPDATE SET
    data_type = EXCLUDED.data_type,
    dataset_name = EXCLUDED.dataset_name,
    filename_pattern = EXCLUDED.filename_pattern,
    direct_csv_url_template = EXCLUDED.direct_csv_url_template,
    archive_zip_url_template = EXCLUDED.archive_zip_url_template,
    category = EXCLUDED.category,
    update_frequency = EXCLUDED.update_frequency,
    description = EXCLUDED.description,
    updated_at = EXCLUDED.updated_at
";

fn upsert(conn: &Connection, config: &SourceConfig, now: NaiveDateTime) -> Result<(), DbError> {
    let now = sql_timestamp(now);
    conn.execute(
        UPSERT_SQL,
        duckdb::params![
            config.data_type,
            config.report_code,
            config.dataset_name,
            config.filename_pattern,
            config.direct_url_template,
            config.archive_url_template,
            config.category,
            config.update_frequency,
            config.description,
            now,
            now,
        ],
    )?;
    Ok(())
}

/// Upserts every registry entry by report code.
///
/// # Errors
///
/// Returns [`DbError`] if any write fails; earlier rows stay written.
pub fn sync_sources<'a>(
    conn: &Connection,
    configs: impl IntoIterator<Item = &'a SourceConfig>,
    now: NaiveDateTime,
) -> Result<usize, DbError> {
    let mut synced = 0;
    for config in configs {
        upsert(conn, config, now)?;
        synced += 1;
    }

    log::info!("Synced {synced} data sources");

    Ok(synced)
}

/// Id of the source registered under `report_code`.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn source_id(conn: &Connection, report_code: &str) -> Result<Option<i64>, DbError> {
    optional(conn.query_row(
        "SELECT id FROM data_sources WHERE report_code = ?",
        duckdb::params![report_code],
        |row| row.get(0),
    ))
}

/// Returns the id for `config`, creating the row if it does not exist yet.
///
/// Existing rows are left untouched.
///
/// # Errors
///
/// Returns [`DbError`] if a query fails.
pub fn ensure_source(
    conn: &Connection,
    config: &SourceConfig,
    now: NaiveDateTime,
) -> Result<i64, DbError> {
    if let Some(id) = source_id(conn, &config.report_code)? {
        return Ok(id);
    }

    upsert(conn, config, now)?;
    log::info!("Registered data source {}", config.report_code);

    source_id(conn, &config.report_code)?.ok_or_else(|| DbError::Conversion {
        message: format!("data source {} missing after insert", config.report_code),
    })
}

/// Every stored source, ordered by report code.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list_sources(conn: &Connection) -> Result<Vec<DataSource>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, report_code, data_type, dataset_name, category, update_frequency, is_active
         FROM data_sources ORDER BY report_code",
    )?;

    let sources = stmt
        .query_map([], |row| {
            Ok(DataSource {
                id: row.get(0)?,
                report_code: row.get(1)?,
                data_type: row.get(2)?,
                dataset_name: row.get(3)?,
                category: row.get(4)?,
                update_frequency: row.get(5)?,
                is_active: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::store;

    fn config(code: &str, frequency: &str) -> SourceConfig {
        SourceConfig {
            data_type: "Load".to_string(),
            report_code: code.to_string(),
            dataset_name: "pal".to_string(),
            filename_pattern: "{YYYYMMDD}pal.csv".to_string(),
            direct_url_template: "http://mis.nyiso.com/public/csv/pal/{YYYYMMDD}pal.csv"
                .to_string(),
            archive_url_template: String::new(),
            category: Some("Load".to_string()),
            update_frequency: Some(frequency.to_string()),
            description: None,
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 13)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn resync_updates_in_place() {
        let conn = store::open_in_memory().unwrap();

        sync_sources(&conn, &[config("P-58B", "Daily")], now()).unwrap();
        let id = source_id(&conn, "P-58B").unwrap().unwrap();

        sync_sources(&conn, &[config("P-58B", "Real-time (5-minute)")], now()).unwrap();

        let sources = list_sources(&conn).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, id);
        assert_eq!(
            sources[0].update_frequency.as_deref(),
            Some("Real-time (5-minute)")
        );
        assert!(sources[0].is_active);
    }

    #[test]
    fn ensure_source_is_idempotent() {
        let conn = store::open_in_memory().unwrap();

        let first = ensure_source(&conn, &config("OPENMETEO-WEATHER", "hourly"), now()).unwrap();
        let second = ensure_source(&conn, &config("OPENMETEO-WEATHER", "daily"), now()).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            list_sources(&conn).unwrap()[0].update_frequency.as_deref(),
            Some("hourly")
        );
        assert!(source_id(&conn, "P-2A").unwrap().is_none());
    }
}
