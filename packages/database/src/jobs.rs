//! Scraping job and log repository.
//!
//! A job moves `pending → running → completed | failed`. Terminal states
//! are final: completing or failing a terminal job is a
//! [`DbError::JobState`] error.

use std::str::FromStr as _;

use chrono::{NaiveDate, NaiveDateTime};
use duckdb::Connection;
use grid_ingest_database_models::{JobStatus, LogLevel, ScrapingJob, ScrapingLog, UpsertCounts};

use crate::{DbError, optional, parse_timestamp, require_timestamp, sql_timestamp};

const JOB_COLUMNS: &str = "id, data_source_id, CAST(target_date AS VARCHAR), status, \
     rows_scraped, rows_inserted, rows_updated, error_message, \
     CAST(started_at AS VARCHAR), CAST(completed_at AS VARCHAR), CAST(created_at AS VARCHAR)";

struct JobRow {
    id: i64,
    data_source_id: i64,
    target_date: String,
    status: String,
    rows_scraped: i64,
    rows_inserted: i64,
    rows_updated: i64,
    error_message: Option<String>,
    started_at: Option<String>,
    completed_at: Option<String>,
    created_at: String,
}

impl JobRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            data_source_id: row.get(1)?,
            target_date: row.get(2)?,
            status: row.get(3)?,
            rows_scraped: row.get(4)?,
            rows_inserted: row.get(5)?,
            rows_updated: row.get(6)?,
            error_message: row.get(7)?,
            started_at: row.get(8)?,
            completed_at: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_job(self) -> Result<ScrapingJob, DbError> {
        let status = JobStatus::from_str(&self.status).map_err(|e| DbError::Conversion {
            message: format!("job {} has status {:?}: {e}", self.id, self.status),
        })?;

        Ok(ScrapingJob {
            id: self.id,
            data_source_id: self.data_source_id,
            target_date: require_timestamp(&self.target_date)?,
            status,
            rows_scraped: self.rows_scraped,
            rows_inserted: self.rows_inserted,
            rows_updated: self.rows_updated,
            error_message: self.error_message,
            started_at: self.started_at.as_deref().and_then(parse_timestamp),
            completed_at: self.completed_at.as_deref().and_then(parse_timestamp),
            created_at: require_timestamp(&self.created_at)?,
        })
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn expect_transition(job_id: i64, changed: usize, action: &str) -> Result<(), DbError> {
    if changed == 0 {
        return Err(DbError::JobState {
            job_id,
            message: format!("cannot {action}: job is missing or already finished"),
        });
    }
    Ok(())
}

// ── Jobs ─────────────────────────────────────────────────────────────

/// Inserts a `pending` job for `data_source_id` on `target_date`.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn create_job(
    conn: &Connection,
    data_source_id: i64,
    target_date: NaiveDate,
    now: NaiveDateTime,
) -> Result<ScrapingJob, DbError> {
    let id: i64 = conn.query_row(
        "INSERT INTO scraping_jobs (data_source_id, target_date, status, created_at)
         VALUES (?, CAST(? AS TIMESTAMP), ?, CAST(? AS TIMESTAMP))
         RETURNING id",
        duckdb::params![
            data_source_id,
            sql_timestamp(midnight(target_date)),
            JobStatus::Pending.as_ref(),
            sql_timestamp(now),
        ],
        |row| row.get(0),
    )?;

    get_job(conn, id)?.ok_or_else(|| DbError::JobState {
        job_id: id,
        message: "vanished after insert".to_string(),
    })
}

/// Loads one job.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row is malformed.
pub fn get_job(conn: &Connection, job_id: i64) -> Result<Option<ScrapingJob>, DbError> {
    optional(conn.query_row(
        &format!("SELECT {JOB_COLUMNS} FROM scraping_jobs WHERE id = ?"),
        duckdb::params![job_id],
        JobRow::from_row,
    ))?
    .map(JobRow::into_job)
    .transpose()
}

/// Moves a pending job to `running` and stamps `started_at`.
///
/// # Errors
///
/// Returns [`DbError::JobState`] if the job is not pending.
pub fn mark_running(conn: &Connection, job_id: i64, now: NaiveDateTime) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE scraping_jobs SET status = ?, started_at = CAST(? AS TIMESTAMP)
         WHERE id = ? AND status = ?",
        duckdb::params![
            JobStatus::Running.as_ref(),
            sql_timestamp(now),
            job_id,
            JobStatus::Pending.as_ref(),
        ],
    )?;
    expect_transition(job_id, changed, "start")
}

/// Records how many data lines were downloaded.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub fn set_rows_scraped(conn: &Connection, job_id: i64, rows: i64) -> Result<(), DbError> {
    conn.execute(
        "UPDATE scraping_jobs SET rows_scraped = ? WHERE id = ?",
        duckdb::params![rows, job_id],
    )?;
    Ok(())
}

/// Marks a job completed with its write counts.
///
/// # Errors
///
/// Returns [`DbError::JobState`] if the job is already terminal.
pub fn mark_completed(
    conn: &Connection,
    job_id: i64,
    counts: UpsertCounts,
    now: NaiveDateTime,
) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE scraping_jobs
         SET status = ?, rows_inserted = ?, rows_updated = ?, completed_at = CAST(? AS TIMESTAMP)
         WHERE id = ? AND status NOT IN (?, ?)",
        duckdb::params![
            JobStatus::Completed.as_ref(),
            i64::try_from(counts.inserted).unwrap_or(i64::MAX),
            i64::try_from(counts.updated).unwrap_or(i64::MAX),
            sql_timestamp(now),
            job_id,
            JobStatus::Completed.as_ref(),
            JobStatus::Failed.as_ref(),
        ],
    )?;
    expect_transition(job_id, changed, "complete")
}

/// Marks a job failed. Row counts keep whatever values they had.
///
/// # Errors
///
/// Returns [`DbError::JobState`] if the job is already terminal.
pub fn mark_failed(
    conn: &Connection,
    job_id: i64,
    error_message: &str,
    now: NaiveDateTime,
) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE scraping_jobs
         SET status = ?, error_message = ?, completed_at = CAST(? AS TIMESTAMP)
         WHERE id = ? AND status NOT IN (?, ?)",
        duckdb::params![
            JobStatus::Failed.as_ref(),
            error_message,
            sql_timestamp(now),
            job_id,
            JobStatus::Completed.as_ref(),
            JobStatus::Failed.as_ref(),
        ],
    )?;
    expect_transition(job_id, changed, "fail")
}

/// Most recently completed job for the source and day, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn find_completed_job(
    conn: &Connection,
    data_source_id: i64,
    target_date: NaiveDate,
) -> Result<Option<ScrapingJob>, DbError> {
    optional(conn.query_row(
        &format!(
            "SELECT {JOB_COLUMNS} FROM scraping_jobs
             WHERE data_source_id = ? AND target_date = CAST(? AS TIMESTAMP) AND status = ?
             ORDER BY completed_at DESC, id DESC
             LIMIT 1"
        ),
        duckdb::params![
            data_source_id,
            sql_timestamp(midnight(target_date)),
            JobStatus::Completed.as_ref(),
        ],
        JobRow::from_row,
    ))?
    .map(JobRow::into_job)
    .transpose()
}

// ── Logs ─────────────────────────────────────────────────────────────

/// Appends a log line to a job.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn append_log(
    conn: &Connection,
    job_id: i64,
    level: LogLevel,
    message: &str,
    now: NaiveDateTime,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO scraping_logs (job_id, log_level, message, created_at)
         VALUES (?, ?, ?, CAST(? AS TIMESTAMP))",
        duckdb::params![job_id, level.as_ref(), message, sql_timestamp(now)],
    )?;
    Ok(())
}

/// A job's log lines in insertion order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row is malformed.
pub fn logs_for_job(conn: &Connection, job_id: i64) -> Result<Vec<ScrapingLog>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, job_id, log_level, message, CAST(created_at AS VARCHAR)
         FROM scraping_logs WHERE job_id = ? ORDER BY id",
    )?;

    let rows = stmt.query_map(duckdb::params![job_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut logs = Vec::new();
    for row in rows {
        let (id, job_id, level, message, created_at) = row?;
        let level = LogLevel::from_str(&level).map_err(|e| DbError::Conversion {
            message: format!("log {id} has level {level:?}: {e}"),
        })?;
        logs.push(ScrapingLog {
            id,
            job_id,
            level,
            message,
            created_at: require_timestamp(&created_at)?,
        });
    }

    Ok(logs)
}
