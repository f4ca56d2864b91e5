//! Job bookkeeping around one scrape.
//!
//! Every log line is written to `scraping_logs` and mirrored to the `log`
//! stream with a `[Job {id}]` prefix.

use std::sync::Arc;

use chrono::NaiveDate;
use duckdb::Connection;
use grid_ingest_database::{DbError, jobs};
use grid_ingest_database_models::{LogLevel, ScrapingJob, UpsertCounts};

use crate::clock::Clock;

/// Handle to a running job.
pub struct JobTracker {
    job_id: i64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JobTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobTracker")
            .field("job_id", &self.job_id)
            .finish_non_exhaustive()
    }
}

impl JobTracker {
    /// Creates a job for the source and date and marks it running.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the job cannot be created.
    pub fn begin(
        conn: &Connection,
        clock: Arc<dyn Clock>,
        data_source_id: i64,
        target_date: NaiveDate,
    ) -> Result<Self, DbError> {
        let now = clock.now();
        let job = jobs::create_job(conn, data_source_id, target_date, now)?;
        jobs::mark_running(conn, job.id, now)?;

        Ok(Self {
            job_id: job.id,
            clock,
        })
    }

    /// The job's id.
    #[must_use]
    pub const fn job_id(&self) -> i64 {
        self.job_id
    }

    /// Appends a log line.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the insert fails.
    pub fn log(&self, conn: &Connection, level: LogLevel, message: &str) -> Result<(), DbError> {
        match level {
            LogLevel::Debug => log::debug!("[Job {}] {message}", self.job_id),
            LogLevel::Info => log::info!("[Job {}] {message}", self.job_id),
            LogLevel::Warning => log::warn!("[Job {}] {message}", self.job_id),
            LogLevel::Error => log::error!("[Job {}] {message}", self.job_id),
        }
        jobs::append_log(conn, self.job_id, level, message, self.clock.now())
    }

    /// Records the downloaded line count.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the update fails.
    pub fn set_rows_scraped(&self, conn: &Connection, rows: usize) -> Result<(), DbError> {
        jobs::set_rows_scraped(conn, self.job_id, i64::try_from(rows).unwrap_or(i64::MAX))
    }

    /// Marks the job completed and returns its final state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the job cannot be updated or reloaded.
    pub fn complete(self, conn: &Connection, counts: UpsertCounts) -> Result<ScrapingJob, DbError> {
        self.log(
            conn,
            LogLevel::Info,
            &format!(
                "Completed: {} inserted, {} updated",
                counts.inserted, counts.updated
            ),
        )?;
        jobs::mark_completed(conn, self.job_id, counts, self.clock.now())?;
        self.reload(conn)
    }

    /// Marks the job failed and returns its final state.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the job cannot be updated or reloaded.
    pub fn fail(self, conn: &Connection, message: &str) -> Result<ScrapingJob, DbError> {
        self.log(conn, LogLevel::Error, message)?;
        jobs::mark_failed(conn, self.job_id, message, self.clock.now())?;
        self.reload(conn)
    }

    fn reload(&self, conn: &Connection) -> Result<ScrapingJob, DbError> {
        jobs::get_job(conn, self.job_id)?.ok_or_else(|| DbError::JobState {
            job_id: self.job_id,
            message: "job disappeared".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use grid_ingest_database::store;
    use grid_ingest_database_models::JobStatus;

    use super::*;
    use crate::clock::tests::FakeClock;

    fn clock() -> Arc<FakeClock> {
        Arc::new(FakeClock::at(
            NaiveDate::from_ymd_opt(2025, 11, 13)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
        ))
    }

    #[test]
    fn begin_marks_running_and_complete_records_counts() {
        let conn = store::open_in_memory().unwrap();
        let clock = clock();
        let day = clock.today();

        let tracker = JobTracker::begin(&conn, clock.clone(), 3, day).unwrap();
        let running = jobs::get_job(&conn, tracker.job_id()).unwrap().unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert_eq!(running.started_at, Some(clock.now()));

        tracker.set_rows_scraped(&conn, 2).unwrap();
        clock.advance(TimeDelta::seconds(5));

        let job_id = tracker.job_id();
        let done = tracker
            .complete(
                &conn,
                UpsertCounts {
                    inserted: 2,
                    updated: 0,
                },
            )
            .unwrap();

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.rows_scraped, 2);
        assert_eq!(done.rows_inserted, 2);
        assert_eq!(done.completed_at, Some(clock.now()));

        let logs = jobs::logs_for_job(&conn, job_id).unwrap();
        assert_eq!(logs.last().unwrap().message, "Completed: 2 inserted, 0 updated");
    }

    #[test]
    fn fail_keeps_counts_at_zero() {
        let conn = store::open_in_memory().unwrap();

        let tracker = JobTracker::begin(&conn, clock(), 3, clock().today()).unwrap();
        let failed = tracker.fail(&conn, "Write failed: boom").unwrap();

        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.rows_inserted, 0);
        assert_eq!(failed.rows_updated, 0);
        assert_eq!(failed.error_message.as_deref(), Some("Write failed: boom"));
    }
}
