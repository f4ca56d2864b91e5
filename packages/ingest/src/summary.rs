//! Console reporting for finished jobs.

use std::collections::HashMap;
use std::fmt;

use duckdb::Connection;
use grid_ingest_database::DbError;
use grid_ingest_database::sources::list_sources;
use grid_ingest_database_models::{JobStatus, ScrapingJob};

/// Report codes keyed by data source id, for labelling job lines.
///
/// # Errors
///
/// Returns [`DbError`] if the sources cannot be read.
pub fn report_codes(conn: &Connection) -> Result<HashMap<i64, String>, DbError> {
    Ok(list_sources(conn)?
        .into_iter()
        .map(|source| (source.id, source.report_code))
        .collect())
}

/// One line per job: code, date, status, counts, and any error.
#[must_use]
pub fn job_line(report_code: &str, job: &ScrapingJob) -> String {
    let mut line = format!(
        "{report_code:<18} {date} {status:<9} scraped={scraped} inserted={inserted} updated={updated}",
        date = job.target_date.date(),
        status = job.status,
        scraped = job.rows_scraped,
        inserted = job.rows_inserted,
        updated = job.rows_updated,
    );
    if let Some(error) = &job.error_message {
        line.push_str(" error=");
        line.push_str(error);
    }
    line
}

/// Totals over a batch of jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub successful: usize,
    pub failed: usize,
    pub inserted: i64,
    pub updated: i64,
}

impl RunSummary {
    /// Tallies `jobs`. Only completed jobs contribute row counts.
    #[must_use]
    pub fn from_jobs<'a>(jobs: impl IntoIterator<Item = &'a ScrapingJob>) -> Self {
        let mut summary = Self::default();
        for job in jobs {
            match job.status {
                JobStatus::Completed => {
                    summary.successful += 1;
                    summary.inserted += job.rows_inserted;
                    summary.updated += job.rows_updated;
                }
                JobStatus::Failed => summary.failed += 1,
                JobStatus::Pending | JobStatus::Running => {}
            }
        }
        summary
    }

    /// Whether any job failed.
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} successful, {} failed, {} inserted, {} updated",
            self.successful, self.failed, self.inserted, self.updated
        )
    }
}
