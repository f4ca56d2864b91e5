#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Row types for the ingestion database.
//!
//! Jobs and their logs, the zone and interface reference entities, the
//! registered data sources, and the insert/update counts a write reports.

use std::ops::AddAssign;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle state of a [`ScrapingJob`].
///
/// `Completed` and `Failed` are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Severity of a [`ScrapingLog`] entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// One attempt to ingest a report for a target date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingJob {
    pub id: i64,
    pub data_source_id: i64,
    /// Target date, truncated to midnight.
    pub target_date: NaiveDateTime,
    pub status: JobStatus,
    /// Data lines downloaded (header excluded).
    pub rows_scraped: i64,
    pub rows_inserted: i64,
    pub rows_updated: i64,
    pub error_message: Option<String>,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Append-only log line owned by a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingLog {
    pub id: i64,
    pub job_id: i64,
    pub level: LogLevel,
    pub message: String,
    pub created_at: NaiveDateTime,
}

/// A registered report source, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    pub report_code: String,
    pub data_type: String,
    pub dataset_name: String,
    pub category: Option<String>,
    pub update_frequency: Option<String>,
    pub is_active: bool,
}

/// A pricing/load zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: i64,
    /// Uppercased, unique.
    pub name: String,
    pub ptid: Option<i64>,
    pub display_name: Option<String>,
}

/// A transmission interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: i64,
    /// Uppercased, unique.
    pub name: String,
    pub point_id: Option<i64>,
    pub description: Option<String>,
}

/// Rows a write inserted and updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertCounts {
    /// Rows touched either way.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.inserted + self.updated
    }
}

impl AddAssign for UpsertCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.updated += rhs.updated;
    }
}
