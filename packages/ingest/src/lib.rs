#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion of NYISO market reports into `DuckDB`.
//!
//! [`pipeline::Pipeline`] ties the pieces together for one (report, date):
//! open a job, download through the fallback ladder, parse and transform,
//! upsert in one transaction, and record the outcome. The
//! [`scheduler::Scheduler`] drives the pipeline on each report's cadence.

pub mod clock;
pub mod config;
pub mod pipeline;
pub mod routes;
pub mod scheduler;
pub mod summary;
pub mod tracker;

use grid_ingest_database::DbError;
use grid_ingest_scraper::DownloadError;
use grid_ingest_source::SourceError;
use grid_ingest_transform::TransformError;
use strum_macros::{AsRefStr, Display};

pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, IngestConfig};
pub use pipeline::Pipeline;
pub use routes::ReportRoutes;
pub use scheduler::Scheduler;

/// Pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
pub enum Stage {
    Download,
    Parse,
    Write,
    Internal,
}

/// Errors that can occur while ingesting.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Source registry error.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Download error.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Parse or transform error.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Database error.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IngestError {
    /// Stage the error belongs to.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Download(_) => Stage::Download,
            Self::Transform(_) => Stage::Parse,
            Self::Database(_) => Stage::Write,
            Self::Source(_) | Self::Config(_) => Stage::Internal,
        }
    }

    /// Message recorded on a failed job, e.g. `Download failed: ...`.
    #[must_use]
    pub fn job_message(&self) -> String {
        format!("{} failed: {self}", self.stage())
    }
}
