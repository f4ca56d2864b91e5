#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Report downloading for the grid ingestion pipeline.
//!
//! [`downloader::Downloader`] walks the fallback ladder (direct CSV,
//! previous day, monthly archive, previous month's archive) on top of the
//! [`retry`] loop. [`openmeteo::OpenMeteoClient`] fetches the secondary
//! weather source. All network access goes through the [`HttpClient`]
//! trait so tests can script responses.
//!
//! This crate knows nothing about parsing or storage; it hands back raw
//! text and JSON.

pub mod archive;
pub mod downloader;
pub mod http;
pub mod openmeteo;
pub mod retry;
#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

pub use downloader::{Downloader, DownloaderConfig, Rung};
pub use http::ReqwestClient;

/// Errors that can occur while downloading.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Every rung of the fallback ladder failed.
    #[error("All download strategies failed for {report_code} on {date}: {}", format_attempts(.attempts))]
    Exhausted {
        /// Report being fetched.
        report_code: String,
        /// Target date, `YYYY-MM-DD`.
        date: String,
        /// One entry per rung tried, in order.
        attempts: Vec<RungAttempt>,
    },

    /// The request never produced a response (timeout, refused connection,
    /// truncated body).
    #[error("HTTP error for {url}: {message}")]
    Http {
        /// Requested URL.
        url: String,
        /// Transport failure description.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// A zip archive could not be read or held no usable CSV entry.
    #[error("Archive error: {message}")]
    Archive {
        /// Description of what went wrong.
        message: String,
    },

    /// The weather API answered with something unusable.
    #[error("Weather API error: {message}")]
    Api {
        /// Description of what went wrong.
        message: String,
    },

    /// Building the HTTP client failed.
    #[error("Client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result of one rung of the fallback ladder.
#[derive(Debug, Clone)]
pub struct RungAttempt {
    /// Which rung.
    pub rung: Rung,
    /// URL requested.
    pub url: String,
    /// Why the rung did not produce content.
    pub outcome: String,
}

impl fmt::Display for RungAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.rung, self.url, self.outcome)
    }
}

fn format_attempts(attempts: &[RungAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Failure to get any response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Whether the request timed out.
    pub timed_out: bool,
    /// Description of the failure.
    pub message: String,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.timed_out {
            write!(f, "timed out: {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Minimal HTTP surface the downloader needs.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issues a GET and reads the whole body.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response could be read. Non-2xx
    /// statuses are returned as responses, not errors.
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError>;

    /// Issues a HEAD and returns the status code.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response could be read.
    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError>;
}
