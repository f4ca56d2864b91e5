//! Fallback-ladder downloader for published reports.
//!
//! For a report and target date the ladder tries, in order:
//!
//! 1. the direct CSV for the date,
//! 2. the direct CSV for the previous day,
//! 3. the monthly zip archive for the date's month,
//! 4. the monthly zip archive for the previous month.
//!
//! The first rung that yields content wins. Archive rungs are skipped for
//! sources without an archive URL, and a rung whose URL repeats an earlier
//! one is skipped.

use std::sync::Arc;

use chrono::{Datelike as _, NaiveDate};
use grid_ingest_source_models::SourceConfig;
use strum_macros::{AsRefStr, Display};

use crate::archive::extract_csv;
use crate::http::DEFAULT_USER_AGENT;
use crate::retry::{FetchOutcome, RetryPolicy, fetch_with_retry};
use crate::{DownloadError, HttpClient, HttpResponse, RungAttempt};

/// One strategy of the fallback ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Rung {
    /// Direct CSV for the target date.
    Direct,
    /// Direct CSV for the day before.
    PreviousDay,
    /// Zip archive for the target month.
    Archive,
    /// Zip archive for the month before.
    PreviousMonthArchive,
}

impl Rung {
    /// Whether this rung reads a zip archive.
    #[must_use]
    pub const fn is_archive(self) -> bool {
        matches!(self, Self::Archive | Self::PreviousMonthArchive)
    }
}

/// Downloader settings.
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Attempt budget per network request.
    pub retry: RetryPolicy,
    /// User agent for [`crate::ReqwestClient`].
    pub user_agent: String,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// CSV text.
    pub text: String,
    /// Rung that produced it.
    pub rung: Rung,
    /// URL that produced it.
    pub url: String,
}

/// Walks the fallback ladder over an [`HttpClient`].
#[derive(Clone)]
pub struct Downloader {
    client: Arc<dyn HttpClient>,
    config: DownloaderConfig,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    /// Creates a downloader over `client`.
    #[must_use]
    pub fn new(client: Arc<dyn HttpClient>, config: DownloaderConfig) -> Self {
        Self { client, config }
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Fetches the CSV text for `config` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Exhausted`] if every rung failed.
    pub async fn fetch(&self, config: &SourceConfig, date: NaiveDate) -> Result<String, DownloadError> {
        self.fetch_download(config, date).await.map(|d| d.text)
    }

    /// Like [`Self::fetch`], but also reports which rung succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Exhausted`] if every rung failed.
    pub async fn fetch_download(
        &self,
        config: &SourceConfig,
        date: NaiveDate,
    ) -> Result<Download, DownloadError> {
        let expected_filename = config.filename_for(date);
        let mut attempts = Vec::new();

        for (rung, url) in plan(config, date) {
            if rung != Rung::Direct {
                log::warn!("{}: falling back to {rung}: {url}", config.report_code);
            }

            let result = if rung.is_archive() {
                self.try_archive(&url, &expected_filename).await
            } else {
                self.try_direct(&url).await
            };

            match result {
                Ok(text) => {
                    log::info!(
                        "{}: downloaded {} bytes via {rung}",
                        config.report_code,
                        text.len()
                    );
                    return Ok(Download { text, rung, url });
                }
                Err(outcome) => {
                    log::debug!("{}: {rung} failed: {outcome}", config.report_code);
                    attempts.push(RungAttempt { rung, url, outcome });
                }
            }
        }

        Err(DownloadError::Exhausted {
            report_code: config.report_code.clone(),
            date: date.format("%Y-%m-%d").to_string(),
            attempts,
        })
    }

    /// Whether `url` answers a HEAD with `200`.
    pub async fn url_exists(&self, url: &str) -> bool {
        match self.client.head(url, self.config.retry.timeout).await {
            Ok(status) => status == 200,
            Err(e) => {
                log::debug!("HEAD {url} failed: {e}");
                false
            }
        }
    }

    async fn try_direct(&self, url: &str) -> Result<String, String> {
        let response = self.get(url, &self.config.retry).await?;
        if !looks_like_csv(&response) {
            log::warn!(
                "Unexpected content type for {url}: {}",
                response.content_type.as_deref().unwrap_or("none")
            );
        }
        Ok(String::from_utf8_lossy(&response.body).into_owned())
    }

    async fn try_archive(&self, url: &str, expected_filename: &str) -> Result<String, String> {
        let policy = self.config.retry.with_doubled_timeout();
        let response = self.get(url, &policy).await?;
        let (entry, text) = extract_csv(&response.body, expected_filename).map_err(|e| e.to_string())?;
        log::debug!("Extracted {entry} from {url}");
        Ok(text)
    }

    async fn get(&self, url: &str, policy: &RetryPolicy) -> Result<HttpResponse, String> {
        match fetch_with_retry(self.client.as_ref(), url, policy).await {
            Ok(FetchOutcome::Found(response)) => Ok(response),
            Ok(FetchOutcome::NotFound) => Err("not found (404)".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Ordered `(rung, url)` pairs the ladder will try for `config` on `date`.
#[must_use]
pub fn plan(config: &SourceConfig, date: NaiveDate) -> Vec<(Rung, String)> {
    let mut candidates = vec![(Rung::Direct, config.direct_url(date))];
    if let Some(previous) = date.pred_opt() {
        candidates.push((Rung::PreviousDay, config.direct_url(previous)));
    }
    if config.has_archive() {
        candidates.push((Rung::Archive, config.archive_url(date)));
        if let Some(previous_month) = first_of_previous_month(date) {
            candidates.push((Rung::PreviousMonthArchive, config.archive_url(previous_month)));
        }
    }

    let mut seen = Vec::new();
    candidates.retain(|(_, url)| {
        if seen.contains(url) {
            false
        } else {
            seen.push(url.clone());
            true
        }
    });
    candidates
}

/// First day of the month before `date`'s month.
#[must_use]
pub fn first_of_previous_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?.pred_opt()?.with_day(1)
}

fn looks_like_csv(response: &HttpResponse) -> bool {
    response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_lowercase().contains("csv"))
        || response.body.trim_ascii_start().starts_with(b",")
}
