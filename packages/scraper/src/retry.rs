//! Retry loop for a single GET.
//!
//! Timeouts, transport failures, and non-404 statuses are retried with
//! linear backoff (`retry_delay * attempt`). A `404` is never retried: the
//! resource does not exist yet, and the caller should move on.

use std::time::Duration;

use crate::{DownloadError, HttpClient, HttpResponse};

/// Attempt budget and timing for [`fetch_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `retry_delay * n` before attempt `n + 1`.
    pub retry_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Same policy with the request timeout doubled.
    #[must_use]
    pub fn with_doubled_timeout(self) -> Self {
        Self {
            timeout: self.timeout * 2,
            ..self
        }
    }
}

/// What a successful retry loop produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A 2xx response.
    Found(HttpResponse),
    /// A 404; not retried.
    NotFound,
}

/// GETs `url`, retrying transient failures per `policy`.
///
/// # Errors
///
/// Returns the last [`DownloadError::Http`] or [`DownloadError::Status`]
/// once every attempt has failed.
pub async fn fetch_with_retry(
    client: &dyn HttpClient,
    url: &str,
    policy: &RetryPolicy,
) -> Result<FetchOutcome, DownloadError> {
    let max_retries = policy.max_retries.max(1);
    let mut last_error = None;

    for attempt in 1..=max_retries {
        log::debug!("GET {url} (attempt {attempt}/{max_retries})");

        let error = match client.get(url, policy.timeout).await {
            Ok(response) if response.is_success() => return Ok(FetchOutcome::Found(response)),
            Ok(response) if response.status == 404 => {
                log::debug!("File not found (404): {url}");
                return Ok(FetchOutcome::NotFound);
            }
            Ok(response) => DownloadError::Status {
                url: url.to_string(),
                status: response.status,
            },
            Err(e) => DownloadError::Http {
                url: url.to_string(),
                message: e.to_string(),
            },
        };

        if attempt < max_retries {
            let delay = policy.retry_delay * attempt;
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}: {error}");
            tokio::time::sleep(delay).await;
        }
        last_error = Some(error);
    }

    Err(last_error.unwrap_or_else(|| DownloadError::Http {
        url: url.to_string(),
        message: "no attempts made".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Reply, ScriptedClient};

    const URL: &str = "http://example.test/a.csv";

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let client = ScriptedClient::new();
        let outcome = fetch_with_retry(&client, URL, &fast_policy()).await.unwrap();
        assert_eq!(outcome, FetchOutcome::NotFound);
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let client = ScriptedClient::new()
            .with(URL, Reply::status(503))
            .with(URL, Reply::timeout())
            .with(URL, Reply::csv("a,b\n1,2\n"));

        let outcome = fetch_with_retry(&client, URL, &fast_policy()).await.unwrap();
        assert!(matches!(outcome, FetchOutcome::Found(r) if r.body == b"a,b\n1,2\n"));
        assert_eq!(client.requests().len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let client = ScriptedClient::new().with(URL, Reply::status(500));

        let result = fetch_with_retry(&client, URL, &fast_policy()).await;
        assert!(matches!(result, Err(DownloadError::Status { status: 500, .. })));
        assert_eq!(client.requests().len(), 3);
    }

    #[test]
    fn doubles_timeout() {
        let policy = RetryPolicy::default().with_doubled_timeout();
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert_eq!(policy.max_retries, 3);
    }
}
