//! Production [`HttpClient`] backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;

use crate::{DownloadError, HttpClient, HttpResponse, TransportError};

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; NYISO Data Scraper)";

/// [`HttpClient`] over a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Builds a client that sends `user_agent` on every request.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the TLS backend cannot be
    /// initialized.
    pub fn new(user_agent: &str) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

fn transport_error(e: &reqwest::Error) -> TransportError {
    TransportError {
        timed_out: e.is_timeout(),
        message: e.to_string(),
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e))?
            .to_vec();

        log::debug!("GET {url} -> {status} ({} bytes)", body.len());

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }

    async fn head(&self, url: &str, timeout: Duration) -> Result<u16, TransportError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        Ok(response.status().as_u16())
    }
}
