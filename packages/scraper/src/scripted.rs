//! An in-memory [`HttpClient`] that replays scripted responses.
//!
//! Compiled for tests only, or for dependent crates' tests through the
//! `test-utils` feature. URLs with no script answer `404`. When a URL has
//! several scripted replies they are consumed in order, and the last one
//! repeats.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::{HttpClient, HttpResponse, TransportError};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with this status, content type, and body.
    Respond(HttpResponse),
    /// Fail at the transport level.
    Fail(TransportError),
}

impl Reply {
    /// `200` with a CSV body.
    #[must_use]
    pub fn csv(body: &str) -> Self {
        Self::Respond(HttpResponse {
            status: 200,
            content_type: Some("text/csv".to_string()),
            body: body.as_bytes().to_vec(),
        })
    }

    /// `200` with a zip body.
    #[must_use]
    pub fn zip(body: Vec<u8>) -> Self {
        Self::Respond(HttpResponse {
            status: 200,
            content_type: Some("application/zip".to_string()),
            body,
        })
    }

    /// `200` with a JSON body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::Respond(HttpResponse {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        })
    }

    /// Bare status with an empty body.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self::Respond(HttpResponse {
            status,
            content_type: None,
            body: Vec::new(),
        })
    }

    /// A timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Fail(TransportError {
            timed_out: true,
            message: "operation timed out".to_string(),
        })
    }
}

/// Scripted [`HttpClient`] that records every URL it is asked for.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    replies: Mutex<BTreeMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Creates a client with no scripts; every URL answers `404`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `reply` to the script for `url`.
    #[must_use]
    pub fn with(self, url: &str, reply: Reply) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(url.to_string()).or_default().push_back(reply);
        }
        self
    }

    /// Every URL requested so far, in order (GET and HEAD alike).
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, url: &str) -> Reply {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let Ok(mut replies) = self.replies.lock() else {
            return Reply::status(500);
        };
        match replies.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Reply::status(404)),
            Some(queue) => queue.front().cloned().unwrap_or(Reply::status(404)),
            None => Reply::status(404),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedClient {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<HttpResponse, TransportError> {
        match self.next_reply(url) {
            Reply::Respond(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }

    async fn head(&self, url: &str, _timeout: Duration) -> Result<u16, TransportError> {
        match self.next_reply(url) {
            Reply::Respond(response) => Ok(response.status),
            Reply::Fail(error) => Err(error),
        }
    }
}
