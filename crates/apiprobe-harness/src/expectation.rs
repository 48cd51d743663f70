//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Response expectation templates and observed responses."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Media type expected for every body-carrying response.
pub const JSON_CONTENT_TYPE: &str = "application/json";

const BODY_EXCERPT_LIMIT: usize = 512;

/// Mismatch between an observed response and its expectation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpectationError {
    #[error("expected status {expected} but observed {actual}: {body}")]
    StatusMismatch {
        expected: StatusCode,
        actual: StatusCode,
        body: String,
    },
    #[error("expected content type {expected} but observed {actual:?}")]
    ContentTypeMismatch {
        expected: &'static str,
        actual: Option<String>,
    },
    #[error("response took {elapsed:?}, exceeding the {max:?} bound")]
    TooSlow { elapsed: Duration, max: Duration },
    #[error("{0} is not a valid HTTP status code")]
    InvalidStatus(u16),
}

/// Outcome of one HTTP exchange, captured whatever its status.
#[derive(Debug, Clone)]
pub struct ObservedResponse {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    elapsed: Duration,
    body: Bytes,
}

impl ObservedResponse {
    pub fn new(
        url: Url,
        status: StatusCode,
        headers: HeaderMap,
        elapsed: Duration,
        body: Bytes,
    ) -> Self {
        Self {
            url,
            status,
            headers,
            elapsed,
            body,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Verify against `expectation`, handing the response back on success.
    pub fn expect(self, expectation: &ResponseExpectation) -> Result<Self, ExpectationError> {
        expectation.verify(&self)?;
        Ok(self)
    }

    fn excerpt(&self) -> String {
        let text = self.text();
        match text.char_indices().nth(BODY_EXCERPT_LIMIT) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.into_owned(),
        }
    }
}

/// Expected status, content type and latency bound for a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseExpectation {
    status: StatusCode,
    content_type: Option<&'static str>,
    max_latency: Duration,
    log_responses: bool,
}

impl ResponseExpectation {
    /// 204 responses carry no body, so no content type is expected for them.
    pub fn new(status: StatusCode, max_latency: Duration, log_responses: bool) -> Self {
        let content_type = (status != StatusCode::NO_CONTENT).then_some(JSON_CONTENT_TYPE);
        Self {
            status,
            content_type,
            max_latency,
            log_responses,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.content_type
    }

    pub fn max_latency(&self) -> Duration {
        self.max_latency
    }

    pub fn logs_responses(&self) -> bool {
        self.log_responses
    }

    /// Check status first, then content type, then latency.
    pub fn verify(&self, response: &ObservedResponse) -> Result<(), ExpectationError> {
        if self.log_responses {
            info!(
                url = %response.url,
                status = response.status.as_u16(),
                elapsed_ms = response.elapsed.as_millis() as u64,
                body = %response.excerpt(),
                "response received"
            );
        }

        if response.status != self.status {
            return Err(ExpectationError::StatusMismatch {
                expected: self.status,
                actual: response.status,
                body: response.excerpt(),
            });
        }

        if let Some(expected) = self.content_type {
            let actual = response.content_type();
            let matches = actual
                .and_then(|value| value.split(';').next())
                .map(|media| media.trim().eq_ignore_ascii_case(expected))
                .unwrap_or(false);
            if !matches {
                return Err(ExpectationError::ContentTypeMismatch {
                    expected,
                    actual: actual.map(str::to_owned),
                });
            }
        }

        if response.elapsed >= self.max_latency {
            return Err(ExpectationError::TooSlow {
                elapsed: response.elapsed,
                max: self.max_latency,
            });
        }

        Ok(())
    }
}
