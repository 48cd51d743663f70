//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Request defaults shared by every call made from one execution context."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

use apiprobe_common::Settings;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use tracing::info;
use url::Url;

use crate::error::{HarnessError, Result};
use crate::expectation::{ObservedResponse, JSON_CONTENT_TYPE};

/// Base URI, default headers and timeouts applied to outgoing requests.
///
/// Cloning is cheap: the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct RequestBaseline {
    base_uri: Url,
    headers: HeaderMap,
    connect_timeout: Duration,
    read_timeout: Duration,
    log_requests: bool,
    client: Client,
}

impl RequestBaseline {
    pub fn new(
        base_uri: Url,
        connect_timeout: Duration,
        read_timeout: Duration,
        log_requests: bool,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .build()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));

        Ok(Self {
            base_uri,
            headers,
            connect_timeout,
            read_timeout,
            log_requests,
            client,
        })
    }

    /// Read base URI, timeouts and the request logging flag from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.base_url()?,
            settings.connection_timeout()?,
            settings.read_timeout()?,
            settings.request_logging()?,
        )
    }

    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn logs_requests(&self) -> bool {
        self.log_requests
    }

    /// Copy of this baseline with one extra header; `self` is untouched.
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| HarnessError::InvalidHeader {
                name: name.to_owned(),
                reason: err.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value).map_err(|err| HarnessError::InvalidHeader {
                name: name.to_owned(),
                reason: err.to_string(),
            })?;
        let mut next = self.clone();
        next.headers.insert(header_name, header_value);
        Ok(next)
    }

    /// Copy of this baseline with `Authorization: Bearer <token>`.
    pub fn with_bearer(&self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
            HarnessError::InvalidHeader {
                name: AUTHORIZATION.to_string(),
                reason: err.to_string(),
            }
        })?;
        value.set_sensitive(true);
        let mut next = self.clone();
        next.headers.insert(AUTHORIZATION, value);
        Ok(next)
    }

    /// Copy of this baseline aimed at another host; headers and timeouts carry over.
    pub fn with_base_uri(&self, base_uri: Url) -> Self {
        let mut next = self.clone();
        next.base_uri = base_uri;
        next
    }

    /// Absolute URL for a path relative to the base URI.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.base_uri.as_str().trim_end_matches('/');
        let joined = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Url::parse(&joined).map_err(|err| HarnessError::InvalidUrl {
            reason: err.to_string(),
            url: joined,
        })
    }

    /// Start a request with the default headers applied.
    pub fn request(&self, method: Method, path: impl AsRef<str>) -> Result<RequestBuilder> {
        let url = self.url_for(path.as_ref())?;
        Ok(self
            .client
            .request(method, url)
            .headers(self.headers.clone()))
    }

    pub fn get(&self, path: impl AsRef<str>) -> Result<RequestBuilder> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: impl AsRef<str>) -> Result<RequestBuilder> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: impl AsRef<str>) -> Result<RequestBuilder> {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: impl AsRef<str>) -> Result<RequestBuilder> {
        self.request(Method::DELETE, path)
    }

    /// Send a request and capture the outcome, whatever its status.
    ///
    /// Non-2xx responses are returned as observed; only transport failures
    /// surface as errors.
    pub async fn dispatch(&self, request: RequestBuilder) -> Result<ObservedResponse> {
        let request = request.build()?;
        if self.log_requests {
            info!(
                method = %request.method(),
                url = %request.url(),
                headers = ?redacted(request.headers()),
                "sending request"
            );
        }

        let started = Instant::now();
        let response = self.client.execute(request).await?;
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        let elapsed = started.elapsed();

        Ok(ObservedResponse::new(url, status, headers, elapsed, body))
    }
}

fn redacted(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if value.is_sensitive() || name == AUTHORIZATION {
                "<redacted>".to_owned()
            } else {
                value.to_str().unwrap_or("<binary>").to_owned()
            };
            (name.to_string(), shown)
        })
        .collect()
}
