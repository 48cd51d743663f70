//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Credential exchange against the login and refresh endpoints."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::borrow::Cow;

use apiprobe_common::Settings;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::baseline::RequestBaseline;
use crate::catalog::Endpoint;
use crate::error::HarnessError;
use crate::token::Credential;

/// Access/refresh pair returned by a successful exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Failures of a login or refresh exchange.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth exchange transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("auth endpoint rejected the exchange with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("auth endpoint returned an unusable token payload: {0}")]
    MalformedResponse(String),
    #[error("auth exchange could not be prepared: {0}")]
    Setup(String),
}

impl From<HarnessError> for AuthError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Transport(inner) => AuthError::Transport(inner),
            other => AuthError::Setup(other.to_string()),
        }
    }
}

/// Network seam used by the token manager.
#[async_trait]
pub trait AuthExchange: Send + Sync + 'static {
    /// Trade a credential for a fresh token pair.
    async fn login(&self, credential: &Credential) -> Result<TokenPair, AuthError>;

    /// Trade a refresh token for a fresh token pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError>;
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Clone)]
enum BaselineSource {
    Fixed(RequestBaseline),
    Live(Settings),
}

/// [`AuthExchange`] over HTTP; any 2xx with a non-empty pair is a success.
#[derive(Debug, Clone)]
pub struct HttpAuthExchange {
    source: BaselineSource,
}

impl HttpAuthExchange {
    /// Exchange pinned to one baseline.
    pub fn new(baseline: RequestBaseline) -> Self {
        Self {
            source: BaselineSource::Fixed(baseline),
        }
    }

    /// Exchange that re-reads base URL and timeouts before every call, so
    /// configuration changes reach login and refresh without a rebuild.
    ///
    /// The settings are validated once here.
    pub fn from_settings(settings: &Settings) -> Result<Self, HarnessError> {
        RequestBaseline::from_settings(settings)?;
        Ok(Self {
            source: BaselineSource::Live(settings.clone()),
        })
    }

    fn baseline(&self) -> Result<Cow<'_, RequestBaseline>, HarnessError> {
        match &self.source {
            BaselineSource::Fixed(baseline) => Ok(Cow::Borrowed(baseline)),
            BaselineSource::Live(settings) => {
                Ok(Cow::Owned(RequestBaseline::from_settings(settings)?))
            }
        }
    }

    async fn exchange<B: Serialize + Sync>(
        &self,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<TokenPair, AuthError> {
        let baseline = self.baseline()?;
        let request = baseline.post(endpoint.template())?.json(body);
        let observed = baseline.dispatch(request).await?;
        debug!(endpoint = %endpoint, status = observed.status().as_u16(), "auth exchange completed");

        if !observed.status().is_success() {
            return Err(AuthError::Rejected {
                status: observed.status(),
                body: observed.text().into_owned(),
            });
        }

        let pair: TokenPair = observed
            .json()
            .map_err(|err| AuthError::MalformedResponse(err.to_string()))?;
        if pair.access_token.trim().is_empty() || pair.refresh_token.trim().is_empty() {
            return Err(AuthError::MalformedResponse(
                "empty access or refresh token".to_owned(),
            ));
        }
        Ok(pair)
    }
}

#[async_trait]
impl AuthExchange for HttpAuthExchange {
    async fn login(&self, credential: &Credential) -> Result<TokenPair, AuthError> {
        let body = LoginBody {
            email: credential.identifier(),
            password: credential.secret(),
        };
        self.exchange(Endpoint::Login, &body).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.exchange(Endpoint::RefreshToken, &RefreshBody { refresh_token })
            .await
    }
}
