//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Process-wide authentication token lifecycle."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
//! Token lifecycle: `Unauthenticated -> Authenticated -> (Refreshing) ->
//! Authenticated | Unauthenticated`.
//!
//! All transitions happen while holding one async mutex, so at most one
//! credential exchange is in flight and concurrent callers observe the
//! result of that exchange instead of issuing their own.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apiprobe_common::{ConfigError, Settings};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::HarnessError;
use crate::exchange::{AuthError, AuthExchange, HttpAuthExchange, TokenPair};

/// Login identity; never mutated after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identifier: String,
    secret: String,
}

impl Credential {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Default credential from `client.email` / `client.password`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self::new(settings.client_email()?, settings.client_password()?))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One generation of tokens. Access and refresh tokens are only ever
/// replaced together.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenState {
    access_token: String,
    refresh_token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Expiry decoded from the access token's `exp` claim, when it is a JWT.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        let Some(expiry) = self.expires_at else {
            return false;
        };
        // A skew too large to represent reaches past any expiry.
        match chrono::Duration::from_std(skew)
            .ok()
            .and_then(|skew| now.checked_add_signed(skew))
        {
            Some(horizon) => horizon >= expiry,
            None => true,
        }
    }
}

impl From<TokenPair> for TokenState {
    fn from(pair: TokenPair) -> Self {
        let expires_at = jwt_expiry(&pair.access_token);
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at,
        }
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&decoded).ok()?;
    DateTime::from_timestamp(claim.exp, 0)
}

/// Default margin before a known expiry at which the token is treated as stale.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Owner of the single shared [`TokenState`].
pub struct TokenManager {
    exchange: Arc<dyn AuthExchange>,
    credential: Credential,
    state: Mutex<Option<TokenState>>,
    /// Bumped under `state` each time a renewal stores a new pair.
    generation: AtomicU64,
    expiry_skew: Duration,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("credential", &self.credential)
            .field("expiry_skew", &self.expiry_skew)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(exchange: Arc<dyn AuthExchange>, credential: Credential) -> Self {
        Self {
            exchange,
            credential,
            state: Mutex::new(None),
            generation: AtomicU64::new(0),
            expiry_skew: DEFAULT_EXPIRY_SKEW,
        }
    }

    /// HTTP exchange and default credential, both from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self, HarnessError> {
        let exchange = HttpAuthExchange::from_settings(settings)?;
        let credential = Credential::from_settings(settings)?;
        Ok(Self::new(Arc::new(exchange), credential))
    }

    pub fn with_expiry_skew(mut self, skew: Duration) -> Self {
        self.expiry_skew = skew;
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Return the cached access token, logging in first when none is cached.
    ///
    /// A token whose JWT expiry has passed is renewed through the refresh
    /// path. Login failures are returned to the caller.
    pub async fn get_access_token(&self) -> Result<String, AuthError> {
        let mut state = self.state.lock().await;
        let stale_refresh = match state.as_ref() {
            Some(current) if !current.is_expired(Utc::now(), self.expiry_skew) => {
                return Ok(current.access_token.clone());
            }
            Some(current) => {
                debug!("cached access token expired; refreshing");
                Some(current.refresh_token.clone())
            }
            None => None,
        };

        self.renew(&mut *state, stale_refresh.as_deref()).await
    }

    /// Exchange the refresh token for a new pair, degrading to a full login
    /// when no refresh token is cached or the exchange fails.
    ///
    /// Callers that queued behind a renewal which completed after they
    /// arrived share its pair instead of issuing another exchange.
    pub async fn refresh_access_token(&self) -> Result<String, AuthError> {
        let observed = self.generation.load(Ordering::Acquire);
        let mut state = self.state.lock().await;
        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(current) = state.as_ref() {
                debug!("token renewed while waiting; reusing it");
                return Ok(current.access_token.clone());
            }
        }
        let refresh = state.as_ref().map(|current| current.refresh_token.clone());
        self.renew(&mut *state, refresh.as_deref()).await
    }

    /// Drop both tokens; the next [`get_access_token`](Self::get_access_token) logs in again.
    pub async fn clear_tokens(&self) {
        let mut state = self.state.lock().await;
        if state.take().is_some() {
            info!(identity = %self.credential.identifier, "cached tokens cleared");
        }
    }

    /// Current generation, if authenticated.
    pub async fn snapshot(&self) -> Option<TokenState> {
        self.state.lock().await.clone()
    }

    async fn renew(
        &self,
        state: &mut Option<TokenState>,
        refresh_token: Option<&str>,
    ) -> Result<String, AuthError> {
        let outcome = match refresh_token {
            Some(token) => match self.exchange.refresh(token).await {
                Ok(pair) => {
                    info!(identity = %self.credential.identifier, "access token refreshed");
                    Ok(pair)
                }
                Err(err) => {
                    warn!(error = %err, "token refresh failed; falling back to login");
                    self.login().await
                }
            },
            None => self.login().await,
        };

        match outcome {
            Ok(pair) => {
                let next = TokenState::from(pair);
                let access = next.access_token.clone();
                *state = Some(next);
                self.generation.fetch_add(1, Ordering::AcqRel);
                Ok(access)
            }
            Err(err) => {
                *state = None;
                Err(err)
            }
        }
    }

    async fn login(&self) -> Result<TokenPair, AuthError> {
        let pair = self.exchange.login(&self.credential).await?;
        info!(identity = %self.credential.identifier, "login succeeded");
        Ok(pair)
    }
}
