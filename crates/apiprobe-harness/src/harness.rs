//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Facade wiring configuration, token lifecycle and specification cache."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::sync::Arc;

use apiprobe_common::{ConfigProvider, Settings};
use tracing::info;

use crate::baseline::RequestBaseline;
use crate::cache::SpecCache;
use crate::catalog::EndpointCatalog;
use crate::error::Result;
use crate::exchange::{AuthExchange, HttpAuthExchange};
use crate::retry::RetryPolicy;
use crate::token::{Credential, TokenManager};

/// Shared entry point handed to every execution context.
///
/// Cloning shares the same caches and token state.
#[derive(Debug, Clone)]
pub struct Harness {
    settings: Settings,
    tokens: Arc<TokenManager>,
    cache: Arc<SpecCache>,
}

impl Harness {
    /// Wire the HTTP auth exchange and the configured default credential.
    ///
    /// The exchange reads base URL and timeouts on every login or refresh,
    /// so it is not pinned by [`SpecCache`] memoization.
    pub fn from_provider(provider: Arc<dyn ConfigProvider>) -> Result<Self> {
        let settings = Settings::new(provider);
        let exchange = HttpAuthExchange::from_settings(&settings)?;
        Self::with_exchange(settings, Arc::new(exchange))
    }

    /// Wire a caller-supplied exchange, e.g. a stub for offline runs.
    pub fn with_exchange(settings: Settings, exchange: Arc<dyn AuthExchange>) -> Result<Self> {
        let credential = Credential::from_settings(&settings)?;
        let tokens = Arc::new(TokenManager::new(exchange, credential));
        let cache = Arc::new(SpecCache::new(settings.clone(), tokens.clone()));
        info!(identity = %tokens.credential().identifier(), "harness ready");
        Ok(Self {
            settings,
            tokens,
            cache,
        })
    }

    pub fn catalog(&self) -> &'static EndpointCatalog {
        EndpointCatalog::standard()
    }

    pub fn cache(&self) -> &SpecCache {
        &self.cache
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// `baseline` re-aimed at `fallback.url`, when one is configured.
    pub fn fallback_for(&self, baseline: &RequestBaseline) -> Result<Option<RequestBaseline>> {
        Ok(self
            .settings
            .fallback_base_url()?
            .map(|url| baseline.with_base_uri(url)))
    }

    /// Retry policy from `retry.*`, read on each call.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy::from_settings(&self.settings)?)
    }
}
