//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Per-context request baselines and process-wide response expectations."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use apiprobe_common::Settings;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tracing::debug;

use crate::baseline::RequestBaseline;
use crate::error::Result;
use crate::expectation::{ExpectationError, ResponseExpectation};
use crate::token::TokenManager;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// Handle for one independent, concurrently running unit of test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a process-unique identifier.
    pub fn next() -> Self {
        Self(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Memoized request baselines and response expectations.
///
/// Baselines are keyed by [`ContextId`] and live until that context is
/// reset. Expectations are keyed by status code and shared by every context.
/// Neither cache observes later configuration changes until reset.
pub struct SpecCache {
    settings: Settings,
    tokens: Arc<TokenManager>,
    baselines: Mutex<HashMap<ContextId, Arc<RequestBaseline>>>,
    expectations: Mutex<HashMap<StatusCode, Arc<ResponseExpectation>>>,
}

impl fmt::Debug for SpecCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecCache")
            .field("contexts", &self.baselines.lock().len())
            .field("expectations", &self.expectations.lock().len())
            .finish()
    }
}

impl SpecCache {
    pub fn new(settings: Settings, tokens: Arc<TokenManager>) -> Self {
        Self {
            settings,
            tokens,
            baselines: Mutex::new(HashMap::new()),
            expectations: Mutex::new(HashMap::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Baseline for `context`, built from configuration on first use.
    pub fn request_baseline(&self, context: ContextId) -> Result<Arc<RequestBaseline>> {
        if let Some(existing) = self.baselines.lock().get(&context) {
            return Ok(existing.clone());
        }

        // Only the owning context builds its entry, so building outside the
        // lock cannot race with another builder for the same key.
        let built = Arc::new(RequestBaseline::from_settings(&self.settings)?);
        let baseline = self
            .baselines
            .lock()
            .entry(context)
            .or_insert_with(|| {
                debug!(%context, base_uri = %built.base_uri(), "request baseline built");
                built.clone()
            })
            .clone();
        Ok(baseline)
    }

    /// Baseline plus a bearer token read fresh from the token manager.
    pub async fn authorized_baseline(&self, context: ContextId) -> Result<RequestBaseline> {
        let baseline = self.request_baseline(context)?;
        let token = self.tokens.get_access_token().await?;
        baseline.with_bearer(&token)
    }

    /// Baseline plus one custom header; the cached baseline is not modified.
    pub fn with_header(
        &self,
        context: ContextId,
        name: &str,
        value: &str,
    ) -> Result<RequestBaseline> {
        self.request_baseline(context)?.with_header(name, value)
    }

    /// Baseline plus several custom headers; the cached baseline is not modified.
    pub fn with_headers<'a>(
        &self,
        context: ContextId,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<RequestBaseline> {
        let mut baseline = self.request_baseline(context)?.as_ref().clone();
        for (name, value) in headers {
            baseline = baseline.with_header(name, value)?;
        }
        Ok(baseline)
    }

    /// Drop the baseline cached for `context`; a no-op when none exists.
    pub fn reset_context(&self, context: ContextId) {
        if self.baselines.lock().remove(&context).is_some() {
            debug!(%context, "request baseline released");
        }
    }

    /// Drop every cached baseline and expectation.
    pub fn reset(&self) {
        let contexts = {
            let mut baselines = self.baselines.lock();
            let count = baselines.len();
            baselines.clear();
            count
        };
        let expectations = {
            let mut expectations = self.expectations.lock();
            let count = expectations.len();
            expectations.clear();
            count
        };
        debug!(contexts, expectations, "specification cache reset");
    }

    pub fn cached_contexts(&self) -> usize {
        self.baselines.lock().len()
    }

    /// Shared expectation for `status`; the first caller builds it.
    pub fn expectation(&self, status: u16) -> Result<Arc<ResponseExpectation>> {
        let status = StatusCode::from_u16(status)
            .map_err(|_| ExpectationError::InvalidStatus(status))?;
        self.expectation_for(status)
    }

    pub fn expectation_for(&self, status: StatusCode) -> Result<Arc<ResponseExpectation>> {
        let mut expectations = self.expectations.lock();
        if let Some(existing) = expectations.get(&status) {
            return Ok(existing.clone());
        }
        let expectation = Arc::new(ResponseExpectation::new(
            status,
            self.settings.max_response_latency()?,
            self.settings.response_logging()?,
        ));
        debug!(status = status.as_u16(), "response expectation built");
        expectations.insert(status, expectation.clone());
        Ok(expectation)
    }

    pub fn ok(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::OK)
    }

    pub fn created(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::CREATED)
    }

    pub fn no_content(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::NO_CONTENT)
    }

    pub fn bad_request(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::FORBIDDEN)
    }

    pub fn not_found(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::NOT_FOUND)
    }

    pub fn server_error(&self) -> Result<Arc<ResponseExpectation>> {
        self.expectation_for(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::exchange::{AuthError, AuthExchange, TokenPair};
    use crate::token::Credential;
    use apiprobe_common::{keys, MapConfig};
    use async_trait::async_trait;
    use reqwest::header::AUTHORIZATION;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct SequenceExchange {
        issued: AtomicUsize,
    }

    #[async_trait]
    impl AuthExchange for SequenceExchange {
        async fn login(&self, _: &Credential) -> std::result::Result<TokenPair, AuthError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenPair {
                access_token: format!("login-{n}"),
                refresh_token: format!("refresh-{n}"),
            })
        }

        async fn refresh(&self, _: &str) -> std::result::Result<TokenPair, AuthError> {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TokenPair {
                access_token: format!("refreshed-{n}"),
                refresh_token: format!("refresh-{n}"),
            })
        }
    }

    fn fixture() -> (Arc<MapConfig>, SpecCache) {
        let provider = Arc::new(MapConfig::from_pairs([
            (keys::BASE_URL, "http://localhost:9000/api/v1"),
            (keys::CONNECTION_TIMEOUT_MS, "500"),
            (keys::READ_TIMEOUT_MS, "1000"),
            (keys::MAX_RESPONSE_LATENCY_MS, "3000"),
            (keys::LOG_REQUEST, "false"),
            (keys::LOG_RESPONSE, "false"),
        ]));
        let tokens = Arc::new(TokenManager::new(
            Arc::new(SequenceExchange::default()),
            Credential::new("john@mail.com", "changeme"),
        ));
        let cache = SpecCache::new(Settings::new(provider.clone()), tokens);
        (provider, cache)
    }

    #[test]
    fn baseline_is_memoized_per_context_and_ignores_config_drift() {
        let (provider, cache) = fixture();
        let ctx = ContextId::next();
        let first = cache.request_baseline(ctx).unwrap();

        provider.set(keys::BASE_URL, "http://elsewhere:9999");
        let second = cache.request_baseline(ctx).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.base_uri().as_str(), "http://localhost:9000/api/v1");

        cache.reset_context(ctx);
        let rebuilt = cache.request_baseline(ctx).unwrap();
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(rebuilt.base_uri().as_str(), "http://elsewhere:9999/");
    }

    #[test]
    fn contexts_are_independent() {
        let (_provider, cache) = fixture();
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);

        let baseline_a = cache.request_baseline(a).unwrap();
        let baseline_b = cache.request_baseline(b).unwrap();
        assert!(!Arc::ptr_eq(&baseline_a, &baseline_b));

        cache.reset_context(a);
        assert_eq!(cache.cached_contexts(), 1);
        assert!(Arc::ptr_eq(&baseline_b, &cache.request_baseline(b).unwrap()));
    }

    #[test]
    fn reset_is_idempotent() {
        let (_provider, cache) = fixture();
        let ctx = ContextId::from_raw(u64::MAX);
        cache.reset_context(ctx);
        cache.reset_context(ctx);
        cache.reset();
        cache.reset();
        assert_eq!(cache.cached_contexts(), 0);
    }

    #[test]
    fn expectations_are_shared_by_status() {
        let (provider, cache) = fixture();
        let ok = cache.expectation(200).unwrap();
        let again = cache.ok().unwrap();
        assert!(Arc::ptr_eq(&ok, &again));

        let bad = cache.expectation(400).unwrap();
        assert!(!Arc::ptr_eq(&ok, &bad));
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ok.max_latency(), Duration::from_secs(3));

        provider.set(keys::MAX_RESPONSE_LATENCY_MS, "10");
        assert_eq!(cache.ok().unwrap().max_latency(), Duration::from_secs(3));
        cache.reset();
        let rebuilt = cache.ok().unwrap();
        assert!(!Arc::ptr_eq(&ok, &rebuilt));
        assert_eq!(rebuilt.max_latency(), Duration::from_millis(10));
    }

    #[test]
    fn concurrent_expectation_construction_happens_once() {
        let (_provider, cache) = fixture();
        let cache = Arc::new(cache);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.not_found().unwrap())
            })
            .collect();
        let built: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for expectation in &built[1..] {
            assert!(Arc::ptr_eq(&built[0], expectation));
        }
    }

    #[test]
    fn invalid_status_and_missing_config_are_errors() {
        let (provider, cache) = fixture();
        assert!(matches!(
            cache.expectation(42),
            Err(HarnessError::Expectation(ExpectationError::InvalidStatus(42)))
        ));
        provider.remove(keys::MAX_RESPONSE_LATENCY_MS);
        assert!(matches!(cache.created(), Err(HarnessError::Config(_))));
    }

    #[tokio::test]
    async fn authorized_baseline_rereads_the_token() {
        let (_provider, cache) = fixture();
        let ctx = ContextId::next();
        let first = cache.authorized_baseline(ctx).await.unwrap();
        assert_eq!(first.headers().get(AUTHORIZATION).unwrap(), "Bearer login-1");

        cache.tokens().refresh_access_token().await.unwrap();
        let second = cache.authorized_baseline(ctx).await.unwrap();
        assert_eq!(
            second.headers().get(AUTHORIZATION).unwrap(),
            "Bearer refreshed-2"
        );
        assert!(cache
            .request_baseline(ctx)
            .unwrap()
            .headers()
            .get(AUTHORIZATION)
            .is_none());
    }

    #[test]
    fn header_helpers_do_not_touch_cached_baseline() {
        let (_provider, cache) = fixture();
        let ctx = ContextId::next();
        let custom = cache
            .with_headers(ctx, [("X-Env", "qa"), ("X-Run", "7")])
            .unwrap();
        assert_eq!(custom.headers().get("x-env").unwrap(), "qa");
        assert_eq!(custom.headers().get("x-run").unwrap(), "7");
        let single = cache.with_header(ctx, "X-Env", "prod").unwrap();
        assert_eq!(single.headers().get("x-env").unwrap(), "prod");
        assert!(cache
            .request_baseline(ctx)
            .unwrap()
            .headers()
            .get("x-env")
            .is_none());
    }
}
