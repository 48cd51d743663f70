//! ---
//! probe_section: "03-resource-clients"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Shared dispatch path for resource clients."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use apiprobe_harness::{
    ContextId, Harness, Method, ObservedResponse, RequestBaseline, ResolvedPath, Result,
    RetryPolicy,
};
use serde::Serialize;
use tracing::debug;

/// Context-bound dispatcher; every client owns one.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    harness: Harness,
    context: ContextId,
    authorized: bool,
    retry: RetryPolicy,
}

impl Transport {
    pub(crate) fn new(harness: Harness, context: ContextId) -> Self {
        Self {
            harness,
            context,
            authorized: false,
            retry: RetryPolicy::disabled(),
        }
    }

    pub(crate) fn authorized(mut self, authorized: bool) -> Self {
        self.authorized = authorized;
        self
    }

    pub(crate) fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub(crate) fn harness(&self) -> &Harness {
        &self.harness
    }

    pub(crate) fn context(&self) -> ContextId {
        self.context
    }

    async fn baseline(&self, authorized: bool) -> Result<RequestBaseline> {
        if authorized {
            self.harness.cache().authorized_baseline(self.context).await
        } else {
            Ok(self
                .harness
                .cache()
                .request_baseline(self.context)?
                .as_ref()
                .clone())
        }
    }

    pub(crate) async fn send(&self, method: Method, path: &ResolvedPath) -> Result<ObservedResponse> {
        self.send_with(method, path, None::<&()>, self.authorized).await
    }

    pub(crate) async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &ResolvedPath,
        body: &B,
    ) -> Result<ObservedResponse> {
        self.send_with(method, path, Some(body), self.authorized).await
    }

    pub(crate) async fn send_with<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &ResolvedPath,
        body: Option<&B>,
        authorized: bool,
    ) -> Result<ObservedResponse> {
        self.retry
            .run(|attempt| {
                let method = method.clone();
                async move {
                    let baseline = self.baseline(authorized).await?;
                    let mut request = baseline.request(method.clone(), path)?;
                    if let Some(body) = body {
                        request = request.json(body);
                    }
                    debug!(
                        context = %self.context,
                        endpoint = path.endpoint(),
                        %method,
                        attempt,
                        "dispatching"
                    );
                    baseline.dispatch(request).await
                }
            })
            .await
    }
}
