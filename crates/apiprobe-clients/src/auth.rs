//! ---
//! probe_section: "03-resource-clients"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Client for the authentication endpoints."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
//! Raw access to the auth endpoints, for scenarios that test authentication
//! itself. Ordinary scenarios get their token from the harness token manager.

use apiprobe_harness::{ContextId, Endpoint, Harness, Method, ObservedResponse, Result};
use serde_json::json;

use crate::models::LoginRequest;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct AuthClient {
    transport: Transport,
}

impl AuthClient {
    pub fn new(harness: Harness, context: ContextId) -> Self {
        Self {
            transport: Transport::new(harness, context),
        }
    }

    pub async fn login(&self, body: &LoginRequest) -> Result<ObservedResponse> {
        let path = Endpoint::Login.resolve(&[])?;
        self.transport.send_json(Method::POST, &path, body).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<ObservedResponse> {
        let path = Endpoint::RefreshToken.resolve(&[])?;
        self.transport
            .send_json(Method::POST, &path, &json!({ "refreshToken": refresh_token }))
            .await
    }

    /// Profile of the identity held by the harness token manager.
    pub async fn profile(&self) -> Result<ObservedResponse> {
        let path = Endpoint::Profile.resolve(&[])?;
        self.transport
            .send_with(Method::GET, &path, None::<&()>, true)
            .await
    }

    /// Profile for an explicit token, e.g. a deliberately invalid one.
    pub async fn profile_with_token(&self, access_token: &str) -> Result<ObservedResponse> {
        let path = Endpoint::Profile.resolve(&[])?;
        let baseline = self
            .transport
            .harness()
            .cache()
            .request_baseline(self.transport.context())?
            .with_bearer(access_token)?;
        let request = baseline.get(&path)?;
        baseline.dispatch(request).await
    }
}
