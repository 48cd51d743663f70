//! ---
//! probe_section: "03-resource-clients"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Client for the users resource."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::fmt::Display;

use apiprobe_harness::{ContextId, Endpoint, Harness, Method, ObservedResponse, Result, RetryPolicy};
use serde_json::json;

use crate::models::{CreateUserRequest, UpdateUserRequest};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct UsersClient {
    transport: Transport,
}

impl UsersClient {
    pub fn new(harness: Harness, context: ContextId) -> Self {
        Self {
            transport: Transport::new(harness, context),
        }
    }

    pub fn authorized(self) -> Self {
        Self {
            transport: self.transport.authorized(true),
        }
    }

    pub fn with_retry(self, policy: RetryPolicy) -> Self {
        Self {
            transport: self.transport.with_retry(policy),
        }
    }

    pub async fn list(&self) -> Result<ObservedResponse> {
        let path = Endpoint::GetAllUsers.resolve(&[])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn list_limited(&self, limit: u32) -> Result<ObservedResponse> {
        let path = Endpoint::GetAllUsers
            .resolve(&[])?
            .with_query([format!("limit={limit}")]);
        self.transport.send(Method::GET, &path).await
    }

    pub async fn get(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::GetUserById.resolve(&[&id])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn create(&self, body: &CreateUserRequest) -> Result<ObservedResponse> {
        let path = Endpoint::CreateUser.resolve(&[])?;
        self.transport.send_json(Method::POST, &path, body).await
    }

    pub async fn update(&self, id: impl Display, body: &UpdateUserRequest) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::UpdateUser.resolve(&[&id])?;
        self.transport.send_json(Method::PUT, &path, body).await
    }

    pub async fn delete(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::DeleteUser.resolve(&[&id])?;
        self.transport.send(Method::DELETE, &path).await
    }

    /// Ask whether an email is still free to register.
    pub async fn is_available(&self, email: &str) -> Result<ObservedResponse> {
        let path = Endpoint::IsUserAvailable.resolve(&[])?;
        self.transport
            .send_json(Method::POST, &path, &json!({ "email": email }))
            .await
    }
}
