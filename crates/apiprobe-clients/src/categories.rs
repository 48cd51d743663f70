//! ---
//! probe_section: "03-resource-clients"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Client for the categories resource."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::fmt::Display;

use apiprobe_harness::{ContextId, Endpoint, Harness, Method, ObservedResponse, Result, RetryPolicy};

use crate::models::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct CategoriesClient {
    transport: Transport,
}

impl CategoriesClient {
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
        let path = Endpoint::GetAllCategories.resolve(&[])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn get(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::GetCategoryById.resolve(&[&id])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<ObservedResponse> {
        let path = Endpoint::GetCategoryBySlug.resolve(&[slug])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn products(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::GetProductsByCategory.resolve(&[&id])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn create(&self, body: &CreateCategoryRequest) -> Result<ObservedResponse> {
        let path = Endpoint::CreateCategory.resolve(&[])?;
        self.transport.send_json(Method::POST, &path, body).await
    }

    pub async fn update(
        &self,
        id: impl Display,
        body: &UpdateCategoryRequest,
    ) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::UpdateCategory.resolve(&[&id])?;
        self.transport.send_json(Method::PUT, &path, body).await
    }

    pub async fn delete(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::DeleteCategory.resolve(&[&id])?;
        self.transport.send(Method::DELETE, &path).await
    }
}
