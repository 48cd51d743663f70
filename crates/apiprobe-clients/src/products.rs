//! ---
//! probe_section: "03-resource-clients"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Client for the products resource."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::fmt::Display;

use apiprobe_harness::{ContextId, Endpoint, Harness, Method, ObservedResponse, Result, RetryPolicy};

use crate::models::{CreateProductRequest, UpdateProductRequest};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct ProductsClient {
    transport: Transport,
}

impl ProductsClient {
    pub fn new(harness: Harness, context: ContextId) -> Self {
        Self {
            transport: Transport::new(harness, context),
        }
    }

    /// Attach the current bearer token to every call.
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

    pub async fn create(&self, body: &CreateProductRequest) -> Result<ObservedResponse> {
        let path = Endpoint::CreateProduct.resolve(&[])?;
        self.transport.send_json(Method::POST, &path, body).await
    }

    pub async fn list(&self) -> Result<ObservedResponse> {
        let path = Endpoint::GetAllProducts.resolve(&[])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn list_page(&self, offset: u32, limit: u32) -> Result<ObservedResponse> {
        let (offset, limit) = (offset.to_string(), limit.to_string());
        let path = Endpoint::GetProductsPaginated.resolve(&[&offset, &limit])?;
        self.transport.send(Method::GET, &path).await
    }

    /// List with arbitrary `key=value` filters, e.g. `title=shirt`.
    pub async fn search<I, S>(&self, filters: I) -> Result<ObservedResponse>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = Endpoint::GetAllProducts.resolve(&[])?.with_query(filters);
        self.transport.send(Method::GET, &path).await
    }

    pub async fn get(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::GetProductById.resolve(&[&id])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<ObservedResponse> {
        let path = Endpoint::GetProductBySlug.resolve(&[slug])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn update(
        &self,
        id: impl Display,
        body: &UpdateProductRequest,
    ) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::UpdateProduct.resolve(&[&id])?;
        self.transport.send_json(Method::PUT, &path, body).await
    }

    pub async fn delete(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::DeleteProduct.resolve(&[&id])?;
        self.transport.send(Method::DELETE, &path).await
    }

    pub async fn related(&self, id: impl Display) -> Result<ObservedResponse> {
        let id = id.to_string();
        let path = Endpoint::GetRelatedById.resolve(&[&id])?;
        self.transport.send(Method::GET, &path).await
    }

    pub async fn related_by_slug(&self, slug: &str) -> Result<ObservedResponse> {
        let path = Endpoint::GetRelatedBySlug.resolve(&[slug])?;
        self.transport.send(Method::GET, &path).await
    }
}
