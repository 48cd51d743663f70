//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Harness core: endpoint catalog, specification cache, token lifecycle."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
//! Infrastructure for exercising a remote REST API under test.
//!
//! A scenario resolves a path from the [`catalog`], takes a request baseline
//! from the [`SpecCache`] (optionally authorized through the
//! [`TokenManager`]), dispatches the call and verifies the observed response
//! against a [`ResponseExpectation`] from the same cache.

pub mod baseline;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod exchange;
pub mod expectation;
pub mod harness;
pub mod retry;
pub mod token;

pub use baseline::RequestBaseline;
pub use cache::{ContextId, SpecCache};
pub use catalog::{CatalogError, Endpoint, EndpointCatalog, EndpointDescriptor, ResolvedPath};
pub use error::{HarnessError, Result};
pub use exchange::{AuthError, AuthExchange, HttpAuthExchange, TokenPair};
pub use expectation::{ExpectationError, ObservedResponse, ResponseExpectation};
pub use harness::Harness;
pub use retry::RetryPolicy;
pub use token::{Credential, TokenManager, TokenState};

/// Re-exported so callers can build requests without a direct dependency.
pub use reqwest::{Method, StatusCode};
