//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Error taxonomy shared by harness operations."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use apiprobe_common::ConfigError;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::exchange::AuthError;
use crate::expectation::ExpectationError;

/// Umbrella error for harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Wrong parameter count or unknown endpoint; never retried.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Missing or malformed setting; fatal at first use.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The observed response did not match the expected outcome.
    #[error(transparent)]
    Expectation(#[from] ExpectationError),
    /// Connection, timeout or protocol failure talking to the API.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("invalid request url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HarnessError {
    /// Whether a caller-applied retry policy may re-attempt the operation.
    pub fn is_transient(&self) -> bool {
        match self {
            HarnessError::Transport(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
