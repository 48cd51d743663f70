//! ---
//! probe_section: "01-core-functionality"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Key-value configuration provider and typed settings lookups."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use ::config::{Config, Environment, File, FileFormat};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Well-known configuration keys.
pub mod keys {
    pub const BASE_URL: &str = "base.url";
    pub const FALLBACK_BASE_URL: &str = "fallback.url";
    pub const ENVIRONMENT: &str = "env.name";
    pub const CONNECTION_TIMEOUT_MS: &str = "timeout.connection";
    pub const READ_TIMEOUT_MS: &str = "timeout.read";
    pub const MAX_RESPONSE_LATENCY_MS: &str = "response.max.latency.ms";
    pub const LOG_REQUEST: &str = "log.request";
    pub const LOG_RESPONSE: &str = "log.response";
    pub const CLIENT_EMAIL: &str = "client.email";
    pub const CLIENT_PASSWORD: &str = "client.password";
    pub const RETRY_ENABLED: &str = "retry.enabled";
    pub const RETRY_MAX_ATTEMPTS: &str = "retry.max.attempts";
    pub const RETRY_DELAY_MS: &str = "retry.delay.ms";
}

/// Errors raised while loading or reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent or blank.
    #[error("missing configuration key: {0}")]
    Missing(String),
    /// A key is present but cannot be parsed into the requested type.
    #[error("invalid value {value:?} for configuration key {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
    /// None of the candidate files exist.
    #[error("no configuration files found. inspected: {0}")]
    NotFound(String),
    /// The configuration source could not be read or parsed.
    #[error("failed to load configuration from {origin}: {source}")]
    Load {
        origin: String,
        #[source]
        source: ::config::ConfigError,
    },
}

/// External key-value collaborator backing every typed lookup.
pub trait ConfigProvider: Send + Sync + 'static {
    /// Return the raw value stored under `key`, if any.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// File-backed provider layering a TOML document with `APIPROBE_*` environment overrides.
#[derive(Debug, Clone)]
pub struct FileConfig {
    inner: Config,
    source: Option<PathBuf>,
}

impl FileConfig {
    pub const ENV_CONFIG_PATH: &'static str = "APIPROBE_CONFIG";
    pub const ENV_PREFIX: &'static str = "APIPROBE";

    /// Load configuration from disk, respecting the `APIPROBE_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, ConfigError> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                return Self::from_path(env_path.trim());
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                return Self::from_path(candidate);
            }
        }

        Err(ConfigError::NotFound(
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }

    /// Load a single TOML file and overlay environment overrides.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        debug!(config_path = %path.display(), "loading configuration");
        let inner = Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Toml))
            .add_source(Environment::with_prefix(Self::ENV_PREFIX).separator("_"))
            .build()
            .map_err(|source| ConfigError::Load {
                origin: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            inner,
            source: Some(path),
        })
    }

    /// Parse an in-memory TOML document without environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let inner = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .map_err(|source| ConfigError::Load {
                origin: "<inline>".to_owned(),
                source,
            })?;
        Ok(Self {
            inner,
            source: None,
        })
    }

    /// Path the configuration was read from, when file-backed.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl ConfigProvider for FileConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.inner.get_string(key).ok()
    }
}

/// Mutable in-memory provider, primarily for tests and embedding callers.
#[derive(Debug, Default)]
pub struct MapConfig {
    values: RwLock<HashMap<String, String>>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.values.write().remove(key)
    }
}

impl ConfigProvider for MapConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }
}

/// Typed view over a [`ConfigProvider`].
///
/// Every getter reads through to the provider on each call; callers that
/// need a stable view memoize the derived values themselves.
#[derive(Clone)]
pub struct Settings {
    provider: Arc<dyn ConfigProvider>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings").finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(provider: Arc<dyn ConfigProvider>) -> Self {
        Self { provider }
    }

    /// Return a required value; blank strings count as missing.
    pub fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::Missing(key.to_owned()))
    }

    /// Return a value if it is present and non-blank.
    pub fn optional(&self, key: &str) -> Option<String> {
        self.provider
            .lookup(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn parse<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self.require(key)?;
        raw.parse::<T>().map_err(|err| ConfigError::Invalid {
            key: key.to_owned(),
            value: raw.clone(),
            reason: err.to_string(),
        })
    }

    fn parse_bool(&self, key: &str) -> Result<bool, ConfigError> {
        let raw = self.require(key)?;
        match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_owned(),
                value: raw,
                reason: "expected `true` or `false`".to_owned(),
            }),
        }
    }

    fn parse_millis(&self, key: &str) -> Result<Duration, ConfigError> {
        self.parse::<u64>(key).map(Duration::from_millis)
    }

    fn parse_url(&self, key: &str, raw: String) -> Result<Url, ConfigError> {
        Url::parse(&raw).map_err(|err| ConfigError::Invalid {
            key: key.to_owned(),
            value: raw,
            reason: err.to_string(),
        })
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let raw = self.require(keys::BASE_URL)?;
        self.parse_url(keys::BASE_URL, raw)
    }

    /// Secondary base URL; absent is not an error.
    pub fn fallback_base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.optional(keys::FALLBACK_BASE_URL)
            .map(|raw| self.parse_url(keys::FALLBACK_BASE_URL, raw))
            .transpose()
    }

    pub fn environment(&self) -> Result<String, ConfigError> {
        self.require(keys::ENVIRONMENT)
    }

    pub fn connection_timeout(&self) -> Result<Duration, ConfigError> {
        self.parse_millis(keys::CONNECTION_TIMEOUT_MS)
    }

    pub fn read_timeout(&self) -> Result<Duration, ConfigError> {
        self.parse_millis(keys::READ_TIMEOUT_MS)
    }

    pub fn max_response_latency(&self) -> Result<Duration, ConfigError> {
        self.parse_millis(keys::MAX_RESPONSE_LATENCY_MS)
    }

    pub fn request_logging(&self) -> Result<bool, ConfigError> {
        self.parse_bool(keys::LOG_REQUEST)
    }

    pub fn response_logging(&self) -> Result<bool, ConfigError> {
        self.parse_bool(keys::LOG_RESPONSE)
    }

    pub fn client_email(&self) -> Result<String, ConfigError> {
        self.require(keys::CLIENT_EMAIL)
    }

    pub fn client_password(&self) -> Result<String, ConfigError> {
        self.require(keys::CLIENT_PASSWORD)
    }

    pub fn retry_enabled(&self) -> Result<bool, ConfigError> {
        self.parse_bool(keys::RETRY_ENABLED)
    }

    pub fn retry_attempts(&self) -> Result<u32, ConfigError> {
        self.parse(keys::RETRY_MAX_ATTEMPTS)
    }

    pub fn retry_delay(&self) -> Result<Duration, ConfigError> {
        self.parse_millis(keys::RETRY_DELAY_MS)
    }
}
