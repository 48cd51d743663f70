//! ---
//! probe_section: "02-harness-core"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Configuration-driven retry policy applied around whole requests."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::future::Future;
use std::time::Duration;

use apiprobe_common::{ConfigError, Settings};
use tokio::time::sleep;
use tracing::warn;

use crate::error::Result;

/// Attempts and fixed delay for caller-side retries.
///
/// Only transient transport failures are retried. Observed HTTP outcomes,
/// including 5xx responses, are results and are returned as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    enabled: bool,
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(enabled: bool, max_attempts: u32, delay: Duration) -> Self {
        Self {
            enabled,
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, 1, Duration::ZERO)
    }

    /// Read `retry.*`; attempts and delay are only required when enabled.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        if !settings.retry_enabled()? {
            return Ok(Self::disabled());
        }
        Ok(Self::new(
            true,
            settings.retry_attempts()?,
            settings.retry_delay()?,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn attempts(&self) -> u32 {
        if self.enabled {
            self.max_attempts
        } else {
            1
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `operation`, passing the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && err.is_transient() => {
                    warn!(attempt, attempts, error = %err, "transient failure; retrying");
                    sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}
