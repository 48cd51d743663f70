//! ---
//! probe_section: "01-core-functionality"
//! probe_subsection: "module"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Shared primitives for the apiprobe harness."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
//! Shared primitives for the apiprobe workspace.
//! This crate exposes the configuration provider seam and the tracing
//! bootstrap consumed by the harness, the resource clients and the CLI.

pub mod config;
pub mod logging;

pub use crate::config::{keys, ConfigError, ConfigProvider, FileConfig, MapConfig, Settings};
pub use crate::logging::{init, init_tracing, LogFormat, LoggingConfig};
