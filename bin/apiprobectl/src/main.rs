//! ---
//! probe_section: "04-command-line"
//! probe_subsection: "binary"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Control CLI for inspecting the endpoint catalog and probing a live API."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{Context, Result};
use apiprobe_common::{LogFormat, LoggingConfig};
use clap::{Parser, Subcommand, ValueEnum};

mod catalog;
mod probe;

#[derive(Debug, Parser)]
#[command(author, version, about = "apiprobe control utility", long_about = None)]
struct Cli {
    /// Configuration file; falls back to the standard search locations.
    #[arg(long, global = true, value_name = "FILE", env = "APIPROBE_CONFIG")]
    config: Option<PathBuf>,
    /// Stdout log format.
    #[arg(long = "log-format", global = true, value_enum, default_value_t = LogFormatArg::Pretty)]
    log_format: LogFormatArg,
    /// Also write a daily rolling JSON log into this directory.
    #[arg(long = "log-dir", global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every catalog endpoint with its path template.
    Endpoints(catalog::EndpointsCommand),
    /// Print the path an endpoint resolves to.
    Resolve(catalog::ResolveCommand),
    /// Issue a GET against a catalog endpoint and verify the outcome.
    Probe(probe::ProbeCommand),
    /// Log in with the configured credential and report token expiry.
    Login,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::StructuredJson,
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    if cli.log_dir.is_none() && matches!(cli.log_format, LogFormatArg::Pretty) {
        apiprobe_common::init();
        return Ok(());
    }
    let config = LoggingConfig {
        format: cli.log_format.into(),
        directory: cli.log_dir.clone(),
        file_prefix: None,
    };
    apiprobe_common::init_tracing("apiprobectl", &config).context("failed to initialise logging")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;
    match cli.command {
        Commands::Endpoints(cmd) => catalog::list(cmd),
        Commands::Resolve(cmd) => catalog::resolve(cmd),
        Commands::Probe(cmd) => probe::run(cli.config.as_deref(), cmd).await,
        Commands::Login => probe::login(cli.config.as_deref()).await,
    }
}
