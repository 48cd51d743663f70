//! ---
//! probe_section: "04-command-line"
//! probe_subsection: "binary"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Live probe and login subcommands."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use apiprobe_common::FileConfig;
use apiprobe_harness::{ContextId, Harness};
use clap::Args;
use tracing::{info, warn};

use crate::catalog::{resolve_path, ResolveCommand};

const CONFIG_CANDIDATES: &[&str] = &["apiprobe.toml", "configs/apiprobe.toml"];

#[derive(Debug, Args)]
pub struct ProbeCommand {
    #[command(flatten)]
    target: ResolveCommand,
    /// Expected HTTP status code.
    #[arg(long, value_name = "STATUS", default_value_t = 200)]
    expect: u16,
    /// Send the managed bearer token.
    #[arg(long)]
    auth: bool,
}

fn harness(config: Option<&Path>) -> Result<Harness> {
    let file = match config {
        Some(path) => FileConfig::from_path(path)?,
        None => FileConfig::load(CONFIG_CANDIDATES)?,
    };
    if let Some(source) = file.source() {
        info!(config = %source.display(), "configuration loaded");
    }
    let harness = Harness::from_provider(Arc::new(file))?;
    info!(environment = %harness.settings().environment()?, "harness configured");
    Ok(harness)
}

pub async fn run(config: Option<&Path>, cmd: ProbeCommand) -> Result<()> {
    let harness = harness(config)?;
    let path = resolve_path(&cmd.target)?;
    let context = ContextId::next();
    let cache = harness.cache();

    let baseline = if cmd.auth {
        cache.authorized_baseline(context).await?
    } else {
        cache.request_baseline(context)?.as_ref().clone()
    };
    let expectation = cache.expectation(cmd.expect)?;
    let response = match baseline.dispatch(baseline.get(&path)?).await {
        Ok(response) => response,
        Err(err) if err.is_transient() => match harness.fallback_for(&baseline)? {
            Some(fallback) => {
                warn!(error = %err, base = %fallback.base_uri(), "primary unreachable; using fallback");
                fallback
                    .dispatch(fallback.get(&path)?)
                    .await
                    .with_context(|| format!("GET {path} failed on fallback"))?
            }
            None => return Err(err).with_context(|| format!("GET {path} failed")),
        },
        Err(err) => return Err(err).with_context(|| format!("GET {path} failed")),
    };

    println!(
        "{} {} in {} ms",
        response.status(),
        response.url(),
        response.elapsed().as_millis()
    );
    response.expect(&expectation)?;
    println!("expectation met");
    Ok(())
}

pub async fn login(config: Option<&Path>) -> Result<()> {
    let harness = harness(config)?;
    harness.tokens().get_access_token().await?;
    let state = harness
        .tokens()
        .snapshot()
        .await
        .context("login returned no token state")?;
    match state.expires_at() {
        Some(at) => println!("authenticated; access token expires at {}", at.to_rfc3339()),
        None => println!("authenticated; access token carries no expiry"),
    }
    Ok(())
}
