//! ---
//! probe_section: "04-command-line"
//! probe_subsection: "binary"
//! probe_type: "source"
//! probe_scope: "code"
//! probe_description: "Offline catalog subcommands."
//! probe_version: "v0.1.0"
//! probe_owner: "tbd"
//! ---
use anyhow::Result;
use apiprobe_harness::EndpointCatalog;
use clap::Args;
use serde_json::json;

#[derive(Debug, Args)]
pub struct EndpointsCommand {
    /// Emit a JSON array instead of aligned text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Endpoint identifier, e.g. GET_PRODUCT_BY_ID.
    #[arg(value_name = "ID")]
    pub endpoint: String,
    /// Positional values for the template placeholders, in order.
    #[arg(value_name = "PARAMS")]
    pub params: Vec<String>,
    /// Query pair appended after resolution; repeatable.
    #[arg(long = "query", value_name = "KEY=VALUE")]
    pub query: Vec<String>,
}

pub fn list(cmd: EndpointsCommand) -> Result<()> {
    let catalog = EndpointCatalog::standard();
    if cmd.json {
        let entries: Vec<_> = catalog
            .iter()
            .map(|d| json!({ "id": d.id(), "template": d.template() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    let width = catalog.iter().map(|d| d.id().len()).max().unwrap_or(0);
    for descriptor in catalog.iter() {
        println!("{:<width$}  {}", descriptor.id(), descriptor.template());
    }
    Ok(())
}

pub fn resolve(cmd: ResolveCommand) -> Result<()> {
    println!("{}", resolve_path(&cmd)?);
    Ok(())
}

/// Strict resolution followed by the optional query suffix.
pub fn resolve_path(cmd: &ResolveCommand) -> Result<String> {
    let params: Vec<&str> = cmd.params.iter().map(String::as_str).collect();
    let path = EndpointCatalog::standard()
        .resolve(&cmd.endpoint, &params)?
        .with_query(&cmd.query);
    Ok(path.into_string())
}
