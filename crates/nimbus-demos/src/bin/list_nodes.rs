//! List compute nodes on a provider

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::{build_provider, ProviderConfig, ProviderKind};
use nimbus_demos::init_tracing;

#[derive(Parser)]
#[command(name = "list_nodes")]
#[command(about = "List nodes and their states")]
struct Args {
    /// Provider to use (aws, gce, rackspace, dimensiondata, local)
    provider: String,

    /// Region/zone
    #[arg(long)]
    region: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let kind: ProviderKind = args.provider.parse()?;
    let mut config = ProviderConfig::load_default(kind).await?;
    if args.region.is_some() {
        config.region = args.region;
    }

    let provider = build_provider(&config).await?;
    let nodes = provider.list_nodes().await?;

    if nodes.is_empty() {
        println!("No nodes on {}", kind);
        return Ok(());
    }

    println!("{} node(s) on {}:", nodes.len(), kind);
    for node in nodes {
        println!(
            "  {}  {}  {}  {}",
            node.id.to_string().bright_yellow(),
            node.name.bright_white(),
            node.size,
            node.state.to_string().bright_cyan(),
        );
    }

    Ok(())
}
