//! Delete a compute node and wait until it is gone

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::poll::{presets, wait_until_node_gone};
use nimbus_cloud::{build_provider, NodeId, ProviderConfig, ProviderKind};
use nimbus_demos::{check_outcome, init_tracing};

#[derive(Parser)]
#[command(name = "delete_node")]
#[command(about = "Delete a node and wait until the provider forgets it")]
struct Args {
    /// Provider to use (aws, gce, rackspace, dimensiondata, local)
    provider: String,

    /// Node id
    node_id: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let kind: ProviderKind = args.provider.parse()?;
    let config = ProviderConfig::load_default(kind).await?;
    let provider = build_provider(&config).await?;

    let id = NodeId::new(&args.node_id);
    println!("Deleting node {} on {}...", id.to_string().bright_yellow(), kind);
    provider.delete_node(&id).await?;

    println!("Waiting for the node to disappear...");
    let outcome = wait_until_node_gone(provider.as_ref(), &id, &presets::node_delete()).await?;
    check_outcome("node", &outcome);

    println!("{} node {} deleted", "✓".bright_green(), id);
    Ok(())
}
