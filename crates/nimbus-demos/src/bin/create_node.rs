//! Create a compute node and wait for it to boot

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::poll::{presets, wait_for_node_state};
use nimbus_cloud::{build_provider, CreateNodeRequest, NodeState, ProviderConfig, ProviderKind};
use nimbus_demos::{check_outcome, init_tracing};

#[derive(Parser)]
#[command(name = "create_node")]
#[command(about = "Create a node and wait until it is running")]
struct Args {
    /// Provider to use (aws, gce, rackspace, dimensiondata, local)
    provider: String,

    /// Node name
    name: String,

    /// Image to boot from
    #[arg(long)]
    image: Option<String>,

    /// Size/flavor
    #[arg(long)]
    size: Option<String>,

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
        config.region = args.region.clone();
    }

    let provider = build_provider(&config).await?;
    println!("Creating node {} on {}...", args.name.bright_white(), kind);

    let mut request = CreateNodeRequest::new(&args.name).with_tag("created-by", "nimbus-demo");
    if let Some(image) = &args.image {
        request = request.with_image(image);
    }
    if let Some(size) = &args.size {
        request = request.with_size(size);
    }
    if let Some(region) = &args.region {
        request = request.with_region(region);
    }

    let node = provider.create_node(request).await?;
    println!("  id: {}", node.id.to_string().bright_yellow());

    println!("Waiting for node to boot...");
    let outcome =
        wait_for_node_state(provider.as_ref(), &node.id, NodeState::Running, &presets::node_boot())
            .await?;
    check_outcome("node", &outcome);

    if let Some(booted) = provider.get_node(&node.id).await? {
        println!("  name:       {}", booted.name);
        println!("  size:       {}", booted.size);
        if let Some(ip) = &booted.public_ip {
            println!("  public ip:  {}", ip.bright_cyan());
        }
        if let Some(ip) = &booted.private_ip {
            println!("  private ip: {}", ip);
        }
    }

    Ok(())
}
