//! Create a cloud load balancer and wait for it to go active

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::{CreateBalancerRequest, LoadBalancers};
use nimbus_cloud::poll::presets;
use nimbus_demos::{check_outcome, init_tracing, rackspace_client};

#[derive(Parser)]
#[command(name = "create_load_balancer")]
#[command(about = "Create a load balancer over the given backend IPs")]
struct Args {
    /// Balancer name
    name: String,

    /// Listening port
    port: u16,

    /// Backend node IPs
    #[arg(required = true)]
    nodes: Vec<String>,

    /// Rackspace region (e.g. DFW, ORD)
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

    let client = rackspace_client(args.region).await?;
    let balancers = LoadBalancers::new(client);

    let mut request = CreateBalancerRequest::new(&args.name, args.port);
    for node in &args.nodes {
        request = request.with_node(node);
    }

    println!(
        "Creating load balancer {} on port {}...",
        args.name.bright_white(),
        args.port
    );
    let balancer = balancers.create(request).await?;
    println!("  id: {}", balancer.id.to_string().bright_yellow());

    println!("Waiting for the balancer to go active...");
    let outcome = balancers
        .wait_until_active(balancer.id, &presets::balancer_build())
        .await?;
    check_outcome("load balancer", &outcome);

    if let Some(active) = balancers.get(balancer.id).await? {
        for vip in &active.virtual_ips {
            println!("  vip: {} ({})", vip.address.bright_cyan(), vip.ip_type);
        }
    }

    Ok(())
}
