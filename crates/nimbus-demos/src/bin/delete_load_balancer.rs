//! Delete a load balancer and wait until it is gone

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::LoadBalancers;
use nimbus_cloud::poll::presets;
use nimbus_demos::{check_outcome, init_tracing, rackspace_client};

#[derive(Parser)]
#[command(name = "delete_load_balancer")]
#[command(about = "Delete a load balancer and wait for the teardown")]
struct Args {
    /// Balancer id
    id: u64,

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

    println!("Deleting load balancer {}...", args.id.to_string().bright_yellow());
    balancers.delete(args.id).await?;

    println!("Waiting for the teardown to finish...");
    let outcome = balancers
        .wait_until_gone(args.id, &presets::balancer_build())
        .await?;
    check_outcome("load balancer", &outcome);

    Ok(())
}
