//! Create a managed database instance and wait for it to go active

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::CloudDatabases;
use nimbus_cloud::poll::presets;
use nimbus_demos::{check_outcome, init_tracing, rackspace_client};

#[derive(Parser)]
#[command(name = "create_database")]
#[command(about = "Create a database instance with one database on it")]
struct Args {
    /// Instance name
    name: String,

    /// Flavor reference
    flavor: String,

    /// Database name to create on the instance
    database: String,

    /// Volume size in GB
    #[arg(long, default_value_t = 1)]
    volume: u32,

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
    let databases = CloudDatabases::new(client);

    println!(
        "Creating database instance {} (flavor {}, {} GB)...",
        args.name.bright_white(),
        args.flavor,
        args.volume
    );
    let instance = databases
        .create_instance(&args.name, &args.flavor, args.volume, &args.database)
        .await?;
    println!("  id: {}", instance.id.bright_yellow());

    println!("Waiting for the instance to go active (this is slow)...");
    let outcome = databases
        .wait_until_active(&instance.id, &presets::database_build())
        .await?;
    check_outcome("database instance", &outcome);

    if let Some(active) = databases.get_instance(&instance.id).await? {
        if let Some(hostname) = &active.hostname {
            println!("  hostname: {}", hostname.bright_cyan());
        }
    }

    Ok(())
}
