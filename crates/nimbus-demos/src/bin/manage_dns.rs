//! Create a DNS zone and an A record, polling the async jobs

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::CloudDns;
use nimbus_cloud::poll::presets;
use nimbus_demos::{check_outcome, init_tracing, rackspace_client};

#[derive(Parser)]
#[command(name = "manage_dns")]
#[command(about = "Ensure a zone exists and point an A record at an IP")]
struct Args {
    /// Zone name (e.g. example.com)
    zone: String,

    /// Record name (e.g. www.example.com)
    record: String,

    /// IPv4 address for the A record
    ip: String,

    /// Contact email for zone creation
    #[arg(long, default_value = "hostmaster@example.com")]
    email: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let client = rackspace_client(None).await?;
    let dns = CloudDns::new(client);

    // DNS writes are async jobs; each one is polled to completion before
    // the next step depends on it.
    let zone = match dns.find_zone(&args.zone).await? {
        Some(zone) => {
            println!("Zone {} already exists (id {})", args.zone, zone.id);
            zone
        }
        None => {
            println!("Creating zone {}...", args.zone.bright_white());
            let job = dns.create_zone(&args.zone, &args.email).await?;
            let outcome = dns.wait_for_job(&job.job_id, &presets::dns_job()).await?;
            check_outcome("zone creation job", &outcome);

            dns.find_zone(&args.zone)
                .await?
                .ok_or_else(|| anyhow::anyhow!("zone not visible after creation"))?
        }
    };

    println!(
        "Adding A record {} -> {}...",
        args.record.bright_white(),
        args.ip.bright_cyan()
    );
    let job = dns
        .add_record(zone.id, &args.record, "A", &args.ip, 300)
        .await?;
    let outcome = dns.wait_for_job(&job.job_id, &presets::dns_job()).await?;
    check_outcome("record creation job", &outcome);

    println!("Records in {}:", args.zone);
    for record in dns.list_records(zone.id).await? {
        println!(
            "  {}  {}  {}  ttl {}",
            record.record_type, record.name, record.data, record.ttl
        );
    }

    Ok(())
}
