//! Create an autoscaling group, scale it up, then tear it down
//!
//! This is the slowest demo: two capacity waits and a teardown wait.
//! Ctrl-C abandons the current wait and exits.

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::{AutoScale, GroupConfig};
use nimbus_cloud::poll::presets;
use nimbus_core::PollOutcome;
use nimbus_demos::{check_outcome, init_tracing, rackspace_client};

#[derive(Parser)]
#[command(name = "autoscale_group")]
#[command(about = "Exercise an autoscaling group end to end")]
struct Args {
    /// Group name
    name: String,

    /// Minimum number of servers
    min: u32,

    /// Maximum number of servers
    max: u32,

    /// Image for launched servers
    #[arg(long)]
    image: String,

    /// Flavor for launched servers
    #[arg(long, default_value = "general1-1")]
    flavor: String,

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
    let autoscale = AutoScale::new(client);

    let config = GroupConfig::new(&args.name, args.min, args.max)
        .with_flavor(&args.flavor)
        .with_image(&args.image);

    println!(
        "Creating scaling group {} ({}..{} servers)...",
        args.name.bright_white(),
        args.min,
        args.max
    );
    let group = autoscale.create_group(config).await?;
    println!("  id: {}", group.id.bright_yellow());

    println!("Waiting for the group to reach {} active server(s)...", args.min);
    let outcome = tokio::select! {
        outcome = autoscale.wait_for_capacity(&group.id, args.min, &presets::autoscale_converge()) => outcome?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("interrupted; leaving group {} behind", group.id);
            std::process::exit(130);
        }
    };
    check_outcome("scaling group", &outcome);

    if let Some(policy) = group.policies.first() {
        println!("Executing policy {} ({})...", policy.id, policy.name);
        autoscale.execute_policy(&group.id, &policy.id).await?;

        let target = args.min + 1;
        println!("Waiting for {} active server(s)...", target);
        let outcome = autoscale
            .wait_for_capacity(&group.id, target, &presets::autoscale_converge())
            .await?;
        check_outcome("scaling group", &outcome);
    }

    println!("Tearing the group down...");
    autoscale.delete_group(&group.id).await?;
    let outcome = autoscale
        .wait_until_gone(&group.id, &presets::autoscale_converge())
        .await?;
    match outcome {
        // Absence is what a finished teardown looks like.
        PollOutcome::NotFound => println!("{} group {} deleted", "✓".bright_green(), group.id),
        other => check_outcome("group teardown", &other),
    }

    Ok(())
}
