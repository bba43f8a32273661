//! Post a message to a queue, claim it back, acknowledge it

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::CloudQueues;
use nimbus_demos::{init_tracing, rackspace_client};
use serde_json::json;

#[derive(Parser)]
#[command(name = "queue_roundtrip")]
#[command(about = "Create a queue, post a message, claim it, ack it")]
struct Args {
    /// Queue name
    queue: String,

    /// Message text to post
    message: String,

    /// Keep the queue afterwards instead of deleting it
    #[arg(long)]
    keep: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let client = rackspace_client(None).await?;
    let queues = CloudQueues::new(client);

    println!("Creating queue {}...", args.queue.bright_white());
    queues.create_queue(&args.queue).await?;

    println!("Posting message...");
    queues
        .post_message(&args.queue, json!({ "text": args.message }), 300)
        .await?;

    println!("Claiming messages...");
    let claimed = queues.claim_messages(&args.queue, 60, 60, 10).await?;
    if claimed.is_empty() {
        eprintln!("{} nothing to claim - message not visible yet", "✗".bright_red());
        std::process::exit(1);
    }

    for message in &claimed {
        println!(
            "  {} (age {}s): {}",
            "message".bright_white(),
            message.age,
            message.body
        );
        queues.delete_message(message).await?;
    }
    println!("{} {} message(s) acknowledged", "✓".bright_green(), claimed.len());

    if !args.keep {
        queues.delete_queue(&args.queue).await?;
        println!("Queue {} deleted", args.queue);
    }

    Ok(())
}
