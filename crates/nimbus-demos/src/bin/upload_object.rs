//! Upload a file to object storage and list the container

use clap::Parser;
use colored::Colorize;
use nimbus_cloud::openstack::SwiftStorage;
use nimbus_demos::{init_tracing, rackspace_client};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "upload_object")]
#[command(about = "Upload a file into a storage container")]
struct Args {
    /// Container name (created if absent)
    container: String,

    /// File to upload
    file: PathBuf,

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

    let object_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("file path has no usable name"))?
        .to_string();

    let bytes = tokio::fs::read(&args.file).await?;
    println!(
        "Uploading {} ({} bytes) to container {}...",
        object_name.bright_white(),
        bytes.len(),
        args.container.bright_white()
    );

    let client = rackspace_client(args.region).await?;
    let storage = SwiftStorage::new(client);

    storage.ensure_container(&args.container).await?;
    storage
        .upload_object(&args.container, &object_name, bytes, None)
        .await?;
    println!("{} uploaded", "✓".bright_green());

    match storage.list_objects(&args.container).await? {
        Some(objects) => {
            println!("Container {} now holds:", args.container);
            for object in objects {
                println!("  {}  {} bytes", object.name.bright_white(), object.bytes);
            }
        }
        None => println!("Container {} vanished?", args.container),
    }

    Ok(())
}
