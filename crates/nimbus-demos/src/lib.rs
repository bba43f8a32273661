//! Shared plumbing for the demo binaries

use colored::Colorize;
use nimbus_cloud::{load_credentials, OpenStackClient, ProviderKind};
use nimbus_core::PollOutcome;
use std::sync::Arc;
use tracing::Level;

/// Set up console logging; `verbose` switches INFO to DEBUG
pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Build an authenticated Rackspace/OpenStack client from the environment
pub async fn rackspace_client(region: Option<String>) -> anyhow::Result<Arc<OpenStackClient>> {
    let creds = load_credentials(ProviderKind::Rackspace).await?;
    Ok(Arc::new(OpenStackClient::new(None, creds, region)))
}

/// Print a wait outcome; exit non-zero unless it is a success.
///
/// Failed and TimedOut are ordinary outcomes from the waiter's point of
/// view, but for a linear script they are the end of the road.
pub fn check_outcome<S: std::fmt::Display>(what: &str, outcome: &PollOutcome<S>) {
    match outcome {
        PollOutcome::Success(state) => {
            println!("{} {} is {}", "✓".bright_green(), what, state);
        }
        PollOutcome::Failed(state) => {
            eprintln!("{} {} entered state {}", "✗".bright_red(), what, state);
            std::process::exit(1);
        }
        PollOutcome::NotFound => {
            eprintln!("{} {} disappeared while waiting", "✗".bright_red(), what);
            std::process::exit(1);
        }
        PollOutcome::TimedOut => {
            eprintln!("{} timed out waiting for {}", "✗".bright_red(), what);
            std::process::exit(1);
        }
    }
}
