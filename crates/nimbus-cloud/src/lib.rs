//! # Nimbus Cloud
//!
//! Multi-cloud provisioning abstraction. One [`provider::NodeProvider`]
//! trait with AWS, Google Compute Engine, Rackspace/OpenStack, Dimension
//! Data, and in-memory implementations, the OpenStack resource services
//! (storage, load balancers, DNS, databases, queues, autoscale), and the
//! wait helpers that bridge them to [`nimbus_core::wait`].

pub mod aws;
pub mod config;
pub mod credentials;
pub mod dimensiondata;
pub mod error;
pub mod gce;
pub mod local;
pub mod node;
pub mod openstack;
pub mod poll;
pub mod provider;

pub use aws::AwsNodes;
pub use config::{build_provider, ProviderConfig};
pub use credentials::{load_credentials, Credentials};
pub use dimensiondata::DimensionDataNodes;
pub use error::{Error, Result};
pub use gce::GceNodes;
pub use local::LocalProvider;
pub use node::{Node, NodeId, NodeState};
pub use openstack::{OpenStackClient, OpenStackNodes};
pub use provider::{CreateNodeRequest, NodeProvider, ProviderKind};

/// Module version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
