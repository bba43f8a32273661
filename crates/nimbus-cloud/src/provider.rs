//! Node provider trait and abstractions

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Amazon Web Services (EC2)
    Aws,
    /// Google Compute Engine
    Gce,
    /// Rackspace / OpenStack
    Rackspace,
    /// Dimension Data CloudControl
    DimensionData,
    /// In-memory provider (for testing)
    Local,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Aws => write!(f, "aws"),
            ProviderKind::Gce => write!(f, "gce"),
            ProviderKind::Rackspace => write!(f, "rackspace"),
            ProviderKind::DimensionData => write!(f, "dimensiondata"),
            ProviderKind::Local => write!(f, "local"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "aws" | "ec2" => Ok(ProviderKind::Aws),
            "gce" | "gcp" | "google" => Ok(ProviderKind::Gce),
            "rackspace" | "openstack" => Ok(ProviderKind::Rackspace),
            "dimensiondata" | "dd" => Ok(ProviderKind::DimensionData),
            "local" => Ok(ProviderKind::Local),
            other => Err(Error::config(format!("unknown provider: {}", other))),
        }
    }
}

/// Node creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNodeRequest {
    /// Node name
    pub name: String,

    /// Image to boot from (provider-specific identifier)
    pub image: Option<String>,

    /// Size/flavor (provider-specific identifier)
    pub size: Option<String>,

    /// Region/zone preference
    pub region: Option<String>,

    /// Tags/labels
    pub tags: HashMap<String, String>,
}

impl CreateNodeRequest {
    /// Create new node request
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            size: None,
            region: None,
            tags: HashMap::new(),
        }
    }

    /// Set image
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set size
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    /// Set region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Add tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Compute node provider.
///
/// All providers must implement this trait to be reachable from the demo
/// programs and the wait helpers.
#[async_trait]
pub trait NodeProvider: Send + Sync {
    /// Get provider kind
    fn kind(&self) -> ProviderKind;

    /// Create a new node
    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node>;

    /// Get node by ID; `None` when the provider no longer knows it
    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>>;

    /// List all nodes
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// Delete a node
    async fn delete_node(&self, id: &NodeId) -> Result<()>;

    /// Observe just the node's current state
    async fn node_state(&self, id: &NodeId) -> Result<Option<NodeState>> {
        Ok(self.get_node(id).await?.map(|node| node.state))
    }

    /// Check if provider is reachable/configured
    async fn is_available(&self) -> bool;
}
