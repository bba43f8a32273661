//! In-memory node provider (for testing)
//!
//! Nodes advance deterministically: each observation of a booting node
//! counts down towards `Running`, and each observation of a deleting node
//! counts down towards absence. Demos and tests drive the waiter against
//! this provider without touching a real cloud.

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeState};
use crate::provider::{CreateNodeRequest, NodeProvider, ProviderKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

struct LocalNode {
    node: Node,
    boot_remaining: u32,
    delete_remaining: Option<u32>,
    fail_boot: bool,
}

/// Deterministic in-memory provider
#[derive(Clone)]
pub struct LocalProvider {
    nodes: Arc<RwLock<HashMap<NodeId, LocalNode>>>,
    boot_ticks: u32,
    delete_ticks: u32,
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalProvider {
    /// Create a provider where nodes boot and delete in two observations
    pub fn new() -> Self {
        Self {
            nodes: Arc::new(RwLock::new(HashMap::new())),
            boot_ticks: 2,
            delete_ticks: 2,
        }
    }

    /// Set how many observations a node takes to boot
    pub fn with_boot_ticks(mut self, ticks: u32) -> Self {
        self.boot_ticks = ticks;
        self
    }

    /// Set how many observations a delete takes to finish
    pub fn with_delete_ticks(mut self, ticks: u32) -> Self {
        self.delete_ticks = ticks;
        self
    }
}

#[async_trait]
impl NodeProvider for LocalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        info!("Creating local node: {}", request.name);

        let mut node = Node::new(
            NodeId::random(),
            &request.name,
            request.size.clone().unwrap_or_else(|| "local".to_string()),
        );
        node.image = request.image.clone();
        node.region = request.region.clone().unwrap_or_else(|| "local".to_string());
        node.private_ip = Some("127.0.0.1".to_string());

        // A node tagged fail=boot lands in Error instead of Running.
        let fail_boot = request.tags.get("fail").map(String::as_str) == Some("boot");
        node.tags = request.tags;

        let entry = LocalNode {
            node: node.clone(),
            boot_remaining: self.boot_ticks,
            delete_remaining: None,
            fail_boot,
        };

        self.nodes.write().await.insert(node.id.clone(), entry);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        let mut nodes = self.nodes.write().await;

        let Some(entry) = nodes.get_mut(id) else {
            return Ok(None);
        };

        if let Some(remaining) = entry.delete_remaining {
            if remaining == 0 {
                debug!("Local node {} fully deleted", id);
                nodes.remove(id);
                return Ok(None);
            }
            entry.delete_remaining = Some(remaining - 1);
            entry.node.state = NodeState::Terminating;
        } else if entry.boot_remaining > 0 {
            entry.boot_remaining -= 1;
            if entry.boot_remaining == 0 {
                entry.node.state = if entry.fail_boot {
                    NodeState::Error
                } else {
                    NodeState::Running
                };
            } else {
                entry.node.state = NodeState::Pending;
            }
        }

        Ok(Some(entry.node.clone()))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self.nodes.read().await;
        Ok(nodes.values().map(|entry| entry.node.clone()).collect())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<()> {
        info!("Deleting local node: {}", id);

        let mut nodes = self.nodes.write().await;
        let entry = nodes
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("node {}", id)))?;

        entry.delete_remaining = Some(self.delete_ticks);
        entry.node.state = NodeState::Terminating;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_node_boots_over_observations() {
        let provider = LocalProvider::new().with_boot_ticks(2);
        let node = provider
            .create_node(CreateNodeRequest::new("web-1"))
            .await
            .unwrap();

        let first = provider.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(first.state, NodeState::Pending);

        let second = provider.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(second.state, NodeState::Running);
    }

    #[tokio::test]
    async fn test_local_node_delete_countdown() {
        let provider = LocalProvider::new().with_boot_ticks(1).with_delete_ticks(1);
        let node = provider
            .create_node(CreateNodeRequest::new("web-1"))
            .await
            .unwrap();

        provider.delete_node(&node.id).await.unwrap();

        let observed = provider.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(observed.state, NodeState::Terminating);

        assert!(provider.get_node(&node.id).await.unwrap().is_none());
        assert!(provider.list_nodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_node_failed_boot() {
        let provider = LocalProvider::new().with_boot_ticks(1);
        let node = provider
            .create_node(CreateNodeRequest::new("bad").with_tag("fail", "boot"))
            .await
            .unwrap();

        let observed = provider.get_node(&node.id).await.unwrap().unwrap();
        assert_eq!(observed.state, NodeState::Error);
    }

    #[tokio::test]
    async fn test_delete_unknown_node() {
        let provider = LocalProvider::new();
        let err = provider.delete_node(&NodeId::new("missing")).await;
        assert!(err.is_err());
    }
}
