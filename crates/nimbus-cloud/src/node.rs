//! Compute node model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Unique node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Create from string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate random ID
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Node lifecycle state as reported by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Node is being created
    Pending,
    /// Node is up and reachable
    Running,
    /// Node is shutting down
    Stopping,
    /// Node is stopped
    Stopped,
    /// Node is being deleted
    Terminating,
    /// Node has been deleted
    Terminated,
    /// Node is in an error state
    Error,
    /// Provider reported a state this library does not model
    Unknown,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Pending => write!(f, "pending"),
            NodeState::Running => write!(f, "running"),
            NodeState::Stopping => write!(f, "stopping"),
            NodeState::Stopped => write!(f, "stopped"),
            NodeState::Terminating => write!(f, "terminating"),
            NodeState::Terminated => write!(f, "terminated"),
            NodeState::Error => write!(f, "error"),
            NodeState::Unknown => write!(f, "unknown"),
        }
    }
}

/// A compute node on some provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID
    pub id: NodeId,

    /// Node name
    pub name: String,

    /// Provider-specific size (e.g. "t3.medium", "n1-standard-2")
    pub size: String,

    /// Image the node was booted from
    pub image: Option<String>,

    /// Current state
    pub state: NodeState,

    /// Public IP address
    pub public_ip: Option<String>,

    /// Private IP address
    pub private_ip: Option<String>,

    /// Region/zone
    pub region: String,

    /// Tags/labels
    pub tags: HashMap<String, String>,

    /// Creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Provider-specific metadata
    pub metadata: HashMap<String, String>,
}

impl Node {
    /// Create new node record
    pub fn new(id: NodeId, name: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            size: size.into(),
            image: None,
            state: NodeState::Pending,
            public_ip: None,
            private_ip: None,
            region: String::new(),
            tags: HashMap::new(),
            created_at: chrono::Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Check if node is running
    pub fn is_running(&self) -> bool {
        self.state == NodeState::Running
    }

    /// Check if node has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, NodeState::Terminated | NodeState::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new("i-1234567890abcdef0");
        assert_eq!(id.as_str(), "i-1234567890abcdef0");

        let random_id = NodeId::random();
        assert!(!random_id.as_str().is_empty());
    }

    #[test]
    fn test_node_state_display() {
        assert_eq!(NodeState::Running.to_string(), "running");
        assert_eq!(NodeState::Terminating.to_string(), "terminating");
    }

    #[test]
    fn test_node() {
        let node = Node::new(NodeId::new("n-test"), "web-1", "t3.medium");

        assert_eq!(node.name, "web-1");
        assert_eq!(node.state, NodeState::Pending);
        assert!(!node.is_running());
        assert!(!node.is_terminal());
    }
}
