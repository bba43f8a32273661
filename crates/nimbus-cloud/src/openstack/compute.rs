//! OpenStack compute (Nova) node provider

use super::OpenStackClient;
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeState};
use crate::provider::{CreateNodeRequest, NodeProvider, ProviderKind};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "compute";

/// Nova-backed node provider
pub struct OpenStackNodes {
    client: Arc<OpenStackClient>,
}

#[derive(Debug, Deserialize)]
struct ServerEnvelope {
    server: OsServer,
}

#[derive(Debug, Deserialize)]
struct ServerListEnvelope {
    #[serde(default)]
    servers: Vec<OsServer>,
}

#[derive(Debug, Deserialize)]
struct OsServer {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    addresses: HashMap<String, Vec<OsAddress>>,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    flavor: Option<OsRef>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OsAddress {
    addr: String,
}

#[derive(Debug, Deserialize)]
struct OsRef {
    #[serde(default)]
    id: String,
}

impl OpenStackNodes {
    /// Create a provider over an authenticated client
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self { client }
    }

    /// Map a Nova status string to our state
    fn map_status(status: &str) -> NodeState {
        match status {
            "BUILD" | "REBUILD" | "REBOOT" | "HARD_REBOOT" => NodeState::Pending,
            "ACTIVE" => NodeState::Running,
            "SHUTOFF" | "SUSPENDED" | "PAUSED" => NodeState::Stopped,
            "DELETED" | "SOFT_DELETED" => NodeState::Terminated,
            "ERROR" => NodeState::Error,
            _ => NodeState::Unknown,
        }
    }

    fn node_from_server(server: OsServer) -> Node {
        let size = server
            .flavor
            .as_ref()
            .map(|f| f.id.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let mut node = Node::new(NodeId::new(&server.id), &server.name, size);
        node.state = server
            .status
            .as_deref()
            .map(Self::map_status)
            .unwrap_or(NodeState::Unknown);
        node.public_ip = server
            .addresses
            .get("public")
            .and_then(|addrs| addrs.first())
            .map(|a| a.addr.clone());
        node.private_ip = server
            .addresses
            .get("private")
            .and_then(|addrs| addrs.first())
            .map(|a| a.addr.clone());
        node.tags = server.metadata;

        if let Some(created) = server
            .created
            .as_deref()
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        {
            node.created_at = created.with_timezone(&chrono::Utc);
        }

        node
    }
}

#[async_trait]
impl NodeProvider for OpenStackNodes {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Rackspace
    }

    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        info!("Creating server: {}", request.name);

        let image = request
            .image
            .as_deref()
            .ok_or_else(|| Error::config("OpenStack requires an image ref"))?;
        let flavor = request
            .size
            .as_deref()
            .ok_or_else(|| Error::config("OpenStack requires a flavor ref"))?;

        let body = json!({
            "server": {
                "name": &request.name,
                "imageRef": image,
                "flavorRef": flavor,
                "metadata": &request.tags,
            }
        });

        let response = self
            .client
            .request(Method::POST, SERVICE, "/servers", Some(&body), &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "servers.create").await?;

        let envelope: ServerEnvelope = response.json().await?;

        let mut node = Node::new(NodeId::new(&envelope.server.id), &request.name, flavor);
        node.image = Some(image.to_string());
        node.tags = request.tags;

        info!("Server creation started: {}", node.id);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        debug!("Getting server: {}", id);

        let response = self
            .client
            .request(
                Method::GET,
                SERVICE,
                &format!("/servers/{}", id),
                None,
                &[],
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "servers.get").await?;
        let envelope: ServerEnvelope = response.json().await?;

        Ok(Some(Self::node_from_server(envelope.server)))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        debug!("Listing servers");

        let response = self
            .client
            .request(Method::GET, SERVICE, "/servers/detail", None, &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "servers.list").await?;

        let envelope: ServerListEnvelope = response.json().await?;
        Ok(envelope
            .servers
            .into_iter()
            .map(Self::node_from_server)
            .collect())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<()> {
        info!("Deleting server: {}", id);

        let response = self
            .client
            .request(
                Method::DELETE,
                SERVICE,
                &format!("/servers/{}", id),
                None,
                &[],
            )
            .await?;
        OpenStackClient::expect_success(response, "servers.delete").await?;

        info!("Server deletion started: {}", id);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        self.client.endpoint(SERVICE).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_status() {
        assert_eq!(OpenStackNodes::map_status("BUILD"), NodeState::Pending);
        assert_eq!(OpenStackNodes::map_status("ACTIVE"), NodeState::Running);
        assert_eq!(OpenStackNodes::map_status("SHUTOFF"), NodeState::Stopped);
        assert_eq!(OpenStackNodes::map_status("DELETED"), NodeState::Terminated);
        assert_eq!(OpenStackNodes::map_status("ERROR"), NodeState::Error);
        assert_eq!(OpenStackNodes::map_status("MIGRATING"), NodeState::Unknown);
    }

    #[test]
    fn test_server_deserialization() {
        let raw = r#"{
            "server": {
                "id": "9f3a4b2c",
                "name": "web-1",
                "status": "ACTIVE",
                "created": "2024-03-01T10:00:00Z",
                "flavor": { "id": "general1-2" },
                "metadata": { "env": "demo" },
                "addresses": {
                    "public": [ { "addr": "162.13.1.1", "version": 4 } ],
                    "private": [ { "addr": "10.0.0.5", "version": 4 } ]
                }
            }
        }"#;

        let envelope: ServerEnvelope = serde_json::from_str(raw).unwrap();
        let node = OpenStackNodes::node_from_server(envelope.server);

        assert_eq!(node.name, "web-1");
        assert_eq!(node.size, "general1-2");
        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.public_ip.as_deref(), Some("162.13.1.1"));
        assert_eq!(node.private_ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(node.tags.get("env"), Some(&"demo".to_string()));
    }
}
