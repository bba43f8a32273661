//! Google Compute Engine node provider
//!
//! Talks to the Compute Engine v1 REST API directly with a bearer token.
//! GCE addresses instances by name within a zone, so [`NodeId`] values from
//! this provider are instance names.

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeState};
use crate::provider::{CreateNodeRequest, NodeProvider, ProviderKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const API_BASE: &str = "https://compute.googleapis.com/compute/v1";

const DEFAULT_IMAGE: &str = "projects/ubuntu-os-cloud/global/images/family/ubuntu-2204-lts";

const DEFAULT_SIZE: &str = "n1-standard-2";

/// GCE-backed node provider
pub struct GceNodes {
    project: String,
    zone: String,
    token: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GceInstance {
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "machineType")]
    machine_type: Option<String>,
    #[serde(default, rename = "networkInterfaces")]
    network_interfaces: Vec<GceNetworkInterface>,
    #[serde(default, rename = "creationTimestamp")]
    creation_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GceNetworkInterface {
    #[serde(default, rename = "networkIP")]
    network_ip: Option<String>,
    #[serde(default, rename = "accessConfigs")]
    access_configs: Vec<GceAccessConfig>,
}

#[derive(Debug, Deserialize)]
struct GceAccessConfig {
    #[serde(default, rename = "natIP")]
    nat_ip: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GceInstanceList {
    #[serde(default)]
    items: Vec<GceInstance>,
}

impl GceNodes {
    /// Create a provider for a project/zone with a bearer token
    pub fn new(
        project: impl Into<String>,
        zone: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            zone: zone.into(),
            token: token.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn instances_url(&self) -> String {
        format!(
            "{}/projects/{}/zones/{}/instances",
            API_BASE, self.project, self.zone
        )
    }

    /// Map a GCE status string to our state
    fn map_status(status: &str) -> NodeState {
        match status {
            "PROVISIONING" | "STAGING" => NodeState::Pending,
            "RUNNING" => NodeState::Running,
            "STOPPING" | "SUSPENDING" => NodeState::Stopping,
            // GCE reports a stopped instance as TERMINATED; it still exists.
            "TERMINATED" | "SUSPENDED" => NodeState::Stopped,
            _ => NodeState::Unknown,
        }
    }

    fn node_from_instance(&self, inst: GceInstance) -> Node {
        let size = inst
            .machine_type
            .as_deref()
            .and_then(|url| url.rsplit('/').next())
            .unwrap_or("unknown")
            .to_string();

        let mut node = Node::new(NodeId::new(&inst.name), &inst.name, size);
        node.region = self.zone.clone();
        node.state = inst
            .status
            .as_deref()
            .map(Self::map_status)
            .unwrap_or(NodeState::Unknown);

        if let Some(iface) = inst.network_interfaces.first() {
            node.private_ip = iface.network_ip.clone();
            node.public_ip = iface
                .access_configs
                .first()
                .and_then(|cfg| cfg.nat_ip.clone());
        }

        if let Some(created) = inst
            .creation_timestamp
            .as_deref()
            .and_then(|ts| chrono::DateTime::parse_from_rfc3339(ts).ok())
        {
            node.created_at = created.with_timezone(&chrono::Utc);
        }

        node
    }

    async fn check(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::api(
            ProviderKind::Gce,
            format!("{}: {} {}", context, status, body),
        ))
    }
}

#[async_trait]
impl NodeProvider for GceNodes {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gce
    }

    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        info!("Creating GCE instance: {}", request.name);

        let size = request.size.as_deref().unwrap_or(DEFAULT_SIZE);
        let image = request.image.as_deref().unwrap_or(DEFAULT_IMAGE);
        debug!("Machine type: {}, image: {}", size, image);

        let body = json!({
            "name": &request.name,
            "machineType": format!("zones/{}/machineTypes/{}", self.zone, size),
            "disks": [{
                "boot": true,
                "autoDelete": true,
                "initializeParams": { "sourceImage": image }
            }],
            "networkInterfaces": [{
                "network": "global/networks/default",
                "accessConfigs": [{ "type": "ONE_TO_ONE_NAT", "name": "External NAT" }]
            }],
            "labels": &request.tags,
        });

        let response = self
            .http_client
            .post(self.instances_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::check(response, "instances.insert").await?;

        // The insert call returns an operation; the instance record itself
        // becomes visible under the requested name.
        let mut node = Node::new(NodeId::new(&request.name), &request.name, size);
        node.image = Some(image.to_string());
        node.region = self.zone.clone();
        node.tags = request.tags;

        info!("GCE instance creation started: {}", node.id);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        debug!("Getting GCE instance: {}", id);

        let url = format!("{}/{}", self.instances_url(), id);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response, "instances.get").await?;
        let inst: GceInstance = response.json().await?;

        Ok(Some(self.node_from_instance(inst)))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        debug!(
            "Listing GCE instances in {}/{}",
            self.project, self.zone
        );

        let response = self
            .http_client
            .get(self.instances_url())
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = Self::check(response, "instances.list").await?;

        let list: GceInstanceList = response.json().await?;
        Ok(list
            .items
            .into_iter()
            .map(|inst| self.node_from_instance(inst))
            .collect())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<()> {
        info!("Deleting GCE instance: {}", id);

        let url = format!("{}/{}", self.instances_url(), id);
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response, "instances.delete").await?;

        info!("GCE instance deletion started: {}", id);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        let response = self
            .http_client
            .get(self.instances_url())
            .bearer_auth(&self.token)
            .send()
            .await;

        matches!(response, Ok(resp) if resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_status() {
        assert_eq!(GceNodes::map_status("PROVISIONING"), NodeState::Pending);
        assert_eq!(GceNodes::map_status("RUNNING"), NodeState::Running);
        assert_eq!(GceNodes::map_status("TERMINATED"), NodeState::Stopped);
        assert_eq!(GceNodes::map_status("REPAIRING"), NodeState::Unknown);
    }

    #[test]
    fn test_instance_deserialization() {
        let raw = r#"{
            "name": "demo-1",
            "status": "RUNNING",
            "machineType": "https://compute.googleapis.com/compute/v1/projects/p/zones/us-central1-a/machineTypes/n1-standard-2",
            "creationTimestamp": "2024-03-01T10:00:00.000-08:00",
            "networkInterfaces": [{
                "networkIP": "10.0.0.2",
                "accessConfigs": [{ "natIP": "34.1.2.3" }]
            }]
        }"#;

        let inst: GceInstance = serde_json::from_str(raw).unwrap();
        let provider = GceNodes::new("p", "us-central1-a", "token");
        let node = provider.node_from_instance(inst);

        assert_eq!(node.name, "demo-1");
        assert_eq!(node.size, "n1-standard-2");
        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.private_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(node.public_ip.as_deref(), Some("34.1.2.3"));
    }
}
