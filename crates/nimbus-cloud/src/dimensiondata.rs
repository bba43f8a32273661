//! Dimension Data CloudControl node provider
//!
//! Speaks the CloudControl MCP 2.x JSON API with HTTP basic auth. Server
//! deploys and deletes are asynchronous; the API acknowledges with
//! `IN_PROGRESS` and the server then moves through `PENDING_ADD` /
//! `PENDING_DELETE` towards `NORMAL` or absence.

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeState};
use crate::provider::{CreateNodeRequest, NodeProvider, ProviderKind};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

const DEFAULT_ENDPOINT: &str = "https://api-na.dimensiondata.com/caas/2.4";

/// CloudControl-backed node provider
pub struct DimensionDataNodes {
    endpoint: String,
    org_id: String,
    username: String,
    password: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DdServer {
    id: String,
    name: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    started: bool,
    #[serde(default, rename = "sourceImageId")]
    source_image_id: Option<String>,
    #[serde(default, rename = "networkInfo")]
    network_info: Option<DdNetworkInfo>,
    #[serde(default, rename = "createTime")]
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DdNetworkInfo {
    #[serde(default, rename = "primaryNic")]
    primary_nic: Option<DdNic>,
}

#[derive(Debug, Deserialize)]
struct DdNic {
    #[serde(default, rename = "privateIpv4")]
    private_ipv4: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DdServerList {
    #[serde(default)]
    server: Vec<DdServer>,
}

#[derive(Debug, Deserialize)]
struct DdResponse {
    #[serde(default, rename = "responseCode")]
    response_code: Option<String>,
    #[serde(default)]
    info: Vec<DdInfo>,
}

#[derive(Debug, Deserialize)]
struct DdInfo {
    name: String,
    value: String,
}

impl DimensionDataNodes {
    /// Create a provider for an organization
    pub fn new(
        endpoint: Option<String>,
        org_id: impl Into<String>,
        creds: Credentials,
    ) -> Result<Self> {
        let username = creds.require("username")?.to_string();
        let password = creds.require("password")?.to_string();

        Ok(Self {
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            org_id: org_id.into(),
            username,
            password,
            http_client: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.org_id,
            path
        )
    }

    /// Map a CloudControl state string to our state
    fn map_state(state: &str, started: bool) -> NodeState {
        match state {
            "NORMAL" if started => NodeState::Running,
            "NORMAL" => NodeState::Stopped,
            "PENDING_ADD" | "PENDING_CHANGE" => NodeState::Pending,
            "PENDING_DELETE" => NodeState::Terminating,
            "FAILED_ADD" | "FAILED_CHANGE" | "FAILED_DELETE" => NodeState::Error,
            _ => NodeState::Unknown,
        }
    }

    fn node_from_server(&self, server: DdServer) -> Node {
        let mut node = Node::new(NodeId::new(&server.id), &server.name, "server");
        node.state = server
            .state
            .as_deref()
            .map(|s| Self::map_state(s, server.started))
            .unwrap_or(NodeState::Unknown);
        node.image = server.source_image_id;
        node.private_ip = server
            .network_info
            .and_then(|net| net.primary_nic)
            .and_then(|nic| nic.private_ipv4);

        if let Some(created) = server
            .create_time
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
            ProviderKind::DimensionData,
            format!("{}: {} {}", context, status, body),
        ))
    }
}

#[async_trait]
impl NodeProvider for DimensionDataNodes {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DimensionData
    }

    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        info!("Deploying CloudControl server: {}", request.name);

        let image = request
            .image
            .as_deref()
            .ok_or_else(|| Error::config("Dimension Data requires an image id"))?;
        let network_domain = request
            .tags
            .get("networkDomainId")
            .ok_or_else(|| Error::config("Dimension Data requires a networkDomainId tag"))?;

        let body = json!({
            "name": &request.name,
            "imageId": image,
            "start": true,
            "networkInfo": {
                "networkDomainId": network_domain,
                "primaryNic": { "vlanId": request.tags.get("vlanId") }
            }
        });

        let response = self
            .http_client
            .post(self.url("server/deployServer"))
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "deployServer").await?;

        let ack: DdResponse = response.json().await?;
        debug!("deployServer response: {:?}", ack.response_code);

        let server_id = ack
            .info
            .iter()
            .find(|info| info.name == "serverId")
            .map(|info| info.value.clone())
            .ok_or_else(|| Error::api(ProviderKind::DimensionData, "no serverId in response"))?;

        let mut node = Node::new(NodeId::new(server_id), &request.name, "server");
        node.image = Some(image.to_string());
        node.tags = request.tags;

        info!("CloudControl server deploy started: {}", node.id);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        debug!("Getting CloudControl server: {}", id);

        let url = self.url(&format!("server/server/{}", id));
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        // CloudControl reports an unknown id as RESOURCE_NOT_FOUND with a
        // 400 status; treat both that and a plain 404 as absence.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if response.status() == StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            if body.contains("RESOURCE_NOT_FOUND") {
                return Ok(None);
            }
            return Err(Error::api(
                ProviderKind::DimensionData,
                format!("server/server: 400 {}", body),
            ));
        }

        let response = Self::check(response, "server/server").await?;
        let server: DdServer = response.json().await?;

        Ok(Some(self.node_from_server(server)))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        debug!("Listing CloudControl servers for org {}", self.org_id);

        let response = self
            .http_client
            .get(self.url("server/server"))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;
        let response = Self::check(response, "server/server").await?;

        let list: DdServerList = response.json().await?;
        Ok(list
            .server
            .into_iter()
            .map(|server| self.node_from_server(server))
            .collect())
    }

    async fn delete_node(&self, id: &NodeId) -> Result<()> {
        info!("Deleting CloudControl server: {}", id);

        let response = self
            .http_client
            .post(self.url("server/deleteServer"))
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({ "id": id.as_str() }))
            .send()
            .await?;
        Self::check(response, "deleteServer").await?;

        info!("CloudControl server delete started: {}", id);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        let response = self
            .http_client
            .get(self.url("server/server"))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await;

        matches!(response, Ok(resp) if resp.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_state() {
        assert_eq!(
            DimensionDataNodes::map_state("NORMAL", true),
            NodeState::Running
        );
        assert_eq!(
            DimensionDataNodes::map_state("NORMAL", false),
            NodeState::Stopped
        );
        assert_eq!(
            DimensionDataNodes::map_state("PENDING_ADD", false),
            NodeState::Pending
        );
        assert_eq!(
            DimensionDataNodes::map_state("PENDING_DELETE", true),
            NodeState::Terminating
        );
        assert_eq!(
            DimensionDataNodes::map_state("FAILED_ADD", false),
            NodeState::Error
        );
    }

    #[test]
    fn test_server_deserialization() {
        let raw = r#"{
            "id": "5a32d6e4-9707-4813-a269-56ab4d989f4d",
            "name": "web-1",
            "state": "NORMAL",
            "started": true,
            "sourceImageId": "img-1234",
            "createTime": "2024-03-01T10:00:00.000Z",
            "networkInfo": { "primaryNic": { "privateIpv4": "10.0.0.8" } }
        }"#;

        let server: DdServer = serde_json::from_str(raw).unwrap();
        let creds = Credentials::new(ProviderKind::DimensionData)
            .with_field("username", "u")
            .with_field("password", "p");
        let provider = DimensionDataNodes::new(None, "org-1", creds).unwrap();
        let node = provider.node_from_server(server);

        assert_eq!(node.state, NodeState::Running);
        assert_eq!(node.private_ip.as_deref(), Some("10.0.0.8"));
        assert_eq!(node.image.as_deref(), Some("img-1234"));
    }
}
