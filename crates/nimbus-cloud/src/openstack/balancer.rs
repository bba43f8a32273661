//! Cloud load balancer service

use super::OpenStackClient;
use crate::error::Result;
use nimbus_core::{PollOutcome, PollPolicy, Waiter};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "rax:load-balancer";

/// Load balancer lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalancerState {
    /// Balancer is being provisioned
    Build,
    /// Balancer is serving traffic
    Active,
    /// A configuration change is being applied
    PendingUpdate,
    /// Balancer is being torn down
    PendingDelete,
    /// Balancer is suspended
    Suspended,
    /// Balancer has been deleted
    Deleted,
    /// Balancer is in an error state
    Error,
    /// Provider reported a state this library does not model
    Unknown,
}

impl BalancerState {
    fn from_api(status: &str) -> Self {
        match status {
            "BUILD" => BalancerState::Build,
            "ACTIVE" => BalancerState::Active,
            "PENDING_UPDATE" => BalancerState::PendingUpdate,
            "PENDING_DELETE" => BalancerState::PendingDelete,
            "SUSPENDED" => BalancerState::Suspended,
            "DELETED" => BalancerState::Deleted,
            "ERROR" => BalancerState::Error,
            _ => BalancerState::Unknown,
        }
    }
}

impl Default for BalancerState {
    fn default() -> Self {
        BalancerState::Unknown
    }
}

impl std::fmt::Display for BalancerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalancerState::Build => write!(f, "build"),
            BalancerState::Active => write!(f, "active"),
            BalancerState::PendingUpdate => write!(f, "pending update"),
            BalancerState::PendingDelete => write!(f, "pending delete"),
            BalancerState::Suspended => write!(f, "suspended"),
            BalancerState::Deleted => write!(f, "deleted"),
            BalancerState::Error => write!(f, "error"),
            BalancerState::Unknown => write!(f, "unknown"),
        }
    }
}

/// A provisioned load balancer
#[derive(Debug, Clone, Deserialize)]
pub struct LoadBalancer {
    /// Balancer id
    pub id: u64,
    /// Balancer name
    pub name: String,
    /// Current state
    #[serde(default, rename = "status", deserialize_with = "state_from_status")]
    pub state: BalancerState,
    /// Listening port
    #[serde(default)]
    pub port: u16,
    /// Protocol (HTTP, HTTPS, TCP, ...)
    #[serde(default)]
    pub protocol: String,
    /// Assigned virtual IPs
    #[serde(default, rename = "virtualIps")]
    pub virtual_ips: Vec<VirtualIp>,
}

/// A virtual IP attached to a balancer
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualIp {
    /// IP address
    pub address: String,
    /// PUBLIC or SERVICENET
    #[serde(default, rename = "type")]
    pub ip_type: String,
}

fn state_from_status<'de, D>(deserializer: D) -> std::result::Result<BalancerState, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let status: Option<String> = Option::deserialize(deserializer)?;
    Ok(status
        .as_deref()
        .map(BalancerState::from_api)
        .unwrap_or(BalancerState::Unknown))
}

#[derive(Debug, Deserialize)]
struct BalancerEnvelope {
    #[serde(rename = "loadBalancer")]
    load_balancer: LoadBalancer,
}

#[derive(Debug, Deserialize)]
struct BalancerListEnvelope {
    #[serde(default, rename = "loadBalancers")]
    load_balancers: Vec<LoadBalancer>,
}

/// Load balancer creation request
#[derive(Debug, Clone)]
pub struct CreateBalancerRequest {
    /// Balancer name
    pub name: String,
    /// Listening port
    pub port: u16,
    /// Protocol
    pub protocol: String,
    /// Backend node addresses (same port as the listener)
    pub node_addresses: Vec<String>,
}

impl CreateBalancerRequest {
    /// Create an HTTP balancer request
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            port,
            protocol: "HTTP".to_string(),
            node_addresses: Vec::new(),
        }
    }

    /// Set protocol
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Add a backend node address
    pub fn with_node(mut self, address: impl Into<String>) -> Self {
        self.node_addresses.push(address.into());
        self
    }
}

/// Cloud load balancer service client
pub struct LoadBalancers {
    client: Arc<OpenStackClient>,
}

impl LoadBalancers {
    /// Create a service client
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self { client }
    }

    /// Create a load balancer
    pub async fn create(&self, request: CreateBalancerRequest) -> Result<LoadBalancer> {
        info!("Creating load balancer: {}", request.name);

        let nodes: Vec<_> = request
            .node_addresses
            .iter()
            .map(|address| {
                json!({
                    "address": address,
                    "port": request.port,
                    "condition": "ENABLED",
                })
            })
            .collect();

        let body = json!({
            "loadBalancer": {
                "name": request.name,
                "port": request.port,
                "protocol": request.protocol,
                "virtualIps": [ { "type": "PUBLIC" } ],
                "nodes": nodes,
            }
        });

        let response = self
            .client
            .request(Method::POST, SERVICE, "/loadbalancers", Some(&body), &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "loadbalancers.create").await?;

        let envelope: BalancerEnvelope = response.json().await?;
        info!("Load balancer creation started: {}", envelope.load_balancer.id);

        Ok(envelope.load_balancer)
    }

    /// Get a balancer by id; `None` when it no longer exists
    pub async fn get(&self, id: u64) -> Result<Option<LoadBalancer>> {
        debug!("Getting load balancer: {}", id);

        let response = self
            .client
            .request(
                Method::GET,
                SERVICE,
                &format!("/loadbalancers/{}", id),
                None,
                &[],
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "loadbalancers.get").await?;
        let envelope: BalancerEnvelope = response.json().await?;

        Ok(Some(envelope.load_balancer))
    }

    /// List all balancers
    pub async fn list(&self) -> Result<Vec<LoadBalancer>> {
        let response = self
            .client
            .request(Method::GET, SERVICE, "/loadbalancers", None, &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "loadbalancers.list").await?;

        let envelope: BalancerListEnvelope = response.json().await?;
        Ok(envelope.load_balancers)
    }

    /// Delete a balancer
    pub async fn delete(&self, id: u64) -> Result<()> {
        info!("Deleting load balancer: {}", id);

        let response = self
            .client
            .request(
                Method::DELETE,
                SERVICE,
                &format!("/loadbalancers/{}", id),
                None,
                &[],
            )
            .await?;
        OpenStackClient::expect_success(response, "loadbalancers.delete").await?;

        Ok(())
    }

    /// Observe just the balancer's current state
    pub async fn state(&self, id: u64) -> Result<Option<BalancerState>> {
        Ok(self.get(id).await?.map(|balancer| balancer.state))
    }

    /// Wait until the balancer is serving traffic
    pub async fn wait_until_active(
        &self,
        id: u64,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<BalancerState>> {
        let waiter = Waiter::new(policy.clone())
            .with_match_state(BalancerState::Active)
            .with_fail_state(BalancerState::Error);

        Ok(waiter.run(|| self.state(id)).await?)
    }

    /// Wait until the balancer is gone (deleted state or absent)
    pub async fn wait_until_gone(
        &self,
        id: u64,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<BalancerState>> {
        let waiter = Waiter::new(policy.clone())
            .with_match_state(BalancerState::Deleted)
            .with_fail_state(BalancerState::Error)
            .treat_missing_as(BalancerState::Deleted);

        Ok(waiter.run(|| self.state(id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_api() {
        assert_eq!(BalancerState::from_api("BUILD"), BalancerState::Build);
        assert_eq!(BalancerState::from_api("ACTIVE"), BalancerState::Active);
        assert_eq!(
            BalancerState::from_api("PENDING_DELETE"),
            BalancerState::PendingDelete
        );
        assert_eq!(BalancerState::from_api("BANANAS"), BalancerState::Unknown);
    }

    #[test]
    fn test_balancer_deserialization() {
        let raw = r#"{
            "loadBalancer": {
                "id": 71,
                "name": "demo-lb",
                "status": "BUILD",
                "port": 80,
                "protocol": "HTTP",
                "virtualIps": [ { "address": "162.13.5.5", "type": "PUBLIC" } ]
            }
        }"#;

        let envelope: BalancerEnvelope = serde_json::from_str(raw).unwrap();
        let balancer = envelope.load_balancer;

        assert_eq!(balancer.id, 71);
        assert_eq!(balancer.state, BalancerState::Build);
        assert_eq!(balancer.virtual_ips[0].address, "162.13.5.5");
    }
}
