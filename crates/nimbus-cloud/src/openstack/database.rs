//! Cloud databases service

use super::OpenStackClient;
use crate::error::Result;
use nimbus_core::{PollOutcome, PollPolicy, Waiter};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "rax:database";

/// Database instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    /// Instance is being provisioned
    Build,
    /// Instance is accepting connections
    Active,
    /// Instance is rebooting
    Reboot,
    /// Instance is resizing
    Resize,
    /// Instance is shut down
    Shutdown,
    /// Instance has been deleted
    Deleted,
    /// Instance failed
    Failed,
    /// Provider reported a state this library does not model
    Unknown,
}

impl DatabaseState {
    fn from_api(status: &str) -> Self {
        match status {
            "BUILD" => DatabaseState::Build,
            "ACTIVE" => DatabaseState::Active,
            "REBOOT" => DatabaseState::Reboot,
            "RESIZE" => DatabaseState::Resize,
            "SHUTDOWN" => DatabaseState::Shutdown,
            "DELETED" => DatabaseState::Deleted,
            "FAILED" | "ERROR" => DatabaseState::Failed,
            _ => DatabaseState::Unknown,
        }
    }
}

impl std::fmt::Display for DatabaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseState::Build => write!(f, "build"),
            DatabaseState::Active => write!(f, "active"),
            DatabaseState::Reboot => write!(f, "reboot"),
            DatabaseState::Resize => write!(f, "resize"),
            DatabaseState::Shutdown => write!(f, "shutdown"),
            DatabaseState::Deleted => write!(f, "deleted"),
            DatabaseState::Failed => write!(f, "failed"),
            DatabaseState::Unknown => write!(f, "unknown"),
        }
    }
}

/// A managed database instance
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseInstance {
    /// Instance id
    pub id: String,
    /// Instance name
    pub name: String,
    /// Current state
    #[serde(default, rename = "status")]
    status_raw: Option<String>,
    /// Connection hostname, available once active
    #[serde(default)]
    pub hostname: Option<String>,
    /// Storage volume size in GB
    #[serde(default)]
    pub volume: Option<DatabaseVolume>,
}

/// Database storage volume
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseVolume {
    /// Size in GB
    #[serde(default)]
    pub size: u32,
}

impl DatabaseInstance {
    /// Current state
    pub fn state(&self) -> DatabaseState {
        self.status_raw
            .as_deref()
            .map(DatabaseState::from_api)
            .unwrap_or(DatabaseState::Unknown)
    }
}

#[derive(Debug, Deserialize)]
struct InstanceEnvelope {
    instance: DatabaseInstance,
}

#[derive(Debug, Deserialize)]
struct InstanceListEnvelope {
    #[serde(default)]
    instances: Vec<DatabaseInstance>,
}

/// Cloud databases service client
pub struct CloudDatabases {
    client: Arc<OpenStackClient>,
}

impl CloudDatabases {
    /// Create a service client
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self { client }
    }

    /// Create a database instance with one database on it
    pub async fn create_instance(
        &self,
        name: &str,
        flavor_ref: &str,
        volume_gb: u32,
        database: &str,
    ) -> Result<DatabaseInstance> {
        info!("Creating database instance: {}", name);

        let body = json!({
            "instance": {
                "name": name,
                "flavorRef": flavor_ref,
                "volume": { "size": volume_gb },
                "databases": [ { "name": database } ],
            }
        });

        let response = self
            .client
            .request(Method::POST, SERVICE, "/instances", Some(&body), &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "instances.create").await?;

        let envelope: InstanceEnvelope = response.json().await?;
        info!("Database instance creation started: {}", envelope.instance.id);

        Ok(envelope.instance)
    }

    /// Get an instance by id; `None` when it no longer exists
    pub async fn get_instance(&self, id: &str) -> Result<Option<DatabaseInstance>> {
        debug!("Getting database instance: {}", id);

        let response = self
            .client
            .request(
                Method::GET,
                SERVICE,
                &format!("/instances/{}", id),
                None,
                &[],
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "instances.get").await?;
        let envelope: InstanceEnvelope = response.json().await?;

        Ok(Some(envelope.instance))
    }

    /// List all instances
    pub async fn list_instances(&self) -> Result<Vec<DatabaseInstance>> {
        let response = self
            .client
            .request(Method::GET, SERVICE, "/instances", None, &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "instances.list").await?;

        let envelope: InstanceListEnvelope = response.json().await?;
        Ok(envelope.instances)
    }

    /// Delete an instance
    pub async fn delete_instance(&self, id: &str) -> Result<()> {
        info!("Deleting database instance: {}", id);

        let response = self
            .client
            .request(
                Method::DELETE,
                SERVICE,
                &format!("/instances/{}", id),
                None,
                &[],
            )
            .await?;
        OpenStackClient::expect_success(response, "instances.delete").await?;

        Ok(())
    }

    /// Observe just the instance's current state
    pub async fn instance_state(&self, id: &str) -> Result<Option<DatabaseState>> {
        Ok(self.get_instance(id).await?.map(|instance| instance.state()))
    }

    /// Wait until the instance is accepting connections
    pub async fn wait_until_active(
        &self,
        id: &str,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<DatabaseState>> {
        let waiter = Waiter::new(policy.clone())
            .with_match_state(DatabaseState::Active)
            .with_fail_state(DatabaseState::Failed);

        Ok(waiter.run(|| self.instance_state(id)).await?)
    }

    /// Wait until the instance is gone
    pub async fn wait_until_gone(
        &self,
        id: &str,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<DatabaseState>> {
        let waiter = Waiter::new(policy.clone())
            .with_match_state(DatabaseState::Deleted)
            .with_fail_state(DatabaseState::Failed)
            .treat_missing_as(DatabaseState::Deleted);

        Ok(waiter.run(|| self.instance_state(id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_api() {
        assert_eq!(DatabaseState::from_api("BUILD"), DatabaseState::Build);
        assert_eq!(DatabaseState::from_api("ACTIVE"), DatabaseState::Active);
        assert_eq!(DatabaseState::from_api("FAILED"), DatabaseState::Failed);
        assert_eq!(DatabaseState::from_api("???"), DatabaseState::Unknown);
    }

    #[test]
    fn test_instance_deserialization() {
        let raw = r#"{
            "instance": {
                "id": "44b277eb-39be-4921-be31-3d61b43651d7",
                "name": "orders-db",
                "status": "BUILD",
                "hostname": "orders.db.example.com",
                "volume": { "size": 2 }
            }
        }"#;

        let envelope: InstanceEnvelope = serde_json::from_str(raw).unwrap();
        let instance = envelope.instance;

        assert_eq!(instance.name, "orders-db");
        assert_eq!(instance.state(), DatabaseState::Build);
        assert_eq!(instance.hostname.as_deref(), Some("orders.db.example.com"));
        assert_eq!(instance.volume.unwrap().size, 2);
    }
}
