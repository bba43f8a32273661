//! Autoscaling groups service

use super::OpenStackClient;
use crate::error::Result;
use nimbus_core::{poll_until, PollOutcome, PollPolicy};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

const SERVICE: &str = "rax:autoscale";

/// Autoscaling group configuration
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Group name
    pub name: String,
    /// Minimum number of servers
    pub min_entities: u32,
    /// Maximum number of servers
    pub max_entities: u32,
    /// Cooldown between scaling actions, in seconds
    pub cooldown: u32,
    /// Flavor for launched servers
    pub flavor_ref: String,
    /// Image for launched servers
    pub image_ref: String,
}

impl GroupConfig {
    /// Create a group config with a 60 second cooldown
    pub fn new(name: impl Into<String>, min_entities: u32, max_entities: u32) -> Self {
        Self {
            name: name.into(),
            min_entities,
            max_entities,
            cooldown: 60,
            flavor_ref: "general1-1".to_string(),
            image_ref: String::new(),
        }
    }

    /// Set the launch flavor
    pub fn with_flavor(mut self, flavor_ref: impl Into<String>) -> Self {
        self.flavor_ref = flavor_ref.into();
        self
    }

    /// Set the launch image
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }
}

/// A created scaling group
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingGroup {
    /// Group id
    pub id: String,
    /// Ids of the group's scaling policies
    #[serde(default, rename = "scalingPolicies")]
    pub policies: Vec<ScalingPolicy>,
}

/// A scaling policy attached to a group
#[derive(Debug, Clone, Deserialize)]
pub struct ScalingPolicy {
    /// Policy id
    pub id: String,
    /// Policy name
    #[serde(default)]
    pub name: String,
}

/// Observed capacity of a scaling group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GroupState {
    /// Servers up and in service
    #[serde(rename = "activeCapacity")]
    pub active_capacity: u32,
    /// Servers still building
    #[serde(rename = "pendingCapacity")]
    pub pending_capacity: u32,
    /// Capacity the group is converging towards
    #[serde(rename = "desiredCapacity")]
    pub desired_capacity: u32,
    /// Whether scaling is paused
    #[serde(default)]
    pub paused: bool,
}

impl std::fmt::Display for GroupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} active / {} pending / {} desired",
            self.active_capacity, self.pending_capacity, self.desired_capacity
        )
    }
}

#[derive(Debug, Deserialize)]
struct GroupEnvelope {
    group: ScalingGroup,
}

#[derive(Debug, Deserialize)]
struct GroupStateEnvelope {
    group: GroupState,
}

/// Autoscale service client
pub struct AutoScale {
    client: Arc<OpenStackClient>,
}

impl AutoScale {
    /// Create a service client
    pub fn new(client: Arc<OpenStackClient>) -> Self {
        Self { client }
    }

    /// Create a scaling group with one scale-up policy
    pub async fn create_group(&self, config: GroupConfig) -> Result<ScalingGroup> {
        info!("Creating scaling group: {}", config.name);

        let body = json!({
            "groupConfiguration": {
                "name": &config.name,
                "minEntities": config.min_entities,
                "maxEntities": config.max_entities,
                "cooldown": config.cooldown,
            },
            "launchConfiguration": {
                "type": "launch_server",
                "args": {
                    "server": {
                        "name": &config.name,
                        "flavorRef": config.flavor_ref,
                        "imageRef": config.image_ref,
                    }
                }
            },
            "scalingPolicies": [{
                "name": "scale up by one",
                "change": 1,
                "cooldown": config.cooldown,
                "type": "webhook",
            }]
        });

        let response = self
            .client
            .request(Method::POST, SERVICE, "/groups", Some(&body), &[])
            .await?;
        let response = OpenStackClient::expect_success(response, "groups.create").await?;

        let envelope: GroupEnvelope = response.json().await?;
        info!("Scaling group created: {}", envelope.group.id);

        Ok(envelope.group)
    }

    /// Observe a group's capacity; `None` when the group no longer exists
    pub async fn group_state(&self, group_id: &str) -> Result<Option<GroupState>> {
        debug!("Getting group state: {}", group_id);

        let response = self
            .client
            .request(
                Method::GET,
                SERVICE,
                &format!("/groups/{}/state", group_id),
                None,
                &[],
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = OpenStackClient::expect_success(response, "groups.state").await?;
        let envelope: GroupStateEnvelope = response.json().await?;

        Ok(Some(envelope.group))
    }

    /// Execute a scaling policy
    pub async fn execute_policy(&self, group_id: &str, policy_id: &str) -> Result<()> {
        info!("Executing policy {} on group {}", policy_id, group_id);

        let path = format!("/groups/{}/policies/{}/execute", group_id, policy_id);
        let response = self
            .client
            .request(Method::POST, SERVICE, &path, None, &[])
            .await?;
        OpenStackClient::expect_success(response, "policies.execute").await?;

        Ok(())
    }

    /// Delete a group, force-deleting any servers it still owns
    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        info!("Deleting scaling group: {}", group_id);

        let path = format!("/groups/{}?force=true", group_id);
        let response = self
            .client
            .request(Method::DELETE, SERVICE, &path, None, &[])
            .await?;
        OpenStackClient::expect_success(response, "groups.delete").await?;

        Ok(())
    }

    /// Wait until the group's active capacity reaches `desired`.
    ///
    /// Capacity is a number rather than a lifecycle enum, so this goes
    /// through the predicate primitive directly.
    pub async fn wait_for_capacity(
        &self,
        group_id: &str,
        desired: u32,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<GroupState>> {
        Ok(poll_until(
            policy,
            None,
            || self.group_state(group_id),
            |state: &GroupState| state.active_capacity >= desired,
            |_| false,
        )
        .await?)
    }

    /// Wait until the group is gone
    pub async fn wait_until_gone(
        &self,
        group_id: &str,
        policy: &PollPolicy,
    ) -> Result<PollOutcome<GroupState>> {
        // Absence is the success condition; an outcome of NotFound is the
        // "already gone" fast path surfaced by the primitive.
        Ok(poll_until(
            policy,
            None,
            || self.group_state(group_id),
            |_| false,
            |_| false,
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_state_deserialization() {
        let raw = r#"{
            "group": {
                "activeCapacity": 2,
                "pendingCapacity": 1,
                "desiredCapacity": 3,
                "paused": false
            }
        }"#;

        let envelope: GroupStateEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.group.active_capacity, 2);
        assert_eq!(envelope.group.desired_capacity, 3);
        assert_eq!(envelope.group.to_string(), "2 active / 1 pending / 3 desired");
    }

    #[test]
    fn test_group_deserialization() {
        let raw = r#"{
            "group": {
                "id": "6791761b-821a-4d07-820d-0b2afc7dd7f6",
                "scalingPolicies": [
                    { "id": "dceb14ac", "name": "scale up by one" }
                ]
            }
        }"#;

        let envelope: GroupEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.group.policies.len(), 1);
        assert_eq!(envelope.group.policies[0].name, "scale up by one");
    }
}
