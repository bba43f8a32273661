//! AWS node provider (EC2)

use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NodeState};
use crate::provider::{CreateNodeRequest, NodeProvider, ProviderKind};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ec2::types::{
    InstanceStateName, InstanceType, ResourceType, Tag, TagSpecification,
};
use aws_sdk_ec2::Client as Ec2Client;
use tracing::{debug, info, warn};

/// Ubuntu 22.04 LTS in us-east-1; override per region via the request image
const DEFAULT_IMAGE: &str = "ami-0c55b159cbfafe1f0";

const DEFAULT_SIZE: &str = "t3.medium";

/// AWS EC2-backed node provider
pub struct AwsNodes {
    ec2_client: Ec2Client,
    region: String,
}

impl AwsNodes {
    /// Create a provider from the ambient AWS configuration
    pub async fn new() -> Result<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .unwrap_or_else(|| "us-east-1".to_string());

        Ok(Self {
            ec2_client: Ec2Client::new(&config),
            region,
        })
    }

    /// Create a provider pinned to a region
    pub async fn with_region(region: impl Into<String>) -> Result<Self> {
        let region_str = region.into();
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_sdk_ec2::config::Region::new(region_str.clone()))
            .load()
            .await;

        Ok(Self {
            ec2_client: Ec2Client::new(&config),
            region: region_str,
        })
    }

    /// Map EC2 instance state to our state
    fn map_state(aws_state: &InstanceStateName) -> NodeState {
        match aws_state {
            InstanceStateName::Pending => NodeState::Pending,
            InstanceStateName::Running => NodeState::Running,
            InstanceStateName::Stopping => NodeState::Stopping,
            InstanceStateName::Stopped => NodeState::Stopped,
            InstanceStateName::ShuttingDown => NodeState::Terminating,
            InstanceStateName::Terminated => NodeState::Terminated,
            _ => NodeState::Unknown,
        }
    }

    fn node_from_instance(&self, aws_inst: &aws_sdk_ec2::types::Instance) -> Option<Node> {
        let instance_id = aws_inst.instance_id()?;

        let name = aws_inst
            .tags()
            .iter()
            .find(|t| t.key() == Some("Name"))
            .and_then(|t| t.value())
            .unwrap_or("unnamed");

        let size = aws_inst
            .instance_type()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let mut node = Node::new(NodeId::new(instance_id), name, size);

        node.region = self.region.clone();
        node.image = aws_inst.image_id().map(String::from);
        node.state = aws_inst
            .state()
            .and_then(|s| s.name())
            .map(Self::map_state)
            .unwrap_or(NodeState::Unknown);
        node.public_ip = aws_inst.public_ip_address().map(String::from);
        node.private_ip = aws_inst.private_ip_address().map(String::from);

        if let Some(launched) = aws_inst.launch_time() {
            if let Some(ts) = chrono::DateTime::from_timestamp(launched.secs(), 0) {
                node.created_at = ts;
            }
        }

        for tag in aws_inst.tags() {
            if let (Some(key), Some(value)) = (tag.key(), tag.value()) {
                if key != "Name" {
                    node.tags.insert(key.to_string(), value.to_string());
                }
            }
        }

        Some(node)
    }
}

#[async_trait]
impl NodeProvider for AwsNodes {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Aws
    }

    async fn create_node(&self, request: CreateNodeRequest) -> Result<Node> {
        info!("Creating EC2 instance: {}", request.name);

        let size = request.size.clone().unwrap_or_else(|| DEFAULT_SIZE.to_string());
        let image = request.image.clone().unwrap_or_else(|| DEFAULT_IMAGE.to_string());
        debug!("Instance type: {}, image: {}", size, image);

        let mut tags_vec = vec![Tag::builder().key("Name").value(&request.name).build()];
        for (key, value) in &request.tags {
            tags_vec.push(Tag::builder().key(key).value(value).build());
        }

        let tag_spec = TagSpecification::builder()
            .resource_type(ResourceType::Instance)
            .set_tags(Some(tags_vec))
            .build();

        let run_result = self
            .ec2_client
            .run_instances()
            .image_id(&image)
            .instance_type(InstanceType::from(size.as_str()))
            .min_count(1)
            .max_count(1)
            .tag_specifications(tag_spec)
            .send()
            .await
            .map_err(|e| {
                Error::api(
                    ProviderKind::Aws,
                    format!("run_instances: {}", DisplayErrorContext(e)),
                )
            })?;

        let aws_inst = run_result
            .instances()
            .first()
            .ok_or_else(|| Error::api(ProviderKind::Aws, "no instance returned"))?;

        let mut node = self
            .node_from_instance(aws_inst)
            .ok_or_else(|| Error::api(ProviderKind::Aws, "no instance id returned"))?;
        node.name = request.name;
        node.tags = request.tags;

        info!("EC2 instance created: {}", node.id);
        Ok(node)
    }

    async fn get_node(&self, id: &NodeId) -> Result<Option<Node>> {
        debug!("Describing EC2 instance: {}", id);

        let describe_result = self
            .ec2_client
            .describe_instances()
            .instance_ids(id.as_str())
            .send()
            .await;

        let output = match describe_result {
            Ok(output) => output,
            Err(err) => {
                // A terminated-and-reaped instance id is absence, not an error.
                if matches!(
                    err.code(),
                    Some("InvalidInstanceID.NotFound") | Some("InvalidInstanceID.Malformed")
                ) {
                    return Ok(None);
                }
                return Err(Error::api(
                    ProviderKind::Aws,
                    format!("describe_instances: {}", DisplayErrorContext(err)),
                ));
            }
        };

        for reservation in output.reservations() {
            if let Some(aws_inst) = reservation.instances().first() {
                return Ok(self.node_from_instance(aws_inst));
            }
        }

        Ok(None)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        debug!("Listing EC2 instances in region: {}", self.region);

        let describe_result = self
            .ec2_client
            .describe_instances()
            .send()
            .await
            .map_err(|e| {
                Error::api(
                    ProviderKind::Aws,
                    format!("describe_instances: {}", DisplayErrorContext(e)),
                )
            })?;

        let mut nodes = Vec::new();
        for reservation in describe_result.reservations() {
            for aws_inst in reservation.instances() {
                if let Some(node) = self.node_from_instance(aws_inst) {
                    nodes.push(node);
                }
            }
        }

        Ok(nodes)
    }

    async fn delete_node(&self, id: &NodeId) -> Result<()> {
        info!("Terminating EC2 instance: {}", id);

        self.ec2_client
            .terminate_instances()
            .instance_ids(id.as_str())
            .send()
            .await
            .map_err(|e| {
                Error::api(
                    ProviderKind::Aws,
                    format!("terminate_instances: {}", DisplayErrorContext(e)),
                )
            })?;

        info!("Instance {} termination initiated", id);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        match self.ec2_client.describe_regions().send().await {
            Ok(_) => true,
            Err(e) => {
                warn!("AWS not available: {}", DisplayErrorContext(e));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_state() {
        assert_eq!(
            AwsNodes::map_state(&InstanceStateName::Pending),
            NodeState::Pending
        );
        assert_eq!(
            AwsNodes::map_state(&InstanceStateName::Running),
            NodeState::Running
        );
        assert_eq!(
            AwsNodes::map_state(&InstanceStateName::ShuttingDown),
            NodeState::Terminating
        );
        assert_eq!(
            AwsNodes::map_state(&InstanceStateName::Terminated),
            NodeState::Terminated
        );
    }
}
