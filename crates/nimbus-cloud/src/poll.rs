//! Waiter bridges for provider resources
//!
//! Thin glue between [`nimbus_core::wait`] and the [`NodeProvider`] trait,
//! plus the poll cadences the demo programs use.

use crate::error::Result;
use crate::node::{NodeId, NodeState};
use crate::provider::NodeProvider;
use nimbus_core::{PollOutcome, PollPolicy, Waiter};
use std::time::Duration;

/// Named poll cadences matching how long each resource kind usually takes.
pub mod presets {
    use super::*;

    /// Node boot: up to ten minutes, checked every ten seconds
    pub fn node_boot() -> PollPolicy {
        PollPolicy::new()
            .with_initial_delay(Duration::from_secs(10))
            .with_interval(Duration::from_secs(10))
            .with_max_wait(Duration::from_secs(600))
    }

    /// Node delete: up to five minutes, checked every five seconds
    pub fn node_delete() -> PollPolicy {
        PollPolicy::new()
            .with_interval(Duration::from_secs(5))
            .with_max_wait(Duration::from_secs(300))
    }

    /// Load balancer build: up to five minutes, checked every five seconds
    pub fn balancer_build() -> PollPolicy {
        PollPolicy::new()
            .with_initial_delay(Duration::from_secs(2))
            .with_interval(Duration::from_secs(5))
            .with_max_wait(Duration::from_secs(300))
    }

    /// DNS job: quick jobs, checked every two seconds for a minute
    pub fn dns_job() -> PollPolicy {
        PollPolicy::new()
            .with_interval(Duration::from_secs(2))
            .with_max_wait(Duration::from_secs(60))
    }

    /// Database build: these are slow - up to ten minutes
    pub fn database_build() -> PollPolicy {
        PollPolicy::new()
            .with_initial_delay(Duration::from_secs(20))
            .with_interval(Duration::from_secs(15))
            .with_max_wait(Duration::from_secs(600))
    }

    /// Autoscale convergence: up to ten minutes, checked every ten seconds
    pub fn autoscale_converge() -> PollPolicy {
        PollPolicy::new()
            .with_interval(Duration::from_secs(10))
            .with_max_wait(Duration::from_secs(600))
    }
}

/// Wait until a node reaches `target`, failing fast on [`NodeState::Error`].
pub async fn wait_for_node_state(
    provider: &dyn NodeProvider,
    id: &NodeId,
    target: NodeState,
    policy: &PollPolicy,
) -> Result<PollOutcome<NodeState>> {
    let waiter = Waiter::new(policy.clone())
        .with_match_state(target)
        .with_fail_state(NodeState::Error);

    Ok(waiter.run(|| provider.node_state(id)).await?)
}

/// Wait until a node is gone.
///
/// Providers differ in how deletion ends: some report a `Terminated` state,
/// others forget the node entirely. Both count as gone here.
pub async fn wait_until_node_gone(
    provider: &dyn NodeProvider,
    id: &NodeId,
    policy: &PollPolicy,
) -> Result<PollOutcome<NodeState>> {
    let waiter = Waiter::new(policy.clone())
        .with_match_state(NodeState::Terminated)
        .treat_missing_as(NodeState::Terminated);

    Ok(waiter.run(|| provider.node_state(id)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalProvider;
    use crate::provider::CreateNodeRequest;

    fn fast_policy() -> PollPolicy {
        PollPolicy::new()
            .with_interval(Duration::from_millis(10))
            .with_max_wait(Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_node_running() {
        let provider = LocalProvider::new().with_boot_ticks(3);
        let node = provider
            .create_node(CreateNodeRequest::new("web-1"))
            .await
            .unwrap();

        let outcome =
            wait_for_node_state(&provider, &node.id, NodeState::Running, &fast_policy())
                .await
                .unwrap();

        assert_eq!(outcome, PollOutcome::Success(NodeState::Running));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_node_gone() {
        let provider = LocalProvider::new().with_boot_ticks(0).with_delete_ticks(2);
        let node = provider
            .create_node(CreateNodeRequest::new("web-1"))
            .await
            .unwrap();

        provider.delete_node(&node.id).await.unwrap();

        let outcome = wait_until_node_gone(&provider, &node.id, &fast_policy())
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Success(NodeState::Terminated));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_fails_fast_on_error_state() {
        let provider = LocalProvider::new().with_boot_ticks(1);
        let node = provider
            .create_node(CreateNodeRequest::new("bad").with_tag("fail", "boot"))
            .await
            .unwrap();

        let outcome =
            wait_for_node_state(&provider, &node.id, NodeState::Running, &fast_policy())
                .await
                .unwrap();

        assert_eq!(outcome, PollOutcome::Failed(NodeState::Error));
    }

    #[test]
    fn test_presets_are_valid() {
        for policy in [
            presets::node_boot(),
            presets::node_delete(),
            presets::balancer_build(),
            presets::dns_job(),
            presets::database_build(),
            presets::autoscale_converge(),
        ] {
            policy.validate().unwrap();
        }
    }
}
