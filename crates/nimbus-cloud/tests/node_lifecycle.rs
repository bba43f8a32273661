//! End-to-end node lifecycle against the in-memory provider

use nimbus_cloud::poll::{wait_for_node_state, wait_until_node_gone};
use nimbus_cloud::{
    build_provider, CreateNodeRequest, LocalProvider, NodeProvider, NodeState, ProviderConfig,
    ProviderKind,
};
use nimbus_core::{PollOutcome, PollPolicy};
use std::time::Duration;

fn policy() -> PollPolicy {
    PollPolicy::new()
        .with_interval(Duration::from_millis(10))
        .with_max_wait(Duration::from_secs(10))
}

#[tokio::test(start_paused = true)]
async fn create_wait_delete_wait() {
    let provider = LocalProvider::new().with_boot_ticks(3).with_delete_ticks(2);

    let node = provider
        .create_node(
            CreateNodeRequest::new("demo-node")
                .with_size("local-small")
                .with_tag("env", "test"),
        )
        .await
        .unwrap();
    assert_eq!(node.state, NodeState::Pending);

    // Boot: the node is observed Pending a few times, then Running.
    let outcome = wait_for_node_state(&provider, &node.id, NodeState::Running, &policy())
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::Success(NodeState::Running));

    let listed = provider.list_nodes().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_running());

    // Delete: observed Terminating, then gone entirely.
    provider.delete_node(&node.id).await.unwrap();
    let outcome = wait_until_node_gone(&provider, &node.id, &policy())
        .await
        .unwrap();
    assert!(outcome.is_success());

    assert!(provider.get_node(&node.id).await.unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_boot_surfaces_as_failed_outcome() {
    let provider = LocalProvider::new().with_boot_ticks(2);

    let node = provider
        .create_node(CreateNodeRequest::new("doomed").with_tag("fail", "boot"))
        .await
        .unwrap();

    let outcome = wait_for_node_state(&provider, &node.id, NodeState::Running, &policy())
        .await
        .unwrap();

    assert_eq!(outcome, PollOutcome::Failed(NodeState::Error));
}

#[tokio::test(start_paused = true)]
async fn waiting_on_unknown_node_reports_not_found() {
    let provider = LocalProvider::new();

    let outcome = wait_for_node_state(
        &provider,
        &"no-such-node".into(),
        NodeState::Running,
        &policy(),
    )
    .await
    .unwrap();

    assert_eq!(outcome, PollOutcome::NotFound);
}

#[tokio::test]
async fn factory_builds_the_local_provider() {
    let config = ProviderConfig::new(ProviderKind::Local);
    let provider = build_provider(&config).await.unwrap();

    assert_eq!(provider.kind(), ProviderKind::Local);
    assert!(provider.is_available().await);

    let node = provider
        .create_node(CreateNodeRequest::new("from-factory"))
        .await
        .unwrap();
    assert_eq!(node.name, "from-factory");
}
