//! E2 Setup scenarios over TCP
//!
//! These tests validate:
//! - node startup: dial, E2 Setup with every enabled RAN function
//! - E2 Setup retries after E2 Setup Failure
//! - reconnect after the RIC drops the association
//! - several nodes sharing one RIC

use integration_tests::{
    init_test_logging, test_agents, wait_for_association_count, wait_for_initialized_connections,
    MockRic, MockRicConfig, MockRicEvent, TestModel, TestNodeConfig, DEFAULT_TEST_TIMEOUT,
};
use ransim_e2ap::RanFunctionId;

#[tokio::test]
async fn test_node_connects_and_sets_up() {
    init_test_logging();
    let ric = MockRic::new();
    let addr = ric.start().await.expect("Failed to start mock RIC");

    let model = TestModel::new(addr)
        .with_node(TestNodeConfig::new("node-1", 5152))
        .build_arc();
    let agents = test_agents(model);
    agents.start(&[]).await.expect("Failed to start agents");

    let event = ric
        .wait_for_event(DEFAULT_TEST_TIMEOUT, |e| matches!(e, MockRicEvent::E2SetupReceived { .. }))
        .await
        .expect("No E2 Setup received");
    let MockRicEvent::E2SetupReceived {
        association,
        gnb_id,
        mut ran_functions,
        accepted,
    } = event
    else {
        unreachable!()
    };
    assert_eq!(gnb_id, 5152);
    assert!(accepted);
    ran_functions.sort();
    assert_eq!(ran_functions, (1..=6).map(RanFunctionId).collect::<Vec<_>>());

    let agent = agents.get("node-1").await.unwrap();
    wait_for_initialized_connections(&agent, 1)
        .await
        .expect("Connection never initialized");
    assert_eq!(agent.context().transactions.outstanding(), 0);
    assert_eq!(ric.gnb_id(association).await, Some(5152));

    agents.stop_all().await;
    ric.wait_for_event(DEFAULT_TEST_TIMEOUT, |e| {
        matches!(e, MockRicEvent::NodeDisconnected { association: a } if *a == association)
    })
    .await
    .expect("Association not closed on stop");
}

#[tokio::test]
async fn test_setup_retried_after_failure() {
    init_test_logging();
    let ric = MockRic::with_config(MockRicConfig {
        reject_setups: 2,
        ..MockRicConfig::default()
    });
    let addr = ric.start().await.unwrap();

    let agents = test_agents(
        TestModel::new(addr)
            .with_node(TestNodeConfig::new("node-1", 5152))
            .build_arc(),
    );
    agents.start(&[]).await.unwrap();

    ric.wait_for_event(DEFAULT_TEST_TIMEOUT, |e| {
        matches!(e, MockRicEvent::E2SetupReceived { accepted: true, .. })
    })
    .await
    .expect("E2 Setup never accepted");
    assert_eq!(ric.setups_received().await, 3);

    let agent = agents.get("node-1").await.unwrap();
    wait_for_initialized_connections(&agent, 1)
        .await
        .unwrap();
    assert_eq!(agent.context().transactions.outstanding(), 0);
    agents.stop_all().await;
}

#[tokio::test]
async fn test_reconnect_after_association_loss() {
    init_test_logging();
    let ric = MockRic::new();
    let addr = ric.start().await.unwrap();
    let agents = test_agents(
        TestModel::new(addr)
            .with_node(TestNodeConfig::new("node-1", 5152))
            .build_arc(),
    );
    agents.start(&[]).await.unwrap();

    let Some(MockRicEvent::E2SetupReceived { association: first, .. }) = ric
        .wait_for_event(DEFAULT_TEST_TIMEOUT, |e| matches!(e, MockRicEvent::E2SetupReceived { .. }))
        .await
    else {
        panic!("No E2 Setup received");
    };

    ric.disconnect(first).await.unwrap();

    let Some(MockRicEvent::E2SetupReceived { association: second, gnb_id, .. }) = ric
        .wait_for_event(DEFAULT_TEST_TIMEOUT, |e| matches!(e, MockRicEvent::E2SetupReceived { .. }))
        .await
    else {
        panic!("Node did not reconnect");
    };
    assert_ne!(first, second);
    assert_eq!(gnb_id, 5152);
    assert_eq!(ric.association_count().await, 1);

    let agent = agents.get("node-1").await.unwrap();
    wait_for_initialized_connections(&agent, 1)
        .await
        .unwrap();
    agents.stop_all().await;
}

#[tokio::test]
async fn test_multiple_nodes_share_one_ric() {
    init_test_logging();
    let ric = MockRic::new();
    let addr = ric.start().await.unwrap();
    let agents = test_agents(
        TestModel::new(addr)
            .with_node(TestNodeConfig::new("node-1", 5152))
            .with_node(TestNodeConfig::new("node-2", 5153).with_service_models(&["kpm2", "rc"]))
            .build_arc(),
    );
    agents.start(&[]).await.unwrap();

    let mut seen = Vec::new();
    while seen.len() < 2 {
        match ric
            .wait_for_event(DEFAULT_TEST_TIMEOUT, |e| matches!(e, MockRicEvent::E2SetupReceived { .. }))
            .await
        {
            Some(MockRicEvent::E2SetupReceived { gnb_id, ran_functions, .. }) => {
                seen.push((gnb_id, ran_functions.len()))
            }
            _ => panic!("Expected two E2 Setups, got {seen:?}"),
        }
    }
    seen.sort();
    assert_eq!(seen, vec![(5152, 6), (5153, 2)]);

    agents.stop_all().await;
    wait_for_association_count(&ric, 0)
        .await
        .expect("Associations not closed");
}
