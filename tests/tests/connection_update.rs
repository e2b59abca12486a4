//! E2 Connection Update scenarios over TCP
//!
//! A second RIC endpoint is added through E2 Connection Update on the primary
//! association. The connection controller dials it and announces the node
//! with an E2 Node Configuration Update; removing it closes the association.

use std::sync::Arc;

use integration_tests::{
    connection_update, init_test_logging, test_agents, wait_for_accepted_setup,
    wait_for_initialized_connections, wait_for_stored_connections, AssociationId, MockRic,
    MockRicEvent, TestModel, TestNodeConfig, DEFAULT_TEST_TIMEOUT,
};
use ransim_e2ap::procedures::{ConnectionUpdateItem, E2ConnectionUpdate};
use ransim_e2ap::{Cause, CauseProtocol, TnlInformation, TnlUsage};
use ransim_e2node::{E2Agent, E2Agents};

async fn setup() -> (MockRic, E2Agents, Arc<E2Agent>, AssociationId) {
    init_test_logging();
    let ric = MockRic::new();
    let addr = ric.start().await.expect("Failed to start mock RIC");
    let agents = test_agents(
        TestModel::new(addr)
            .with_node(TestNodeConfig::new("node-1", 5152))
            .build_arc(),
    );
    agents.start(&[]).await.expect("Failed to start agents");

    let association = wait_for_accepted_setup(&ric).await.expect("No E2 Setup received");
    let agent = agents.get("node-1").await.unwrap();
    wait_for_initialized_connections(&agent, 1)
        .await
        .expect("Primary connection never initialized");
    (ric, agents, agent, association)
}

#[tokio::test]
async fn test_add_and_remove_second_ric() {
    let (ric, agents, agent, association) = setup().await;
    let second = MockRic::new();
    let second_addr = second.start().await.unwrap();

    let ack = ric
        .connection_update(association, connection_update(7, &[second_addr], &[]))
        .await
        .unwrap()
        .expect("Connection update failed");
    assert_eq!(ack.transaction_id, 7);
    assert_eq!(ack.setup.len(), 1);
    assert!(ack.setup_failed.is_empty());

    let event = second
        .wait_for_event(DEFAULT_TEST_TIMEOUT, |e| {
            matches!(e, MockRicEvent::ConfigurationUpdateReceived { .. })
        })
        .await
        .expect("Second RIC got no configuration update");
    let MockRicEvent::ConfigurationUpdateReceived { gnb_id, .. } = event else {
        unreachable!()
    };
    assert_eq!(gnb_id, Some(5152));
    assert_eq!(second.setups_received().await, 0);

    wait_for_initialized_connections(&agent, 2)
        .await
        .expect("Second connection never initialized");
    assert_eq!(agent.context().transactions.outstanding(), 0);

    let ack = ric
        .connection_update(association, connection_update(8, &[], &[second_addr]))
        .await
        .unwrap()
        .expect("Connection removal failed");
    assert_eq!(ack.transaction_id, 8);

    second
        .wait_for_event(DEFAULT_TEST_TIMEOUT, |e| {
            matches!(e, MockRicEvent::NodeDisconnected { .. })
        })
        .await
        .expect("Second association not closed");
    wait_for_stored_connections(&agent, 1)
        .await
        .expect("Removed connection still stored");

    agents.stop_all().await;
}

#[tokio::test]
async fn test_empty_update_is_acknowledged() {
    let (ric, agents, agent, association) = setup().await;

    let ack = ric
        .connection_update(association, connection_update(9, &[], &[]))
        .await
        .unwrap()
        .expect("Empty connection update failed");
    assert_eq!(ack.transaction_id, 9);
    assert!(ack.setup.is_empty());
    assert!(ack.setup_failed.is_empty());
    assert_eq!(agent.context().connections.len().await, 1);

    agents.stop_all().await;
}

#[tokio::test]
async fn test_remove_of_unknown_endpoint_is_acknowledged() {
    let (ric, agents, agent, association) = setup().await;
    let unknown = "10.255.0.1:36421".parse().unwrap();

    let ack = ric
        .connection_update(association, connection_update(10, &[], &[unknown]))
        .await
        .unwrap()
        .expect("Removal of unknown endpoint failed");
    assert_eq!(ack.transaction_id, 10);
    assert_eq!(agent.context().connections.len().await, 1);

    agents.stop_all().await;
}

#[tokio::test]
async fn test_malformed_tnl_information_fails() {
    let (ric, agents, agent, association) = setup().await;
    let update = E2ConnectionUpdate {
        transaction_id: 11,
        add: Some(vec![ConnectionUpdateItem {
            tnl_information: TnlInformation {
                address: vec![10, 0, 0],
                port: Some(36421),
            },
            tnl_usage: TnlUsage::Both,
        }]),
        remove: None,
        modify: None,
    };

    let failure = ric
        .connection_update(association, update)
        .await
        .unwrap()
        .expect_err("Malformed TNL information accepted");
    assert_eq!(failure.transaction_id, 11);
    assert_eq!(failure.cause, Cause::Protocol(CauseProtocol::AbstractSyntaxErrorReject));
    assert_eq!(agent.context().connections.len().await, 1);

    agents.stop_all().await;
}
