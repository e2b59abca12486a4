//! RIC Control scenarios over TCP

use std::sync::Arc;

use integration_tests::{
    control_request, init_test_logging, test_agents, wait_for_accepted_setup, AssociationId, MockRic,
    MockRicError, TestModel, TestNodeConfig,
};
use ransim_e2ap::{Cause, CauseRicRequest, RanFunctionId, RicRequestId};
use ransim_e2node::{E2Agent, E2Agents};
use serde_json::json;

async fn setup() -> (MockRic, E2Agents, Arc<E2Agent>, AssociationId, TestNodeConfig) {
    init_test_logging();
    let ric = MockRic::new();
    let addr = ric.start().await.expect("Failed to start mock RIC");
    let node = TestNodeConfig::new("node-1", 5152);
    let agents = test_agents(TestModel::new(addr).with_node(node.clone()).build_arc());
    agents.start(&[]).await.expect("Failed to start agents");

    let association = wait_for_accepted_setup(&ric).await.expect("No E2 Setup received");
    let agent = agents.get("node-1").await.unwrap();
    (ric, agents, agent, association, node)
}

#[tokio::test]
async fn test_rc_control_changes_pci() {
    let (ric, agents, _agent, association, node) = setup().await;
    let cell = node.ncgis()[0];

    let ack = ric
        .control(
            association,
            control_request(
                RicRequestId::new(20, 1),
                RanFunctionId::RC,
                &json!({ "cell": cell, "parameter": "pci", "value": 42 }),
            ),
        )
        .await
        .unwrap()
        .expect("RC control refused");
    assert_eq!(ack.ric_request_id, RicRequestId::new(20, 1));
    let outcome: serde_json::Value = serde_json::from_slice(&ack.outcome.unwrap()).unwrap();
    assert_eq!(outcome["pci"], 42);

    let failure = ric
        .control(
            association,
            control_request(
                RicRequestId::new(20, 2),
                RanFunctionId::RC,
                &json!({ "cell": cell, "parameter": "pci", "value": 5000 }),
            ),
        )
        .await
        .unwrap()
        .expect_err("Out of range PCI accepted");
    assert_eq!(failure.cause, Cause::RicRequest(CauseRicRequest::ControlMessageInvalid));

    agents.stop_all().await;
}

#[tokio::test]
async fn test_control_for_unknown_ran_function() {
    let (ric, agents, _agent, association, _node) = setup().await;

    let failure = ric
        .control(
            association,
            control_request(RicRequestId::new(21, 1), RanFunctionId(99), &json!({})),
        )
        .await
        .unwrap()
        .expect_err("Control for RAN function 99 acknowledged");
    assert_eq!(failure.cause, Cause::RAN_FUNCTION_ID_INVALID);
    assert_eq!(failure.ran_function_id, RanFunctionId(99));

    agents.stop_all().await;
}

#[tokio::test]
async fn test_kpm_control_is_not_supported() {
    let (ric, agents, _agent, association, _node) = setup().await;

    let err = ric
        .control(
            association,
            control_request(RicRequestId::new(22, 1), RanFunctionId::KPM2, &json!({})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MockRicError::UnexpectedAnswer("ErrorIndication")));

    agents.stop_all().await;
}

#[tokio::test]
async fn test_ccc_control_acknowledges_keys() {
    let (ric, agents, _agent, association, _node) = setup().await;

    let ack = ric
        .control(
            association,
            control_request(
                RicRequestId::new(23, 1),
                RanFunctionId::CCC,
                &json!({ "energy_saving": true, "max_ues": 64 }),
            ),
        )
        .await
        .unwrap()
        .expect("CCC control refused");
    let outcome: serde_json::Value = serde_json::from_slice(&ack.outcome.unwrap()).unwrap();
    let mut accepted: Vec<String> = serde_json::from_value(outcome["accepted"].clone()).unwrap();
    accepted.sort();
    assert_eq!(accepted, vec!["energy_saving", "max_ues"]);

    agents.stop_all().await;
}
