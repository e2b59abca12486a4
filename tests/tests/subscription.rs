//! RIC Subscription scenarios over TCP
//!
//! These tests validate:
//! - periodic RIC Indications for admitted REPORT actions
//! - RIC Subscription Delete stopping the indications
//! - failures for unknown RAN functions and unknown subscriptions
//! - reporting ending when the association is lost

use std::sync::Arc;

use integration_tests::{
    assert_indications_stopped, init_test_logging, subscription_delete_request, subscription_request,
    test_agents, wait_for_accepted_setup, wait_for_indications, wait_for_ticker_stopped,
    AssociationId, MockRic, TestModel, TestNodeConfig,
};
use ransim_e2ap::procedures::RicActionType;
use ransim_e2ap::{Cause, RanFunctionId, RicRequestId};
use ransim_e2node::{E2Agent, E2Agents, SubscriptionId};

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
    (ric, agents, agent, association)
}

#[tokio::test]
async fn test_periodic_indications_until_delete() {
    let (ric, agents, agent, association) = setup().await;
    let request_id = RicRequestId::new(10, 1);

    let response = ric
        .subscribe(
            association,
            subscription_request(request_id, RanFunctionId::KPM2, Some(10), &[1, 2]),
        )
        .await
        .unwrap()
        .expect("Subscription failed");
    assert_eq!(response.ric_request_id, request_id);
    assert_eq!(response.actions_admitted, vec![1, 2]);
    assert!(response.actions_not_admitted.is_empty());

    let id = SubscriptionId::from_request(request_id, RanFunctionId::KPM2);
    assert!(agent.context().subscriptions.get(&id).await.is_ok());

    wait_for_indications(&ric, request_id, 6)
        .await
        .expect("Too few indications");
    let indications = ric.indications().await;
    assert!(indications.iter().any(|i| i.action_id == 1));
    assert!(indications.iter().any(|i| i.action_id == 2));
    assert!(indications.iter().all(|i| i.ran_function_id == RanFunctionId::KPM2));

    ric.delete_subscription(association, subscription_delete_request(request_id, RanFunctionId::KPM2))
        .await
        .unwrap()
        .expect("Subscription delete failed");
    assert!(agent.context().subscriptions.get(&id).await.unwrap_err().is_not_found());

    assert_indications_stopped(&ric, request_id).await.unwrap();

    agents.stop_all().await;
}

#[tokio::test]
async fn test_unknown_ran_function_is_rejected() {
    let (ric, agents, agent, association) = setup().await;
    let request_id = RicRequestId::new(11, 1);

    let failure = ric
        .subscribe(
            association,
            subscription_request(request_id, RanFunctionId(99), Some(10), &[1, 2]),
        )
        .await
        .unwrap()
        .expect_err("Subscription to RAN function 99 succeeded");
    assert_eq!(failure.cause, Cause::RAN_FUNCTION_ID_INVALID);
    assert_eq!(failure.actions_not_admitted.len(), 2);
    assert!(agent.context().subscriptions.is_empty().await);

    agents.stop_all().await;
}

#[tokio::test]
async fn test_delete_of_unknown_subscription_fails() {
    let (ric, agents, _agent, association) = setup().await;

    let failure = ric
        .delete_subscription(
            association,
            subscription_delete_request(RicRequestId::new(12, 1), RanFunctionId::KPM2),
        )
        .await
        .unwrap()
        .expect_err("Delete of unknown subscription succeeded");
    assert_eq!(failure.cause, Cause::REQUEST_ID_UNKNOWN);

    agents.stop_all().await;
}

#[tokio::test]
async fn test_reporting_stops_when_association_is_lost() {
    let (ric, agents, agent, association) = setup().await;
    let request_id = RicRequestId::new(13, 1);

    ric.subscribe(
        association,
        subscription_request(request_id, RanFunctionId::MHO, Some(10), &[1]),
    )
    .await
    .unwrap()
    .expect("Subscription failed");
    wait_for_indications(&ric, request_id, 2).await.unwrap();

    let id = SubscriptionId::from_request(request_id, RanFunctionId::MHO);
    let subscription = agent.context().subscriptions.get(&id).await.unwrap();
    let ticker = subscription.ticker().expect("No ticker installed");

    ric.disconnect(association).await.unwrap();
    wait_for_ticker_stopped(&ticker)
        .await
        .expect("Ticker not stopped after association loss");
    assert!(agent.context().subscriptions.get(&id).await.unwrap_err().is_not_found());

    agents.stop_all().await;
}

#[tokio::test]
async fn test_duplicate_subscription_does_not_outlive_delete() {
    let (ric, agents, agent, association) = setup().await;
    let request_id = RicRequestId::new(14, 1);
    let request = subscription_request(request_id, RanFunctionId::KPM2, Some(10), &[1]);

    ric.subscribe(association, request.clone())
        .await
        .unwrap()
        .expect("Subscription failed");
    let failure = ric
        .subscribe(association, request)
        .await
        .unwrap()
        .expect_err("Duplicate subscription accepted");
    assert_eq!(failure.cause, Cause::RIC_REQUEST_UNSPECIFIED);
    wait_for_indications(&ric, request_id, 2).await.unwrap();

    ric.delete_subscription(association, subscription_delete_request(request_id, RanFunctionId::KPM2))
        .await
        .unwrap()
        .expect("Subscription delete failed");
    assert!(agent.context().subscriptions.is_empty().await);
    assert_indications_stopped(&ric, request_id).await.unwrap();

    agents.stop_all().await;
}

#[tokio::test]
async fn test_rejected_duplicate_leaves_active_subscription_deletable() {
    let (ric, agents, agent, association) = setup().await;
    let request_id = RicRequestId::new(15, 1);

    ric.subscribe(
        association,
        subscription_request(request_id, RanFunctionId::KPM2, Some(10), &[1]),
    )
    .await
    .unwrap()
    .expect("Subscription failed");

    let mut policy_only = subscription_request(request_id, RanFunctionId::KPM2, Some(10), &[1]);
    if let Some(details) = policy_only.details.as_mut() {
        details.actions[0].action_type = RicActionType::Policy;
    }
    ric.subscribe(association, policy_only)
        .await
        .unwrap()
        .expect_err("Policy-only duplicate accepted");
    assert_eq!(agent.context().subscriptions.len().await, 1);

    ric.delete_subscription(association, subscription_delete_request(request_id, RanFunctionId::KPM2))
        .await
        .unwrap()
        .expect("Delete of the active subscription failed");
    assert_indications_stopped(&ric, request_id).await.unwrap();

    agents.stop_all().await;
}
