//! Periodic indication reporting shared by the reporting service models.
//!
//! A subscription admits its REPORT actions and starts one reporting task.
//! The task owns the timer and ends when the subscription's [`Ticker`] is
//! stopped (subscription delete) or when the E2 channel's context completes
//! (association lost). In the latter case it stops the ticker itself and
//! removes the subscription record, since the RIC cannot delete it anymore.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use ransim_common::{Error, Result};
use ransim_e2ap::procedures::*;
use ransim_e2ap::{
    Cause, CauseRicRequest, E2apError, Outcome, RicActionId, SubscriptionDeleteOutcome,
    SubscriptionOutcome,
};

use super::ServiceModelContext;
use crate::store::{Subscription, SubscriptionId, SubscriptionStore, Ticker};

/// Event trigger carried by reporting subscriptions (JSON).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventTrigger {
    /// Report period; the node's cell interval applies when absent
    #[serde(default)]
    pub period_ms: Option<u64>,
}

impl EventTrigger {
    /// Decodes an event trigger; empty bytes decode to the default trigger.
    pub fn decode(bytes: &[u8]) -> std::result::Result<Self, E2apError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let trigger: EventTrigger = serde_json::from_slice(bytes)?;
        if trigger.period_ms == Some(0) {
            return Err(E2apError::InvalidIeValue("report period must be non-zero".into()));
        }
        Ok(trigger)
    }

    pub fn encode(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Header and message of one RIC Indication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndicationPayload {
    pub header: Vec<u8>,
    pub message: Vec<u8>,
}

/// Admits the REPORT actions of `request`; other action types are not
/// admitted with `ActionNotSupported`.
pub fn admit_report_actions(
    request: &RicSubscriptionRequest,
) -> std::result::Result<SubscriptionAdmission, E2apError> {
    let mut admission = SubscriptionAdmission::new(request.request_id()?, request.ran_function_id()?);
    for action in &request.details()?.actions {
        match action.action_type {
            RicActionType::Report => admission.actions_admitted.push(action.action_id),
            RicActionType::Insert | RicActionType::Policy => {
                admission.actions_not_admitted.push(RicActionNotAdmitted {
                    action_id: action.action_id,
                    cause: Cause::ACTION_NOT_SUPPORTED,
                })
            }
        }
    }
    Ok(admission)
}

/// Starts the reporting task of `subscription` and installs its ticker.
pub fn start_reporting<F>(
    store: Arc<SubscriptionStore>,
    subscription: Arc<Subscription>,
    actions: Vec<RicActionId>,
    period: Duration,
    payload: F,
) -> Result<Ticker>
where
    F: Fn(RicActionId, i32) -> Result<IndicationPayload> + Send + Sync + 'static,
{
    let channel = subscription.e2_channel.clone().ok_or_else(|| {
        Error::Invalid(format!("subscription {} has no E2 channel", subscription.id))
    })?;
    let ticker = Ticker::new(period);
    subscription.set_ticker(ticker.clone());

    let stop = ticker.clone();
    let ctx = channel.context();
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sequence_number: i32 = 0;
        debug!("Reporting started for subscription {} every {:?}", subscription.id, period);

        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    debug!("E2 channel closed; stopping reports for subscription {}", subscription.id);
                    stop.stop();
                    store.remove_if_current(&subscription).await;
                    break;
                }
                _ = stop.stopped() => {
                    debug!("Reports stopped for subscription {}", subscription.id);
                    break;
                }
                _ = interval.tick() => {
                    sequence_number = sequence_number.wrapping_add(1);
                    for action_id in &actions {
                        if ctx.is_cancelled() || stop.is_stopped() {
                            break;
                        }
                        let indication = match payload(*action_id, sequence_number) {
                            Ok(p) => RicIndication {
                                ric_request_id: subscription.req_id,
                                ran_function_id: subscription.fn_id,
                                action_id: *action_id,
                                sequence_number: Some(sequence_number),
                                indication_type: RicIndicationType::Report,
                                header: p.header,
                                message: p.message,
                                call_process_id: None,
                            },
                            Err(e) => {
                                warn!("Failed to build indication for subscription {}: {}", subscription.id, e);
                                continue;
                            }
                        };
                        if let Err(e) = channel.ric_indication(indication).await {
                            warn!("Failed to send indication for subscription {}: {}", subscription.id, e);
                        }
                    }
                }
            }
        }
    });
    Ok(ticker)
}

/// Subscription flow of the periodic reporting models: admit, resolve the
/// period, start reporting for the stored subscription record.
pub async fn subscribe_periodic<F>(
    context: &ServiceModelContext,
    request: &RicSubscriptionRequest,
    payload: F,
) -> Result<SubscriptionOutcome>
where
    F: Fn(RicActionId, i32) -> Result<IndicationPayload> + Send + Sync + 'static,
{
    let admission = admit_report_actions(request)?;
    if admission.actions_admitted.is_empty() {
        return Ok(Outcome::Failure(admission.into_failure(Cause::ACTION_NOT_SUPPORTED)));
    }

    let trigger = match EventTrigger::decode(&request.details()?.event_trigger) {
        Ok(trigger) => trigger,
        Err(e) => {
            warn!("Rejecting subscription with invalid event trigger: {}", e);
            let actions = request.actions();
            let admission = SubscriptionAdmission::new(admission.ric_request_id, admission.ran_function_id)
                .reject_all(actions, Cause::RicRequest(CauseRicRequest::Unspecified));
            return Ok(Outcome::Failure(admission.into_failure(Cause::RIC_REQUEST_UNSPECIFIED)));
        }
    };
    let period = Duration::from_millis(
        trigger
            .period_ms
            .unwrap_or_else(|| context.default_report_interval_ms()),
    );

    let id = SubscriptionId::from_request(admission.ric_request_id, admission.ran_function_id);
    let subscription = context.subscriptions.get(&id).await?;
    start_reporting(
        context.subscriptions.clone(),
        subscription,
        admission.actions_admitted.clone(),
        period,
        payload,
    )?;
    Ok(Outcome::Success(admission.into_response()))
}

/// Subscription delete flow of the periodic reporting models.
pub async fn delete_periodic(
    context: &ServiceModelContext,
    request: &RicSubscriptionDeleteRequest,
) -> Result<SubscriptionDeleteOutcome> {
    let ric_request_id = request.request_id()?;
    let ran_function_id = request.ran_function_id()?;
    let id = SubscriptionId::from_request(ric_request_id, ran_function_id);

    match context.subscriptions.get(&id).await {
        Ok(subscription) => {
            subscription.stop_ticker();
            Ok(Outcome::Success(RicSubscriptionDeleteResponse {
                ric_request_id,
                ran_function_id,
            }))
        }
        Err(e) if e.is_not_found() => Ok(Outcome::Failure(RicSubscriptionDeleteFailure {
            ric_request_id,
            ran_function_id,
            cause: Cause::REQUEST_ID_UNKNOWN,
        })),
        Err(e) => Err(e),
    }
}
