//! Subscription store
//!
//! One record per active RIC subscription, keyed by the structured
//! (RIC instance ID, requester ID, RAN function ID) triple. Records are
//! immutable after creation apart from the reporting ticker slot.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use ransim_common::{Error, Result};
use ransim_e2ap::procedures::{RicSubscriptionDetails, RicSubscriptionRequest};
use ransim_e2ap::{E2ClientConn, E2apError, RanFunctionId, RicRequestId};

/// Composite subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId {
    pub ric_instance_id: i32,
    pub requester_id: i32,
    pub ran_function_id: RanFunctionId,
}

impl SubscriptionId {
    pub const fn new(ric_instance_id: i32, requester_id: i32, ran_function_id: RanFunctionId) -> Self {
        Self {
            ric_instance_id,
            requester_id,
            ran_function_id,
        }
    }

    /// Key of a subscription (or subscription delete) request.
    pub fn from_request(request_id: RicRequestId, ran_function_id: RanFunctionId) -> Self {
        Self::new(request_id.instance_id, request_id.requester_id, ran_function_id)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.ric_instance_id, self.requester_id, self.ran_function_id.0
        )
    }
}

/// Stop handle of a subscription's reporting loop.
///
/// The loop owns the timer; this handle only carries the period and the
/// signal that ends the loop on its next iteration.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    stop: CancellationToken,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            stop: CancellationToken::new(),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Completes once [`Ticker::stop`] has been called.
    pub async fn stopped(&self) {
        self.stop.cancelled().await
    }
}

/// Subscription record.
pub struct Subscription {
    pub id: SubscriptionId,
    pub req_id: RicRequestId,
    pub fn_id: RanFunctionId,
    pub details: RicSubscriptionDetails,
    /// Association indications are pushed on
    pub e2_channel: Option<Arc<dyn E2ClientConn>>,
    ticker: Mutex<Option<Ticker>>,
}

impl Subscription {
    /// Builds the record for a subscription request received on `channel`.
    pub fn from_request(
        request: &RicSubscriptionRequest,
        channel: Option<Arc<dyn E2ClientConn>>,
    ) -> std::result::Result<Self, E2apError> {
        let req_id = request.request_id()?;
        let fn_id = request.ran_function_id()?;
        let details = request.details()?.clone();
        Ok(Self {
            id: SubscriptionId::from_request(req_id, fn_id),
            req_id,
            fn_id,
            details,
            e2_channel: channel,
            ticker: Mutex::new(None),
        })
    }

    /// Installs the reporting ticker, stopping any previous one.
    pub fn set_ticker(&self, ticker: Ticker) {
        if let Ok(mut slot) = self.ticker.lock() {
            if let Some(previous) = slot.replace(ticker) {
                previous.stop();
            }
        }
    }

    pub fn ticker(&self) -> Option<Ticker> {
        self.ticker.lock().ok().and_then(|slot| slot.clone())
    }

    /// Stops the reporting ticker if one is installed.
    pub fn stop_ticker(&self) {
        if let Some(ticker) = self.ticker() {
            ticker.stop();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("req_id", &self.req_id)
            .field("fn_id", &self.fn_id)
            .field("actions", &self.details.actions.len())
            .field("ticker", &self.ticker())
            .finish()
    }
}

/// Concurrent map of active subscriptions.
///
/// `add` overwrites an existing record with the same key (last write wins)
/// and stops the replaced record's ticker.
#[derive(Default)]
pub struct SubscriptionStore {
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<Subscription>>>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, subscription: Arc<Subscription>) -> Result<()> {
        if subscription.e2_channel.is_none() {
            return Err(Error::Invalid(format!(
                "subscription {} has no E2 channel",
                subscription.id
            )));
        }
        let previous = self
            .subscriptions
            .write()
            .await
            .insert(subscription.id, subscription.clone());
        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous, &subscription) {
                previous.stop_ticker();
            }
        }
        Ok(())
    }

    pub async fn remove(&self, id: &SubscriptionId) -> Result<()> {
        self.subscriptions.write().await.remove(id);
        Ok(())
    }

    /// Removes `subscription` only if it is still the record stored under
    /// its key. Returns true if it was removed.
    pub async fn remove_if_current(&self, subscription: &Arc<Subscription>) -> bool {
        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions.get(&subscription.id) {
            Some(stored) if Arc::ptr_eq(stored, subscription) => {
                subscriptions.remove(&subscription.id);
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, id: &SubscriptionId) -> Result<Arc<Subscription>> {
        self.subscriptions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("subscription {id}")))
    }

    pub async fn list(&self) -> Vec<Arc<Subscription>> {
        self.subscriptions.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
