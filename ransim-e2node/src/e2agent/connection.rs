//! E2 connection
//!
//! An [`E2Connection`] is the node's side of one RIC endpoint. It dials the
//! RIC, runs E2 Setup, and answers the RIC-initiated procedures arriving on
//! the association:
//!
//! - RIC Control, Subscription and Subscription Delete are dispatched by RAN
//!   function ID to the registered service model
//! - E2 Connection Update adds or removes connection records; the connection
//!   controller carries out the change

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ransim_common::{Error, Result};
use ransim_e2ap::procedures::*;
use ransim_e2ap::{
    Cause, CauseProtocol, CauseTransport, ConnectionUpdateOutcome, ControlOutcome, E2ClientConn,
    E2NodeHandler, Outcome, RanFunctionId, RicRequestId, SubscriptionDeleteOutcome,
    SubscriptionOutcome,
};

use super::addressing::RicAddress;
use super::backoff::retry_forever;
use super::context::NodeContext;
use crate::store::{
    Connection, ConnectionId, ConnectionState, ConnectionStatus, Phase, Subscription, SubscriptionId,
};

/// Request ID reported when a request carries none.
const UNKNOWN_REQUEST_ID: RicRequestId = RicRequestId::new(0, 0);

/// Configuration of an [`E2Connection`].
#[derive(Clone)]
pub struct E2ConnectionConfig {
    pub node: NodeContext,
    pub address: RicAddress,
}

/// Node side of one RIC endpoint.
pub struct E2Connection {
    id: ConnectionId,
    address: RicAddress,
    node: NodeContext,
    client: RwLock<Option<Arc<dyn E2ClientConn>>>,
    shutdown: CancellationToken,
}

impl E2Connection {
    pub fn new(config: E2ConnectionConfig) -> Arc<Self> {
        Arc::new(Self {
            id: config.address.connection_id(),
            address: config.address,
            node: config.node,
            client: RwLock::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn address(&self) -> RicAddress {
        self.address
    }

    /// Current association, if dialed.
    pub fn client(&self) -> Option<Arc<dyn E2ClientConn>> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Dials the RIC once. `self` answers the procedures received on the
    /// new association.
    pub async fn connect(self: &Arc<Self>) -> Result<Arc<dyn E2ClientConn>> {
        let address = self.address.to_string();
        let handler: Arc<dyn E2NodeHandler> = self.clone();
        let client = self
            .node
            .dialer
            .connect(&address, handler)
            .await
            .map_err(|e| Error::Unknown(format!("failed to connect to {address}: {e}")))?;
        info!("Node {} connected to RIC {}", self.node.node_name, address);
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(client.clone());
        Ok(client)
    }

    /// Runs E2 Setup on `client`.
    pub async fn setup(&self, client: &Arc<dyn E2ClientConn>) -> Result<()> {
        run_e2_setup(&self.node, client.as_ref()).await
    }

    /// Dials and runs E2 Setup, retrying both with backoff until they succeed
    /// or the connection is closed. On success the connection is stored as
    /// `(Open, Initialized)`.
    pub async fn connect_and_setup(self: &Arc<Self>) -> Result<Arc<dyn E2ClientConn>> {
        let this = self;
        let backoff = self.node.backoff;

        retry_forever("connect", backoff, &self.shutdown, move || this.connect()).await?;
        let client = retry_forever("run E2 setup", backoff, &self.shutdown, move || async move {
            let client = match this.client() {
                Some(client) if !client.context().is_cancelled() => client,
                _ => this.connect().await?,
            };
            this.setup(&client).await?;
            Ok::<_, Error>(client)
        })
        .await?;

        let mut connection = Connection::new(
            self.id.clone(),
            ConnectionStatus::new(Phase::Open, ConnectionState::Initialized),
        );
        connection.client = Some(client.clone());
        self.node.connections.add(&self.id, connection).await?;
        Ok(client)
    }

    /// Closes the association and removes the connection record. Pending
    /// retries of [`E2Connection::connect_and_setup`] end.
    pub async fn close(&self) -> Result<()> {
        self.shutdown.cancel();
        let client = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(client) = client {
            if let Err(e) = client.close().await {
                warn!("Failed to close connection {}: {}", self.id, e);
            }
        }
        info!("Node {} closed connection {}", self.node.node_name, self.id);
        self.node.connections.remove(&self.id).await
    }

    /// True once [`E2Connection::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn add_connection(&self, item: &ConnectionUpdateItem, address: RicAddress, ack: &mut E2ConnectionUpdateAcknowledge) {
        let id = address.connection_id();
        if self.node.connections.get(&id).await.is_ok() {
            debug!("Connection {} already exists", id);
            ack.setup.push(item.clone());
            return;
        }
        let connection = Connection::new(
            id.clone(),
            ConnectionStatus::new(Phase::Open, ConnectionState::Connecting),
        );
        match self.node.connections.add(&id, connection).await {
            Ok(()) => ack.setup.push(item.clone()),
            Err(e) => {
                warn!("Failed to add connection {}: {}", id, e);
                ack.setup_failed.push(ConnectionSetupFailedItem {
                    tnl_information: item.tnl_information.clone(),
                    cause: Cause::Transport(CauseTransport::Unspecified),
                });
            }
        }
    }

    async fn remove_connection(&self, address: RicAddress) -> Result<()> {
        let id = address.connection_id();
        let mut connection = match self.node.connections.get(&id).await {
            Ok(connection) => connection,
            Err(e) if e.is_not_found() => {
                debug!("Connection {} already removed", id);
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        connection.status = ConnectionStatus::new(Phase::Closed, ConnectionState::Disconnecting);
        self.node.connections.update(connection).await
    }
}

/// Runs E2 Setup on `client`. The transaction ID is returned to the pool
/// whatever the outcome.
///
/// E2 Setup Failure maps to `Invalid`, a transport error to `Unknown`.
pub async fn run_e2_setup(node: &NodeContext, client: &dyn E2ClientConn) -> Result<()> {
    let transaction = node.transactions.begin()?;
    let request = node.e2_setup_request(transaction.id())?;
    debug!(
        "Sending E2 Setup Request for node {} (transaction {}, {} RAN functions)",
        node.node_name,
        transaction.id(),
        request.ran_functions.len()
    );

    match client.e2_setup(request).await {
        Ok(Outcome::Success(response)) => {
            for (id, cause) in &response.ran_functions_rejected {
                warn!("RAN function {} rejected by RIC: {}", id.0, cause);
            }
            info!(
                "E2 Setup of node {} succeeded: {} RAN functions accepted",
                node.node_name,
                response.ran_functions_accepted.len()
            );
            Ok(())
        }
        Ok(Outcome::Failure(failure)) => Err(Error::Invalid(format!(
            "E2 setup of node {} failed: {}",
            node.node_name, failure.cause
        ))),
        Err(e) => Err(Error::Unknown(format!("E2 setup of node {}: {}", node.node_name, e))),
    }
}

/// Runs E2 Node Configuration Update on `client`, releasing the transaction
/// ID on every path.
pub async fn run_configuration_update(node: &NodeContext, client: &dyn E2ClientConn) -> Result<()> {
    let transaction = node.transactions.begin()?;
    let request = node.configuration_update(transaction.id())?;

    match client.e2_configuration_update(request).await {
        Ok(Outcome::Success(ack)) => {
            info!(
                "E2 Node Configuration Update of node {} acknowledged ({} components)",
                node.node_name,
                ack.accepted_components.len()
            );
            Ok(())
        }
        Ok(Outcome::Failure(failure)) => Err(Error::Invalid(format!(
            "E2 node configuration update of node {} failed: {}",
            node.node_name, failure.cause
        ))),
        Err(e) => Err(Error::Unknown(format!(
            "E2 node configuration update of node {}: {}",
            node.node_name, e
        ))),
    }
}

fn malformed_subscription(request: &RicSubscriptionRequest) -> SubscriptionOutcome {
    let admission = SubscriptionAdmission::new(
        request.ric_request_id.unwrap_or(UNKNOWN_REQUEST_ID),
        request.ran_function_id.unwrap_or(RanFunctionId::INTERNAL),
    )
    .reject_all(request.actions(), Cause::FALSELY_CONSTRUCTED_MESSAGE);
    Outcome::Failure(admission.into_failure(Cause::FALSELY_CONSTRUCTED_MESSAGE))
}

#[async_trait]
impl E2NodeHandler for E2Connection {
    async fn ric_control(&self, request: RicControlRequest) -> Result<ControlOutcome> {
        let ran_function_id = match request.ran_function_id() {
            Ok(id) => id,
            Err(e) => {
                warn!("Malformed RIC Control Request: {}", e);
                return Ok(Outcome::Failure(RicControlFailure::for_request(
                    &request,
                    Cause::FALSELY_CONSTRUCTED_MESSAGE,
                )));
            }
        };
        debug!(
            "RIC Control Request for RAN function {} on {}",
            ran_function_id.0, self.id
        );

        match self.node.registry.get_service_model(ran_function_id) {
            Ok(sm) => sm.client.ric_control(request).await,
            Err(e) => {
                warn!("RIC Control Request rejected: {}", e);
                Ok(Outcome::Failure(RicControlFailure::for_request(
                    &request,
                    Cause::RAN_FUNCTION_ID_INVALID,
                )))
            }
        }
    }

    async fn ric_subscription(&self, request: RicSubscriptionRequest) -> Result<SubscriptionOutcome> {
        let ids = request
            .request_id()
            .and_then(|req_id| Ok((req_id, request.ran_function_id()?)));
        let (ric_request_id, ran_function_id) = match ids {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Malformed RIC Subscription Request: {}", e);
                return Ok(malformed_subscription(&request));
            }
        };
        debug!(
            "RIC Subscription Request {:?} for RAN function {} on {}",
            ric_request_id, ran_function_id.0, self.id
        );

        let sm = match self.node.registry.get_service_model(ran_function_id) {
            Ok(sm) => sm,
            Err(e) => {
                warn!("RIC Subscription Request rejected: {}", e);
                let admission = SubscriptionAdmission::new(ric_request_id, ran_function_id)
                    .reject_all(request.actions(), Cause::RAN_FUNCTION_ID_INVALID);
                return Ok(Outcome::Failure(admission.into_failure(Cause::RAN_FUNCTION_ID_INVALID)));
            }
        };

        let subscription = match Subscription::from_request(&request, self.client()) {
            Ok(subscription) => Arc::new(subscription),
            Err(e) => {
                warn!("Malformed RIC Subscription Request: {}", e);
                return Ok(malformed_subscription(&request));
            }
        };
        if self.node.subscriptions.get(&subscription.id).await.is_ok() {
            warn!("RIC Subscription Request rejected: subscription {} is active", subscription.id);
            let admission = SubscriptionAdmission::new(ric_request_id, ran_function_id)
                .reject_all(request.actions(), Cause::RIC_REQUEST_UNSPECIFIED);
            return Ok(Outcome::Failure(admission.into_failure(Cause::RIC_REQUEST_UNSPECIFIED)));
        }
        self.node.subscriptions.add(subscription.clone()).await?;

        let outcome = sm.client.ric_subscription(request).await;
        if !matches!(outcome, Ok(Outcome::Success(_))) {
            subscription.stop_ticker();
            self.node.subscriptions.remove_if_current(&subscription).await;
        }
        outcome
    }

    async fn ric_subscription_delete(
        &self,
        request: RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome> {
        let ids = request
            .request_id()
            .and_then(|req_id| Ok((req_id, request.ran_function_id()?)));
        let (ric_request_id, ran_function_id) = match ids {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Malformed RIC Subscription Delete Request: {}", e);
                return Ok(Outcome::Failure(RicSubscriptionDeleteFailure {
                    ric_request_id: request.ric_request_id.unwrap_or(UNKNOWN_REQUEST_ID),
                    ran_function_id: request.ran_function_id.unwrap_or(RanFunctionId::INTERNAL),
                    cause: Cause::FALSELY_CONSTRUCTED_MESSAGE,
                }));
            }
        };
        let failure = |cause| {
            Ok(Outcome::Failure(RicSubscriptionDeleteFailure {
                ric_request_id,
                ran_function_id,
                cause,
            }))
        };

        let id = SubscriptionId::from_request(ric_request_id, ran_function_id);
        let subscription = match self.node.subscriptions.get(&id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!("RIC Subscription Delete Request rejected: {}", e);
                return failure(Cause::REQUEST_ID_UNKNOWN);
            }
        };
        let sm = match self.node.registry.get_service_model(ran_function_id) {
            Ok(sm) => sm,
            Err(e) => {
                warn!("RIC Subscription Delete Request rejected: {}", e);
                return failure(Cause::RAN_FUNCTION_ID_INVALID);
            }
        };

        let outcome = sm.client.ric_subscription_delete(request).await?;
        if outcome.is_success() {
            subscription.stop_ticker();
            self.node.subscriptions.remove(&id).await?;
            debug!("Subscription {} deleted", id);
        }
        Ok(outcome)
    }

    async fn e2_connection_update(&self, request: E2ConnectionUpdate) -> Result<ConnectionUpdateOutcome> {
        let transaction_id = request.transaction_id;
        let mut ack = E2ConnectionUpdateAcknowledge::new(transaction_id);
        if request.is_empty() {
            debug!("Empty E2 Connection Update (transaction {})", transaction_id);
            return Ok(Outcome::Success(ack));
        }
        let syntax_error = || {
            Ok(Outcome::Failure(E2ConnectionUpdateFailure::new(
                transaction_id,
                Cause::Protocol(CauseProtocol::AbstractSyntaxErrorReject),
            )))
        };

        for item in request.add.iter().flatten() {
            let Some(address) = RicAddress::from_tnl(&item.tnl_information) else {
                warn!("Invalid TNL information in E2 Connection Update: {:?}", item.tnl_information);
                return syntax_error();
            };
            info!("RIC requested a connection to {}", address);
            self.add_connection(item, address, &mut ack).await;
        }

        for item in request.remove.iter().flatten() {
            let Some(address) = RicAddress::from_tnl(&item.tnl_information) else {
                warn!("Invalid TNL information in E2 Connection Update: {:?}", item.tnl_information);
                return syntax_error();
            };
            info!("RIC requested removal of the connection to {}", address);
            self.remove_connection(address).await?;
        }

        if let Some(modify) = &request.modify {
            debug!("Ignoring {} connection modify items", modify.len());
        }
        Ok(Outcome::Success(ack))
    }
}
