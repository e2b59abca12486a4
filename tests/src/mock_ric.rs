//! Mock RIC for integration testing
//!
//! A TCP server speaking the E2AP frame codec. It answers E2 Setup and E2 Node
//! Configuration Update on its own, records indications, and lets a test send
//! RIC Subscription, Subscription Delete, Control and E2 Connection Update
//! requests to any connected node.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use ransim_e2ap::procedures::*;
use ransim_e2ap::{read_frame, write_frame, Cause, E2apPdu, Frame, GlobalRicId, RanFunctionId};

/// Mock RIC errors
#[derive(Debug, Error)]
pub enum MockRicError {
    #[error("RIC not started")]
    NotStarted,
    #[error("Unknown association {0}")]
    UnknownAssociation(usize),
    #[error("Bind failed: {0}")]
    Bind(String),
    #[error("Association closed")]
    AssociationClosed,
    #[error("No answer within {0:?}")]
    Timeout(Duration),
    #[error("Unexpected answer: {0}")]
    UnexpectedAnswer(&'static str),
}

/// Association identifier, assigned in accept order starting at 1.
pub type AssociationId = usize;

/// Events emitted by the mock RIC
#[derive(Debug, Clone)]
pub enum MockRicEvent {
    /// A node opened an association
    NodeConnected { association: AssociationId },
    /// An association was closed by either side
    NodeDisconnected { association: AssociationId },
    /// E2 Setup Request received
    E2SetupReceived {
        association: AssociationId,
        gnb_id: u32,
        ran_functions: Vec<RanFunctionId>,
        accepted: bool,
    },
    /// E2 Node Configuration Update received
    ConfigurationUpdateReceived { association: AssociationId, gnb_id: Option<u32> },
    /// RIC Indication received
    Indication { association: AssociationId, indication: RicIndication },
    /// Error Indication received
    ErrorIndication { association: AssociationId, cause: Cause },
}

/// Mock RIC configuration
#[derive(Debug, Clone)]
pub struct MockRicConfig {
    /// Listen address; port 0 picks a free port
    pub listen_addr: SocketAddr,
    /// Near-RT RIC ID returned in E2 Setup Response
    pub ric_id: u32,
    /// Number of E2 Setup Requests to reject before accepting
    pub reject_setups: usize,
    /// How long to wait for a node's answer
    pub request_timeout: Duration,
}

impl Default for MockRicConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            ric_id: 1,
            reject_setups: 0,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// One node association
struct Association {
    outbound: mpsc::Sender<Frame>,
    pending: HashMap<u64, oneshot::Sender<E2apPdu>>,
    gnb_id: Option<u32>,
    closed: CancellationToken,
}

/// Mock RIC state
#[derive(Default)]
struct MockRicState {
    associations: HashMap<AssociationId, Association>,
    next_association: AssociationId,
    next_seq: u64,
    setups_received: usize,
    configuration_updates: usize,
    indications: Vec<RicIndication>,
}

/// Mock RIC for integration testing
pub struct MockRic {
    config: MockRicConfig,
    state: Arc<RwLock<MockRicState>>,
    event_tx: mpsc::Sender<MockRicEvent>,
    event_rx: Arc<Mutex<mpsc::Receiver<MockRicEvent>>>,
    local_addr: RwLock<Option<SocketAddr>>,
    shutdown: CancellationToken,
}

impl MockRic {
    /// Create a new mock RIC with default configuration
    pub fn new() -> Self {
        Self::with_config(MockRicConfig::default())
    }

    /// Create a new mock RIC with custom configuration
    pub fn with_config(config: MockRicConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1024);
        Self {
            config,
            state: Arc::new(RwLock::new(MockRicState::default())),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            local_addr: RwLock::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Bind the listener and start accepting nodes. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, MockRicError> {
        let listener = TcpListener::bind(self.config.listen_addr)
            .await
            .map_err(|e| MockRicError::Bind(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| MockRicError::Bind(e.to_string()))?;
        *self.local_addr.write().await = Some(addr);

        let ctx = AcceptContext {
            config: self.config.clone(),
            state: self.state.clone(),
            event_tx: self.event_tx.clone(),
            shutdown: self.shutdown.clone(),
        };
        tokio::spawn(accept_loop(listener, ctx));
        tracing::info!("Mock RIC started on {}", addr);
        Ok(addr)
    }

    /// Stop accepting and close every association
    pub async fn stop(&self) {
        self.shutdown.cancel();
        let mut state = self.state.write().await;
        for (_, association) in state.associations.drain() {
            association.closed.cancel();
        }
        tracing::info!("Mock RIC stopped");
    }

    /// Address the RIC listens on
    pub async fn local_addr(&self) -> Result<SocketAddr, MockRicError> {
        self.local_addr.read().await.ok_or(MockRicError::NotStarted)
    }

    /// Wait for the next event
    pub async fn next_event(&self) -> Option<MockRicEvent> {
        self.event_rx.lock().await.recv().await
    }

    /// Wait for the first event matching `pred`, skipping others
    pub async fn wait_for_event<F>(&self, wait: Duration, mut pred: F) -> Option<MockRicEvent>
    where
        F: FnMut(&MockRicEvent) -> bool,
    {
        timeout(wait, async {
            loop {
                let event = self.next_event().await?;
                if pred(&event) {
                    return Some(event);
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Number of open associations
    pub async fn association_count(&self) -> usize {
        self.state.read().await.associations.len()
    }

    /// IDs of the open associations
    pub async fn associations(&self) -> Vec<AssociationId> {
        let mut ids: Vec<_> = self.state.read().await.associations.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// gNB ID announced on `association`, once E2 Setup or Configuration Update was received
    pub async fn gnb_id(&self, association: AssociationId) -> Option<u32> {
        self.state
            .read()
            .await
            .associations
            .get(&association)
            .and_then(|a| a.gnb_id)
    }

    pub async fn setups_received(&self) -> usize {
        self.state.read().await.setups_received
    }

    pub async fn configuration_updates_received(&self) -> usize {
        self.state.read().await.configuration_updates
    }

    /// Indications received so far on all associations
    pub async fn indications(&self) -> Vec<RicIndication> {
        self.state.read().await.indications.clone()
    }

    /// Drop `association` as if the RIC went away
    pub async fn disconnect(&self, association: AssociationId) -> Result<(), MockRicError> {
        let association = self
            .state
            .write()
            .await
            .associations
            .remove(&association)
            .ok_or(MockRicError::UnknownAssociation(association))?;
        association.closed.cancel();
        Ok(())
    }

    /// Send a RIC-initiated PDU on `association` and wait for the answer
    pub async fn request(&self, association: AssociationId, pdu: E2apPdu) -> Result<E2apPdu, MockRicError> {
        let (tx, rx) = oneshot::channel();
        let (outbound, seq) = {
            let mut state = self.state.write().await;
            state.next_seq += 1;
            let seq = state.next_seq;
            let entry = state
                .associations
                .get_mut(&association)
                .ok_or(MockRicError::UnknownAssociation(association))?;
            entry.pending.insert(seq, tx);
            (entry.outbound.clone(), seq)
        };

        outbound
            .send(Frame { seq, pdu })
            .await
            .map_err(|_| MockRicError::AssociationClosed)?;
        match timeout(self.config.request_timeout, rx).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(_)) => Err(MockRicError::AssociationClosed),
            Err(_) => Err(MockRicError::Timeout(self.config.request_timeout)),
        }
    }

    /// RIC Subscription procedure
    pub async fn subscribe(
        &self,
        association: AssociationId,
        request: RicSubscriptionRequest,
    ) -> Result<Result<RicSubscriptionResponse, RicSubscriptionFailure>, MockRicError> {
        match self.request(association, E2apPdu::RicSubscriptionRequest(request)).await? {
            E2apPdu::RicSubscriptionResponse(resp) => Ok(Ok(resp)),
            E2apPdu::RicSubscriptionFailure(failure) => Ok(Err(failure)),
            other => Err(MockRicError::UnexpectedAnswer(other.message_type())),
        }
    }

    /// RIC Subscription Delete procedure
    pub async fn delete_subscription(
        &self,
        association: AssociationId,
        request: RicSubscriptionDeleteRequest,
    ) -> Result<Result<RicSubscriptionDeleteResponse, RicSubscriptionDeleteFailure>, MockRicError> {
        match self
            .request(association, E2apPdu::RicSubscriptionDeleteRequest(request))
            .await?
        {
            E2apPdu::RicSubscriptionDeleteResponse(resp) => Ok(Ok(resp)),
            E2apPdu::RicSubscriptionDeleteFailure(failure) => Ok(Err(failure)),
            other => Err(MockRicError::UnexpectedAnswer(other.message_type())),
        }
    }

    /// RIC Control procedure. Any other answer, such as an Error Indication,
    /// is returned as the raw PDU in `UnexpectedAnswer`.
    pub async fn control(
        &self,
        association: AssociationId,
        request: RicControlRequest,
    ) -> Result<Result<RicControlAcknowledge, RicControlFailure>, MockRicError> {
        match self.request(association, E2apPdu::RicControlRequest(request)).await? {
            E2apPdu::RicControlAcknowledge(ack) => Ok(Ok(ack)),
            E2apPdu::RicControlFailure(failure) => Ok(Err(failure)),
            other => Err(MockRicError::UnexpectedAnswer(other.message_type())),
        }
    }

    /// E2 Connection Update procedure
    pub async fn connection_update(
        &self,
        association: AssociationId,
        request: E2ConnectionUpdate,
    ) -> Result<Result<E2ConnectionUpdateAcknowledge, E2ConnectionUpdateFailure>, MockRicError> {
        match self.request(association, E2apPdu::E2ConnectionUpdate(request)).await? {
            E2apPdu::E2ConnectionUpdateAcknowledge(ack) => Ok(Ok(ack)),
            E2apPdu::E2ConnectionUpdateFailure(failure) => Ok(Err(failure)),
            other => Err(MockRicError::UnexpectedAnswer(other.message_type())),
        }
    }
}

impl Default for MockRic {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockRic {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Clone)]
struct AcceptContext {
    config: MockRicConfig,
    state: Arc<RwLock<MockRicState>>,
    event_tx: mpsc::Sender<MockRicEvent>,
    shutdown: CancellationToken,
}

async fn accept_loop(listener: TcpListener, ctx: AcceptContext) {
    loop {
        let stream = tokio::select! {
            _ = ctx.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    tracing::warn!("Mock RIC accept failed: {}", e);
                    continue;
                }
            },
        };
        serve(stream, ctx.clone()).await;
    }
}

async fn serve(stream: TcpStream, ctx: AcceptContext) {
    let (reader, writer) = stream.into_split();
    let (outbound, rx) = mpsc::channel(256);
    let closed = ctx.shutdown.child_token();

    let association = {
        let mut state = ctx.state.write().await;
        state.next_association += 1;
        let id = state.next_association;
        state.associations.insert(
            id,
            Association {
                outbound: outbound.clone(),
                pending: HashMap::new(),
                gnb_id: None,
                closed: closed.clone(),
            },
        );
        id
    };
    tracing::info!("Mock RIC accepted association {}", association);
    emit(&ctx.event_tx, MockRicEvent::NodeConnected { association });

    tokio::spawn(write_loop(writer, rx, closed.clone()));
    tokio::spawn(read_loop(reader, outbound, association, closed, ctx));
}

async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<Frame>, closed: CancellationToken) {
    loop {
        tokio::select! {
            _ = closed.cancelled() => break,
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if write_frame(&mut writer, &frame).await.is_err() {
                    break;
                }
            }
        }
    }
    closed.cancel();
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    outbound: mpsc::Sender<Frame>,
    association: AssociationId,
    closed: CancellationToken,
    ctx: AcceptContext,
) {
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = read_frame(&mut reader) => frame,
        };
        let Ok(Some(frame)) = frame else { break };
        if let Some(answer) = handle_frame(&ctx, association, frame.pdu, frame.seq).await {
            let _ = outbound
                .send(Frame {
                    seq: frame.seq,
                    pdu: answer,
                })
                .await;
        }
    }

    closed.cancel();
    ctx.state.write().await.associations.remove(&association);
    emit(&ctx.event_tx, MockRicEvent::NodeDisconnected { association });
    tracing::info!("Mock RIC association {} closed", association);
}

async fn handle_frame(
    ctx: &AcceptContext,
    association: AssociationId,
    pdu: E2apPdu,
    seq: u64,
) -> Option<E2apPdu> {
    match pdu {
        E2apPdu::E2SetupRequest(request) => {
            let gnb_id = request.global_e2_node_id.gnb_id;
            let accepted = {
                let mut state = ctx.state.write().await;
                state.setups_received += 1;
                let accepted = state.setups_received > ctx.config.reject_setups;
                if accepted {
                    if let Some(entry) = state.associations.get_mut(&association) {
                        entry.gnb_id = Some(gnb_id);
                    }
                }
                accepted
            };
            let ran_functions: Vec<_> = request.ran_functions.iter().map(|f| f.id).collect();
            emit(
                &ctx.event_tx,
                MockRicEvent::E2SetupReceived {
                    association,
                    gnb_id,
                    ran_functions: ran_functions.clone(),
                    accepted,
                },
            );

            Some(if accepted {
                E2apPdu::E2SetupResponse(E2SetupResponse {
                    transaction_id: request.transaction_id,
                    global_ric_id: GlobalRicId {
                        plmn_identity: request.global_e2_node_id.plmn_identity,
                        ric_id: ctx.config.ric_id,
                    },
                    ran_functions_accepted: ran_functions,
                    ran_functions_rejected: Vec::new(),
                })
            } else {
                E2apPdu::E2SetupFailure(E2SetupFailure {
                    transaction_id: request.transaction_id,
                    cause: Cause::MISC_UNSPECIFIED,
                    time_to_wait: None,
                })
            })
        }
        E2apPdu::E2NodeConfigurationUpdate(update) => {
            let gnb_id = update.global_e2_node_id.as_ref().map(|id| id.gnb_id);
            {
                let mut state = ctx.state.write().await;
                state.configuration_updates += 1;
                if let Some(entry) = state.associations.get_mut(&association) {
                    entry.gnb_id = gnb_id;
                }
            }
            emit(&ctx.event_tx, MockRicEvent::ConfigurationUpdateReceived { association, gnb_id });
            Some(E2apPdu::E2NodeConfigurationUpdateAcknowledge(
                E2NodeConfigurationUpdateAcknowledge {
                    transaction_id: update.transaction_id,
                    accepted_components: update
                        .component_config_additions
                        .iter()
                        .map(|c| c.component_id.clone())
                        .collect(),
                },
            ))
        }
        E2apPdu::RicIndication(indication) => {
            ctx.state.write().await.indications.push(indication.clone());
            emit(&ctx.event_tx, MockRicEvent::Indication { association, indication });
            None
        }
        E2apPdu::ErrorIndication { cause } => {
            emit(&ctx.event_tx, MockRicEvent::ErrorIndication { association, cause });
            // an error indication may also answer a pending request
            answer_pending(ctx, association, seq, E2apPdu::ErrorIndication { cause }).await;
            None
        }
        answer => {
            answer_pending(ctx, association, seq, answer).await;
            None
        }
    }
}

/// Queues an event; events are dropped while the test is not draining them.
fn emit(event_tx: &mpsc::Sender<MockRicEvent>, event: MockRicEvent) {
    if let Err(mpsc::error::TrySendError::Full(event)) = event_tx.try_send(event) {
        tracing::debug!("Mock RIC event queue full, dropping {:?}", event);
    }
}

async fn answer_pending(ctx: &AcceptContext, association: AssociationId, seq: u64, pdu: E2apPdu) {
    let waiter = ctx
        .state
        .write()
        .await
        .associations
        .get_mut(&association)
        .and_then(|a| a.pending.remove(&seq));
    match waiter {
        Some(tx) => {
            let _ = tx.send(pdu);
        }
        None => tracing::debug!(seq, "Mock RIC dropping unsolicited {}", pdu.message_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_binds_ephemeral_port() {
        let ric = MockRic::new();
        assert!(matches!(ric.local_addr().await, Err(MockRicError::NotStarted)));
        let addr = ric.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(ric.local_addr().await.unwrap(), addr);
        assert_eq!(ric.association_count().await, 0);
        ric.stop().await;
    }

    #[tokio::test]
    async fn test_request_to_unknown_association() {
        let ric = MockRic::new();
        ric.start().await.unwrap();
        let err = ric.disconnect(7).await.unwrap_err();
        assert!(matches!(err, MockRicError::UnknownAssociation(7)));
    }
}
