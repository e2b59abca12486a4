//! In-process stand-ins for the wire transport used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use ransim_e2ap::procedures::*;
use ransim_e2ap::{
    Cause, ConfigurationUpdateOutcome, Dialer, E2ClientConn, E2NodeHandler, E2SetupOutcome,
    E2apError, GlobalRicId, Outcome,
};

/// How a [`RecordingClient`] answers node-initiated procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject,
    TransportError,
}

/// Client that answers setup procedures per [`Reply`] and records indications.
pub struct RecordingClient {
    ctx: CancellationToken,
    reply: Mutex<Reply>,
    pub setups: AtomicUsize,
    pub config_updates: AtomicUsize,
    indications: Mutex<Vec<RicIndication>>,
    indication_tx: Mutex<Option<mpsc::UnboundedSender<RicIndication>>>,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Self::with_reply(Reply::Accept)
    }

    pub fn with_reply(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            ctx: CancellationToken::new(),
            reply: Mutex::new(reply),
            setups: AtomicUsize::new(0),
            config_updates: AtomicUsize::new(0),
            indications: Mutex::new(Vec::new()),
            indication_tx: Mutex::new(None),
        })
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    /// Streams every indication sent from now on.
    pub fn subscribe_indications(&self) -> mpsc::UnboundedReceiver<RicIndication> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.indication_tx.lock().unwrap() = Some(tx);
        rx
    }

    pub fn indications(&self) -> Vec<RicIndication> {
        self.indications.lock().unwrap().clone()
    }

    /// Simulates the peer dropping the association.
    pub fn drop_association(&self) {
        self.ctx.cancel();
    }

    fn reply(&self) -> Reply {
        *self.reply.lock().unwrap()
    }
}

#[async_trait]
impl E2ClientConn for RecordingClient {
    async fn e2_setup(&self, request: E2SetupRequest) -> Result<E2SetupOutcome, E2apError> {
        self.setups.fetch_add(1, Ordering::SeqCst);
        match self.reply() {
            Reply::Accept => Ok(Outcome::Success(E2SetupResponse {
                transaction_id: request.transaction_id,
                global_ric_id: GlobalRicId {
                    plmn_identity: request.global_e2_node_id.plmn_identity,
                    ric_id: 1,
                },
                ran_functions_accepted: request.ran_functions.iter().map(|f| f.id).collect(),
                ran_functions_rejected: Vec::new(),
            })),
            Reply::Reject => Ok(Outcome::Failure(E2SetupFailure {
                transaction_id: request.transaction_id,
                cause: Cause::MISC_UNSPECIFIED,
                time_to_wait: None,
            })),
            Reply::TransportError => Err(E2apError::ConnectionClosed),
        }
    }

    async fn e2_configuration_update(
        &self,
        request: E2NodeConfigurationUpdate,
    ) -> Result<ConfigurationUpdateOutcome, E2apError> {
        self.config_updates.fetch_add(1, Ordering::SeqCst);
        match self.reply() {
            Reply::Accept => Ok(Outcome::Success(E2NodeConfigurationUpdateAcknowledge {
                transaction_id: request.transaction_id,
                accepted_components: request
                    .component_config_additions
                    .iter()
                    .map(|c| c.component_id.clone())
                    .collect(),
            })),
            Reply::Reject => Ok(Outcome::Failure(E2NodeConfigurationUpdateFailure {
                transaction_id: request.transaction_id,
                cause: Cause::MISC_UNSPECIFIED,
                time_to_wait: None,
            })),
            Reply::TransportError => Err(E2apError::ConnectionClosed),
        }
    }

    async fn ric_indication(&self, indication: RicIndication) -> Result<(), E2apError> {
        if self.ctx.is_cancelled() {
            return Err(E2apError::ConnectionClosed);
        }
        if let Some(tx) = self.indication_tx.lock().unwrap().as_ref() {
            let _ = tx.send(indication.clone());
        }
        self.indications.lock().unwrap().push(indication);
        Ok(())
    }

    async fn close(&self) -> Result<(), E2apError> {
        self.ctx.cancel();
        Ok(())
    }

    fn context(&self) -> CancellationToken {
        self.ctx.clone()
    }
}

/// Dialer handing out queued clients, failing when the queue is empty or
/// while `fail` is set.
#[derive(Default)]
pub struct MockDialer {
    clients: Mutex<VecDeque<Arc<RecordingClient>>>,
    pub dials: AtomicUsize,
    fail: Mutex<bool>,
    handlers: Mutex<Vec<Arc<dyn E2NodeHandler>>>,
}

impl MockDialer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A dialer whose next `n` dials succeed with fresh accepting clients.
    pub fn with_clients(n: usize) -> Arc<Self> {
        let dialer = Self::new();
        for _ in 0..n {
            dialer.push(RecordingClient::new());
        }
        dialer
    }

    pub fn push(&self, client: Arc<RecordingClient>) {
        self.clients.lock().unwrap().push_back(client);
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    /// Handlers passed to successful dials, oldest first.
    pub fn handlers(&self) -> Vec<Arc<dyn E2NodeHandler>> {
        self.handlers.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn connect(
        &self,
        _address: &str,
        handler: Arc<dyn E2NodeHandler>,
    ) -> Result<Arc<dyn E2ClientConn>, E2apError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(E2apError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        let client = self
            .clients
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(E2apError::ConnectionClosed)?;
        self.handlers.lock().unwrap().push(handler);
        Ok(client)
    }
}
