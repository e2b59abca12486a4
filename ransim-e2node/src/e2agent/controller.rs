//! Connection controller
//!
//! Level-triggered reconciliation of the connection store. Every store event
//! enqueues the connection ID; the worker re-reads the record and advances it
//! by at most one step:
//!
//! | (Phase, State) | Action | Next |
//! |---|---|---|
//! | (Open, Connecting), (Open, Disconnected) | dial | (Open, Connected) |
//! | (Open, Connected) | E2 Setup, or Configuration Update when another connection is initialized | (Open, Initialized) |
//! | (Open, Initialized) | none | |
//! | (Closed, any but Disconnected) | close the association | (Closed, Disconnected) |
//! | (Closed, Disconnected) | remove the record | removed |
//!
//! A failed step re-enqueues the ID after a backoff delay. Write-back is
//! unconditional (last write wins): two reconciles racing on the same ID are
//! not guarded against.

use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use ransim_common::{Error, Result};

use super::addressing::RicAddress;
use super::backoff::{Backoff, BackoffConfig};
use super::connection::{run_configuration_update, run_e2_setup, E2Connection, E2ConnectionConfig};
use super::context::NodeContext;
use crate::store::{Connection, ConnectionId, ConnectionState, ConnectionStatus, Phase, WatchOptions};
use crate::tasks::{Task, TaskHandle, TaskMessage};

/// Controller settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    /// Bound on the network part of one reconcile
    pub reconcile_timeout: Duration,
    /// Capacity of the event and work queues
    pub queue_capacity: usize,
    /// Delay policy for re-enqueueing failed reconciles
    pub retry: BackoffConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            reconcile_timeout: Duration::from_secs(30),
            queue_capacity: 1024,
            retry: BackoffConfig {
                initial: Duration::from_millis(50),
                max: Duration::from_secs(5),
                multiplier: 2.0,
                randomization: 0.2,
            },
        }
    }
}

/// Work items of the controller task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerMessage {
    Reconcile(ConnectionId),
}

/// Reconciler of one node's connection store.
pub struct ConnectionController {
    node: NodeContext,
    config: ControllerConfig,
    handle: TaskHandle<ControllerMessage>,
    retries: HashMap<ConnectionId, Backoff>,
}

impl ConnectionController {
    pub fn new(node: NodeContext, config: ControllerConfig, handle: TaskHandle<ControllerMessage>) -> Self {
        Self {
            node,
            config,
            handle,
            retries: HashMap::new(),
        }
    }

    /// Starts the controller task and the watcher feeding it. Both end when
    /// `shutdown` is cancelled.
    pub async fn start(
        node: NodeContext,
        config: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Result<JoinHandle<()>> {
        let (handle, rx) = TaskHandle::channel(config.queue_capacity);
        let (event_tx, mut event_rx) = mpsc::channel(config.queue_capacity);
        node.connections
            .watch(shutdown.child_token(), event_tx, WatchOptions { replay: true })
            .await?;

        let span = tracing::info_span!("controller", node = %node.node_name);
        let forward = handle.clone();
        tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        event = event_rx.recv() => {
                            let Some(event) = event else { break };
                            if forward.send(ControllerMessage::Reconcile(event.key)).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = forward.shutdown().await;
            }
            .instrument(span.clone()),
        );

        let mut controller = ConnectionController::new(node, config, handle);
        Ok(tokio::spawn(async move { controller.run(rx).await }.instrument(span)))
    }

    /// Advances connection `id` by one step.
    pub async fn reconcile(&self, id: &ConnectionId) -> Result<()> {
        let connection = match self.node.connections.get(id).await {
            Ok(connection) => connection,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(e),
        };
        debug!("Reconciling connection {} {}", id, connection.status);

        match (connection.status.phase, connection.status.state) {
            (Phase::Open, ConnectionState::Connecting | ConnectionState::Disconnected) => {
                self.dial(connection).await
            }
            (Phase::Open, ConnectionState::Connected) => self.initialize(connection).await,
            (Phase::Open, ConnectionState::Initialized | ConnectionState::Disconnecting) => Ok(()),
            (Phase::Closed, ConnectionState::Disconnected) => {
                info!("Removing connection {}", id);
                self.node.connections.remove(id).await
            }
            (Phase::Closed, _) => self.disconnect(connection).await,
        }
    }

    async fn with_timeout<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        timeout(self.config.reconcile_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("{what} after {:?}", self.config.reconcile_timeout)))?
    }

    async fn dial(&self, mut connection: Connection) -> Result<()> {
        let ip: IpAddr = connection.id.ric_ip_address.parse().map_err(|_| {
            Error::Invalid(format!("connection {} has no IP address", connection.id))
        })?;
        let port = u16::try_from(connection.id.ric_port)
            .map_err(|_| Error::Invalid(format!("connection {} has an invalid port", connection.id)))?;

        let e2_connection = E2Connection::new(E2ConnectionConfig {
            node: self.node.clone(),
            address: RicAddress::new(ip, port),
        });
        let client = self
            .with_timeout("connect", e2_connection.connect())
            .await?;

        connection.client = Some(client);
        connection.status = ConnectionStatus::new(Phase::Open, ConnectionState::Connected);
        self.node.connections.update(connection).await
    }

    async fn initialize(&self, mut connection: Connection) -> Result<()> {
        let Some(client) = connection.client.clone() else {
            warn!("Connection {} is connected without a client", connection.id);
            connection.status = ConnectionStatus::new(Phase::Open, ConnectionState::Connecting);
            return self.node.connections.update(connection).await;
        };

        let others_initialized = self.node.connections.list().await.iter().any(|c| {
            c.id != connection.id
                && c.status == ConnectionStatus::new(Phase::Open, ConnectionState::Initialized)
        });
        if others_initialized {
            self.with_timeout(
                "E2 node configuration update",
                run_configuration_update(&self.node, client.as_ref()),
            )
            .await?;
        } else {
            self.with_timeout("E2 setup", run_e2_setup(&self.node, client.as_ref()))
                .await?;
        }

        connection.status = ConnectionStatus::new(Phase::Open, ConnectionState::Initialized);
        self.node.connections.update(connection).await
    }

    async fn disconnect(&self, mut connection: Connection) -> Result<()> {
        if let Some(client) = connection.client.take() {
            let closed = timeout(self.config.reconcile_timeout, client.close()).await;
            if !matches!(closed, Ok(Ok(()))) {
                warn!("Connection {} did not close cleanly", connection.id);
            }
        }
        info!("Connection {} disconnected", connection.id);
        connection.status = ConnectionStatus::new(Phase::Closed, ConnectionState::Disconnected);
        self.node.connections.update(connection).await
    }

    fn retry_later(&mut self, id: ConnectionId) {
        let delay = self
            .retries
            .entry(id.clone())
            .or_insert_with(|| Backoff::new(self.config.retry))
            .next_delay();
        let handle = self.handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = handle.send(ControllerMessage::Reconcile(id)).await;
        });
    }
}

#[async_trait::async_trait]
impl Task for ConnectionController {
    type Message = ControllerMessage;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<ControllerMessage>>) {
        info!("Connection controller started");
        while let Some(msg) = rx.recv().await {
            let Some(ControllerMessage::Reconcile(id)) = msg.into_message() else {
                break;
            };
            match self.reconcile(&id).await {
                Ok(()) => {
                    self.retries.remove(&id);
                }
                Err(e) => {
                    warn!("Failed to reconcile connection {}: {}", id, e);
                    self.retry_later(id);
                }
            }
        }
        info!("Connection controller stopped");
    }
}
