//! E2 agent of one simulated node
//!
//! The agent owns the node's registry, stores and transaction pool, runs the
//! connection controller and supervises the primary connection to the node's
//! first configured controller. When that association drops, the supervisor
//! re-resolves the controller address and connects again.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use ransim_common::{Controller, Error, Model, Node, Result};
use ransim_e2ap::Dialer;

use super::addressing::RicAddress;
use super::backoff::{Backoff, BackoffConfig};
use super::connection::{E2Connection, E2ConnectionConfig};
use super::context::NodeContext;
use super::controller::{ConnectionController, ControllerConfig};
use super::transactions::TransactionIdPool;
use crate::servicemodel::{self, ServiceModelContext, ServiceModelRegistry};
use crate::store::{ConnectionStore, SubscriptionStore};
use crate::tasks::TaskState;

/// Configuration of an [`E2Agent`].
#[derive(Clone)]
pub struct E2AgentConfig {
    pub node_name: String,
    pub node: Node,
    pub model: Arc<Model>,
    pub dialer: Arc<dyn Dialer>,
    /// Dial and setup retry policy of the primary connection
    pub backoff: BackoffConfig,
    pub controller: ControllerConfig,
}

impl E2AgentConfig {
    /// Configuration with default retry and controller settings.
    pub fn new(node_name: impl Into<String>, node: Node, model: Arc<Model>, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            node_name: node_name.into(),
            node,
            model,
            dialer,
            backoff: BackoffConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

type CurrentConnection = Arc<Mutex<Option<Arc<E2Connection>>>>;

/// E2 agent of one node.
pub struct E2Agent {
    context: NodeContext,
    controller_config: ControllerConfig,
    state: Mutex<TaskState>,
    shutdown: CancellationToken,
    current: CurrentConnection,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for E2Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("E2Agent")
            .field("node", &self.context.node_name)
            .field("state", &self.state())
            .finish()
    }
}

impl E2Agent {
    /// Builds the agent and registers every service model the node enables.
    ///
    /// Two service models with the same RAN function ID fail with
    /// `AlreadyExists`.
    pub fn new(config: E2AgentConfig) -> Result<Self> {
        let subscriptions = Arc::new(SubscriptionStore::new());
        let sm_context = ServiceModelContext {
            node_name: config.node_name.clone(),
            node: config.node.clone(),
            model: config.model.clone(),
            subscriptions: subscriptions.clone(),
        };

        let registry = ServiceModelRegistry::new();
        for name in &config.node.service_models {
            let info = config.model.service_model(name)?;
            let sm = servicemodel::new_service_model(info, sm_context.clone())?;
            registry.register_service_model(sm)?;
        }

        let context = NodeContext {
            node_name: config.node_name,
            node: config.node,
            model: config.model,
            dialer: config.dialer,
            registry: Arc::new(registry),
            connections: Arc::new(ConnectionStore::new()),
            subscriptions,
            transactions: Arc::new(TransactionIdPool::new()),
            backoff: config.backoff,
        };

        Ok(Self {
            context,
            controller_config: config.controller,
            state: Mutex::new(TaskState::Created),
            shutdown: CancellationToken::new(),
            current: Arc::new(Mutex::new(None)),
            tasks: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    pub fn node_name(&self) -> &str {
        &self.context.node_name
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: TaskState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// The node's primary controller.
    fn primary_controller(&self) -> Result<Controller> {
        let name = self.context.node.controllers.first().ok_or_else(|| {
            Error::NotFound(format!("controller for node {}", self.context.node_name))
        })?;
        Ok(self.context.model.controller(name)?.clone())
    }

    /// Resolves the primary controller and starts the connection controller
    /// and the reconnect supervisor.
    pub async fn start(&self) -> Result<()> {
        if self.state() != TaskState::Created {
            return Err(Error::Invalid(format!(
                "agent of node {} is {}",
                self.context.node_name,
                self.state()
            )));
        }

        let controller = self.primary_controller()?;
        let address = RicAddress::resolve(&controller).await?;
        info!(
            "Starting E2 agent of node {} (controller {} at {})",
            self.context.node_name, controller.id, address
        );

        let controller_task = ConnectionController::start(
            self.context.clone(),
            self.controller_config,
            self.shutdown.child_token(),
        )
        .await?;

        let span = tracing::info_span!("e2agent", node = %self.context.node_name);
        let supervisor = tokio::spawn(
            supervise(
                self.context.clone(),
                controller,
                address,
                self.current.clone(),
                self.shutdown.clone(),
            )
            .instrument(span),
        );

        self.tasks.lock().await.extend([controller_task, supervisor]);
        self.set_state(TaskState::Running);
        Ok(())
    }

    /// Stops every task of the agent and closes all associations.
    pub async fn stop(&self) -> Result<()> {
        if matches!(self.state(), TaskState::Stopping | TaskState::Stopped) {
            return Ok(());
        }
        self.set_state(TaskState::Stopping);
        info!("Stopping E2 agent of node {}", self.context.node_name);
        self.shutdown.cancel();

        let current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(connection) = current {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection {}: {}", connection.id(), e);
            }
        }

        for connection in self.context.connections.list().await {
            if let Some(client) = &connection.client {
                if let Err(e) = client.close().await {
                    warn!("Failed to close connection {}: {}", connection.id, e);
                }
            }
        }

        for task in self.tasks.lock().await.drain(..) {
            if let Err(e) = task.await {
                warn!("E2 agent task of node {} failed: {}", self.context.node_name, e);
            }
        }
        self.set_state(TaskState::Stopped);
        info!("E2 agent of node {} stopped", self.context.node_name);
        Ok(())
    }
}

/// Keeps the primary connection up until `shutdown` is cancelled.
async fn supervise(
    node: NodeContext,
    controller: Controller,
    mut address: RicAddress,
    current: CurrentConnection,
    shutdown: CancellationToken,
) {
    let mut backoff = Backoff::new(node.backoff);
    loop {
        let connection = E2Connection::new(E2ConnectionConfig {
            node: node.clone(),
            address,
        });
        *current.lock().unwrap_or_else(PoisonError::into_inner) = Some(connection.clone());

        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = connection.connect_and_setup() => result,
        };
        let client = match result {
            Ok(client) => client,
            Err(e) => {
                warn!("Connection to {} failed: {}", address, e);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(backoff.next_delay()) => continue,
                }
            }
        };
        backoff.reset();

        let lost = client.context();
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = lost.cancelled() => {}
        }
        warn!("Connection {} lost, reconnecting", connection.id());
        if let Err(e) = connection.close().await {
            warn!("Failed to clean up connection {}: {}", connection.id(), e);
        }

        match RicAddress::resolve(&controller).await {
            Ok(resolved) => address = resolved,
            Err(e) => warn!(
                "Failed to resolve controller {}, reusing {}: {}",
                controller.id, address, e
            ),
        }
    }
    info!("Reconnect supervisor of node {} stopped", node.node_name);
}
