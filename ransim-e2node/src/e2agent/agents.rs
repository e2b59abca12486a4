//! Agent manager: one [`E2Agent`] per simulated node.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use ransim_common::{Error, Model, Result};
use ransim_e2ap::Dialer;

use super::agent::{E2Agent, E2AgentConfig};
use super::backoff::BackoffConfig;
use super::controller::ControllerConfig;

/// Runs the E2 agents of a model.
pub struct E2Agents {
    model: Arc<Model>,
    dialer: Arc<dyn Dialer>,
    backoff: BackoffConfig,
    controller: ControllerConfig,
    agents: RwLock<BTreeMap<String, Arc<E2Agent>>>,
}

impl E2Agents {
    pub fn new(model: Arc<Model>, dialer: Arc<dyn Dialer>) -> Self {
        Self {
            model,
            dialer,
            backoff: BackoffConfig::default(),
            controller: ControllerConfig::default(),
            agents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Overrides the retry policy of agents started from now on.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_controller_config(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }

    /// Starts agents for `nodes`, or for every node of the model when empty.
    /// Stops at the first node that fails to start.
    pub async fn start(&self, nodes: &[String]) -> Result<()> {
        let names: Vec<String> = if nodes.is_empty() {
            self.model.nodes.keys().cloned().collect()
        } else {
            nodes.to_vec()
        };
        for name in &names {
            self.add(name).await?;
        }
        info!("Started {} E2 agent(s)", names.len());
        Ok(())
    }

    /// Builds and starts the agent of node `name`.
    pub async fn add(&self, name: &str) -> Result<Arc<E2Agent>> {
        if self.agents.read().await.contains_key(name) {
            return Err(Error::AlreadyExists(format!("agent for node {name}")));
        }
        let node = self.model.node(name)?.clone();
        let mut config = E2AgentConfig::new(name, node, self.model.clone(), self.dialer.clone());
        config.backoff = self.backoff;
        config.controller = self.controller;

        let agent = Arc::new(E2Agent::new(config)?);
        agent.start().await?;

        let mut agents = self.agents.write().await;
        if agents.contains_key(name) {
            drop(agents);
            agent.stop().await?;
            return Err(Error::AlreadyExists(format!("agent for node {name}")));
        }
        agents.insert(name.to_string(), agent.clone());
        Ok(agent)
    }

    /// Stops and forgets the agent of node `name`.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let agent = self
            .agents
            .write()
            .await
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("agent for node {name}")))?;
        agent.stop().await
    }

    pub async fn get(&self, name: &str) -> Option<Arc<E2Agent>> {
        self.agents.read().await.get(name).cloned()
    }

    pub async fn node_names(&self) -> Vec<String> {
        self.agents.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Stops every agent; failures are logged and do not stop the others.
    pub async fn stop_all(&self) {
        let agents: Vec<_> = std::mem::take(&mut *self.agents.write().await).into_values().collect();
        for agent in agents {
            if let Err(e) = agent.stop().await {
                warn!("Failed to stop agent of node {}: {}", agent.node_name(), e);
            }
        }
    }
}
