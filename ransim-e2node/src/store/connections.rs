//! Connection store
//!
//! Holds one record per RIC endpoint the node is (or wants to be) connected
//! to. The record's [`Phase`] is the target set by whoever requests a change;
//! its [`ConnectionState`] is the progress made by the connection controller.
//!
//! ```text
//!  Open:   Connecting/Disconnected --> Connected --> Initialized
//!  Closed: Initialized/Connected/Disconnecting --> Disconnected --> (removed)
//! ```
//!
//! Writes are unconditional (last write wins). Every mutation is published to
//! watchers registered with [`ConnectionStore::watch`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ransim_common::{Error, Result};
use ransim_e2ap::E2ClientConn;

use super::watchers::Watchers;

/// Identity of a RIC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId {
    pub ric_ip_address: String,
    pub ric_port: u64,
}

impl ConnectionId {
    pub fn new(ric_ip_address: impl Into<String>, ric_port: u64) -> Self {
        Self {
            ric_ip_address: ric_ip_address.into(),
            ric_port,
        }
    }

    /// `host:port` form suitable for dialing.
    pub fn dial_address(&self) -> String {
        if self.ric_ip_address.contains(':') {
            format!("[{}]:{}", self.ric_ip_address, self.ric_port)
        } else {
            format!("{}:{}", self.ric_ip_address, self.ric_port)
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ric_ip_address.is_empty() || self.ric_port == 0 {
            return Err(Error::Invalid(format!(
                "connection ID {self} needs a RIC address and a non-zero port"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dial_address())
    }
}

/// Target phase of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Open => write!(f, "Open"),
            Phase::Closed => write!(f, "Closed"),
        }
    }
}

/// Observed progress of a connection toward its phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    /// E2 Setup or Configuration Update completed
    Initialized,
    Disconnecting,
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Initialized => write!(f, "Initialized"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Phase and state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub phase: Phase,
    pub state: ConnectionState,
}

impl ConnectionStatus {
    pub const fn new(phase: Phase, state: ConnectionState) -> Self {
        Self { phase, state }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.phase, self.state)
    }
}

/// Connection record.
#[derive(Clone)]
pub struct Connection {
    pub id: ConnectionId,
    /// Wire association, present once dialed
    pub client: Option<Arc<dyn E2ClientConn>>,
    pub status: ConnectionStatus,
}

impl Connection {
    /// A record without a client.
    pub fn new(id: ConnectionId, status: ConnectionStatus) -> Self {
        Self {
            id,
            client: None,
            status,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("client", &self.client.as_ref().map(|_| "E2ClientConn"))
            .field("status", &self.status)
            .finish()
    }
}

impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        let same_client = match (&self.client, &other.client) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::eq(
                Arc::as_ptr(a) as *const (),
                Arc::as_ptr(b) as *const (),
            ),
            _ => false,
        };
        self.id == other.id && self.status == other.status && same_client
    }
}

/// Kind of store event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Replay of an existing record
    None,
    Created,
    Updated,
    Deleted,
}

/// Store event delivered to watchers.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    pub key: ConnectionId,
    /// Record after the mutation; `None` for a delete of an absent key
    pub value: Option<Connection>,
    pub kind: EventKind,
}

/// Options for [`ConnectionStore::watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Also deliver every current record as an [`EventKind::None`] event
    pub replay: bool,
}

/// Concurrent map of connections with watch support.
#[derive(Default)]
pub struct ConnectionStore {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
    watchers: Arc<Watchers<ConnectionEvent>>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a connection, overwriting an existing record, and publishes `Created`.
    pub async fn add(&self, id: &ConnectionId, connection: Connection) -> Result<()> {
        id.validate()?;
        let mut connections = self.connections.write().await;
        debug!("Adding connection {} {}", id, connection.status);
        connections.insert(id.clone(), connection.clone());
        self.watchers.send(&ConnectionEvent {
            key: id.clone(),
            value: Some(connection),
            kind: EventKind::Created,
        });
        Ok(())
    }

    pub async fn get(&self, id: &ConnectionId) -> Result<Connection> {
        self.connections
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("connection {id}")))
    }

    /// Stores the record under its own ID and publishes `Updated`.
    pub async fn update(&self, connection: Connection) -> Result<()> {
        let mut connections = self.connections.write().await;
        debug!("Updating connection {} {}", connection.id, connection.status);
        connections.insert(connection.id.clone(), connection.clone());
        self.watchers.send(&ConnectionEvent {
            key: connection.id.clone(),
            value: Some(connection),
            kind: EventKind::Updated,
        });
        Ok(())
    }

    /// Deletes a record and publishes `Deleted`, even when the key was absent.
    pub async fn remove(&self, id: &ConnectionId) -> Result<()> {
        let mut connections = self.connections.write().await;
        let removed = connections.remove(id);
        debug!("Removed connection {} (present: {})", id, removed.is_some());
        self.watchers.send(&ConnectionEvent {
            key: id.clone(),
            value: removed,
            kind: EventKind::Deleted,
        });
        Ok(())
    }

    pub async fn list(&self) -> Vec<Connection> {
        self.connections.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Registers `tx` for store events until `ctx` is cancelled or the receiver
    /// is dropped.
    ///
    /// Replay is best effort: records mutated while the replay is in progress
    /// may be delivered twice or only through their live event.
    pub async fn watch(
        &self,
        ctx: CancellationToken,
        tx: mpsc::Sender<ConnectionEvent>,
        options: WatchOptions,
    ) -> Result<()> {
        let id = self.watchers.add(tx.clone());

        let watchers = self.watchers.clone();
        let closed = tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = closed.closed() => {}
            }
            watchers.remove(id);
        });

        if options.replay {
            let snapshot = self.list().await;
            tokio::spawn(async move {
                for connection in snapshot {
                    let event = ConnectionEvent {
                        key: connection.id.clone(),
                        value: Some(connection),
                        kind: EventKind::None,
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
        }
        Ok(())
    }
}
