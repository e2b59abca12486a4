//! In-memory stores shared by the E2 agent components

pub mod connections;
pub mod subscriptions;
pub mod watchers;

pub use connections::{
    Connection, ConnectionEvent, ConnectionId, ConnectionState, ConnectionStatus, ConnectionStore,
    EventKind, Phase, WatchOptions,
};
pub use subscriptions::{Subscription, SubscriptionId, SubscriptionStore, Ticker};
pub use watchers::{WatcherId, Watchers};
