//! Watcher registry shared by the stores.
//!
//! Delivery uses `try_send` on bounded channels so that a slow watcher never
//! blocks the store that is publishing. An event for a full watcher is dropped
//! and logged; a watcher whose receiver is gone is unregistered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

/// Identifier of a registered watcher.
pub type WatcherId = u64;

/// Set of event subscribers.
#[derive(Debug)]
pub struct Watchers<E> {
    senders: Mutex<HashMap<WatcherId, mpsc::Sender<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for Watchers<E> {
    fn default() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<E: Clone> Watchers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a channel and returns its ID.
    pub fn add(&self, tx: mpsc::Sender<E>) -> WatcherId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, tx);
        id
    }

    /// Unregisters a watcher. Its channel closes once the last sender is dropped.
    pub fn remove(&self, id: WatcherId) {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Delivers an event to every watcher without waiting.
    pub fn send(&self, event: &E) {
        let mut senders = self.senders.lock().unwrap_or_else(PoisonError::into_inner);
        senders.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(watcher = id, "watcher channel full; event dropped");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    pub fn len(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
