//! Transaction ID pool for node-initiated procedures.
//!
//! E2 Setup and E2 Node Configuration Update each hold a transaction ID while
//! they are in flight. IDs are returned to the pool when the procedure ends,
//! whatever its outcome.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use ransim_e2ap::TransactionId;

use ransim_common::{Error, Result};

/// Pool of E2AP transaction IDs (0..=255).
#[derive(Debug, Default)]
pub struct TransactionIdPool {
    state: Mutex<PoolState>,
}

#[derive(Debug, Default)]
struct PoolState {
    in_use: BTreeSet<TransactionId>,
    next: TransactionId,
}

impl TransactionIdPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next free ID, scanning round-robin from the last allocation.
    pub fn allocate(&self) -> Result<TransactionId> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let start = state.next;
        let mut candidate = start;
        loop {
            if state.in_use.insert(candidate) {
                state.next = candidate.wrapping_add(1);
                return Ok(candidate);
            }
            candidate = candidate.wrapping_add(1);
            if candidate == start {
                return Err(Error::Unknown("transaction ID pool exhausted".into()));
            }
        }
    }

    /// Allocates an ID that goes back to the pool when the returned guard drops.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(Transaction {
            pool: self,
            id: self.allocate()?,
        })
    }

    /// Returns an ID to the pool. Releasing a free ID is a no-op.
    pub fn release(&self, id: TransactionId) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.in_use.remove(&id);
    }

    /// Number of IDs currently allocated.
    pub fn outstanding(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .in_use
            .len()
    }
}

/// An allocated transaction ID, released on drop.
#[derive(Debug)]
pub struct Transaction<'a> {
    pool: &'a TransactionIdPool,
    id: TransactionId,
}

impl Transaction<'_> {
    pub fn id(&self) -> TransactionId {
        self.id
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.pool.release(self.id);
    }
}
