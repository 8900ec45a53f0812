//! Execution gate
//!
//! Tracks transactions whose external effect is currently being applied.
//! While an id is in flight, every mutation of that transaction (another
//! execute, approve, revoke, cancel) is refused. This is what stops an
//! effect that calls back into the vault from executing the same transaction
//! twice.

use quorum_core::{QuorumError, QuorumResult, TransactionId};
use std::collections::HashSet;

/// Set of transactions with an effect in flight.
#[derive(Debug, Default, Clone)]
pub struct ExecutionGate {
    in_flight: HashSet<TransactionId>,
}

impl ExecutionGate {
    /// Create an empty gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as in flight; fails if it already is.
    pub fn enter(&mut self, id: TransactionId) -> QuorumResult<()> {
        if !self.in_flight.insert(id) {
            return Err(QuorumError::state(format!(
                "execution of {id} is already in progress"
            )));
        }
        Ok(())
    }

    /// Clear the in-flight mark for `id`
    pub fn leave(&mut self, id: &TransactionId) {
        self.in_flight.remove(id);
    }

    /// Fail with `State` if `id` is in flight
    pub fn ensure_idle(&self, id: &TransactionId) -> QuorumResult<()> {
        if self.in_flight.contains(id) {
            return Err(QuorumError::state(format!(
                "{id} has an execution in progress"
            )));
        }
        Ok(())
    }

    /// Whether `id` is in flight
    pub fn is_in_flight(&self, id: &TransactionId) -> bool {
        self.in_flight.contains(id)
    }
}
