//! Transaction registry and approval ledger
//!
//! Owns every transaction ever proposed (arena + index) and the per-transaction
//! approval sets. All transitions take the live `OwnerPolicy` so role checks
//! and readiness always use the current owners and threshold.
//!
//! Execution is split into `begin_execution` / `commit_execution` /
//! `abort_execution` so the caller can apply the external effect between the
//! readiness check and the commit without leaving a half-executed record.

use crate::gate::ExecutionGate;
use crate::owners::OwnerPolicy;
use crate::transaction::{Transaction, TransactionStatus};
use quorum_core::{Address, Operation, QuorumError, QuorumResult, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// How proposals collect their first approval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Count the proposer as an approver at proposal time
    pub proposer_auto_approves: bool,
}

/// Registry of proposed transactions with their approval ledgers.
#[derive(Debug, Default)]
pub struct TransactionRegistry {
    transactions: Vec<Transaction>,
    index: HashMap<TransactionId, usize>,
    nonce: u64,
    gate: ExecutionGate,
    policy: ApprovalPolicy,
}

impl TransactionRegistry {
    /// Create an empty registry
    pub fn new(policy: ApprovalPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Approval policy in force
    pub fn policy(&self) -> ApprovalPolicy {
        self.policy
    }

    /// Mint a fresh id for `operation`, advancing the nonce.
    ///
    /// Bypass executions use the same sequence, so ids never collide with
    /// proposals even for identical calls.
    pub fn mint_id(&mut self, operation: &Operation) -> QuorumResult<TransactionId> {
        let encoded = bincode::serialize(operation)
            .map_err(|e| QuorumError::internal(format!("encoding operation: {e}")))?;
        let id = TransactionId::derive(&encoded, self.nonce);
        self.nonce += 1;
        Ok(id)
    }

    /// Number of ids minted so far
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Record a new pending transaction proposed by a current owner.
    pub fn propose(
        &mut self,
        owners: &OwnerPolicy,
        proposer: Address,
        operation: Operation,
        now: Timestamp,
    ) -> QuorumResult<TransactionId> {
        owners.require_owner(&proposer)?;
        let id = self.mint_id(&operation)?;
        let mut tx = Transaction::new(id, operation, proposer, now);
        if self.policy.proposer_auto_approves {
            tx.insert_approval(proposer);
        }
        debug!(tx_id = %id, proposer = %proposer, op = %tx.operation().label(), "transaction proposed");
        self.index.insert(id, self.transactions.len());
        self.transactions.push(tx);
        Ok(id)
    }

    /// Add `owner`'s approval to a pending transaction.
    pub fn approve(
        &mut self,
        owners: &OwnerPolicy,
        owner: Address,
        id: &TransactionId,
    ) -> QuorumResult<()> {
        owners.require_owner(&owner)?;
        self.gate.ensure_idle(id)?;
        let tx = self.pending_mut(id)?;
        if !tx.insert_approval(owner) {
            return Err(QuorumError::state(format!(
                "{owner} has already approved {id}"
            )));
        }
        debug!(tx_id = %id, owner = %owner, approvals = tx.approval_count(), "approval recorded");
        Ok(())
    }

    /// Withdraw `owner`'s approval from a pending transaction.
    ///
    /// Permitted after the threshold has been reached; the transaction simply
    /// stops being executable.
    pub fn revoke(
        &mut self,
        owners: &OwnerPolicy,
        owner: Address,
        id: &TransactionId,
    ) -> QuorumResult<()> {
        owners.require_owner(&owner)?;
        self.gate.ensure_idle(id)?;
        let tx = self.pending_mut(id)?;
        if !tx.remove_approval(&owner) {
            return Err(QuorumError::state(format!(
                "{owner} has no approval on {id} to revoke"
            )));
        }
        debug!(tx_id = %id, owner = %owner, approvals = tx.approval_count(), "approval revoked");
        Ok(())
    }

    /// `|approvers| >= threshold` and still pending.
    pub fn is_executable(&self, owners: &OwnerPolicy, id: &TransactionId) -> QuorumResult<bool> {
        let tx = self.lookup(id)?;
        Ok(ready(tx, owners))
    }

    /// Cancel a pending transaction.
    ///
    /// The proposer may cancel at any approval level; any other owner only
    /// once the transaction is executable.
    pub fn cancel(
        &mut self,
        owners: &OwnerPolicy,
        canceller: Address,
        id: &TransactionId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        owners.require_owner(&canceller)?;
        self.gate.ensure_idle(id)?;
        let executable = ready(self.lookup(id)?, owners);
        let tx = self.pending_mut(id)?;
        if tx.proposer() != canceller && !executable {
            return Err(QuorumError::unauthorized(format!(
                "{canceller} may only cancel {id} once it is executable"
            )));
        }
        tx.set_status(TransactionStatus::Cancelled { by: canceller, at: now });
        debug!(tx_id = %id, canceller = %canceller, "transaction cancelled");
        Ok(())
    }

    /// Check readiness and mark `id` in flight; returns the operation to apply.
    pub fn begin_execution(
        &mut self,
        owners: &OwnerPolicy,
        executor: Address,
        id: &TransactionId,
    ) -> QuorumResult<Operation> {
        owners.require_owner(&executor)?;
        self.gate.ensure_idle(id)?;
        let tx = self.lookup(id)?;
        if tx.status().is_terminal() {
            return Err(QuorumError::state(format!(
                "{id} is already {}",
                tx.status().as_str()
            )));
        }
        if !ready(tx, owners) {
            return Err(QuorumError::state(format!(
                "{id} has {} of {} required approvals",
                tx.approval_count(),
                owners.threshold()
            )));
        }
        let operation = tx.operation().clone();
        self.gate.enter(*id)?;
        Ok(operation)
    }

    /// Mark an in-flight transaction executed and release the gate.
    pub fn commit_execution(
        &mut self,
        id: &TransactionId,
        executor: Address,
        now: Timestamp,
    ) -> QuorumResult<()> {
        if !self.gate.is_in_flight(id) {
            return Err(QuorumError::internal(format!(
                "commit of {id} without a matching begin"
            )));
        }
        self.gate.leave(id);
        let tx = self.pending_mut(id)?;
        tx.set_status(TransactionStatus::Executed { executor, at: now });
        debug!(tx_id = %id, executor = %executor, "transaction executed");
        Ok(())
    }

    /// Release the gate without changing the transaction.
    pub fn abort_execution(&mut self, id: &TransactionId) {
        self.gate.leave(id);
        debug!(tx_id = %id, "execution rolled back");
    }

    /// Whether `id` has an effect in flight
    pub fn is_in_flight(&self, id: &TransactionId) -> bool {
        self.gate.is_in_flight(id)
    }

    /// Drop approvals held by identities that are no longer owners.
    ///
    /// Only pending transactions are touched. Terminal records and
    /// transactions whose effect is in flight keep the approvals they were
    /// decided with. Returns the number removed.
    pub fn prune_approvals(&mut self, owners: &OwnerPolicy) -> usize {
        let gate = &self.gate;
        let removed: usize = self
            .transactions
            .iter_mut()
            .filter(|tx| tx.is_pending() && !gate.is_in_flight(&tx.id()))
            .map(|tx| tx.retain_approvals(|approver| owners.is_owner(approver)))
            .sum();
        if removed > 0 {
            debug!(removed, "pruned approvals of former owners");
        }
        removed
    }

    /// Look up a transaction
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.index.get(id).map(|&slot| &self.transactions[slot])
    }

    /// All transactions in proposal order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }

    /// Pending transactions in proposal order
    pub fn pending(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter().filter(|tx| tx.is_pending())
    }

    /// Number of transactions ever proposed
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether nothing has been proposed
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn lookup(&self, id: &TransactionId) -> QuorumResult<&Transaction> {
        self.get(id)
            .ok_or_else(|| QuorumError::not_found(format!("unknown transaction {id}")))
    }

    fn pending_mut(&mut self, id: &TransactionId) -> QuorumResult<&mut Transaction> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| QuorumError::not_found(format!("unknown transaction {id}")))?;
        let tx = &mut self.transactions[slot];
        if tx.status().is_terminal() {
            return Err(QuorumError::state(format!(
                "{id} is already {}",
                tx.status().as_str()
            )));
        }
        Ok(tx)
    }
}

fn ready(tx: &Transaction, owners: &OwnerPolicy) -> bool {
    tx.is_pending() && tx.approval_count() >= usize::from(owners.threshold())
}
