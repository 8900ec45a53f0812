//! Proposed transactions
//!
//! ```text
//! Pending ──execute──▶ Executed
//!    │
//!    └────cancel─────▶ Cancelled
//! ```
//!
//! Both terminal states are final. A single status field holds the lifecycle,
//! so "executed and cancelled" is unrepresentable. Terminal transactions stay
//! in the registry as an audit record.

use indexmap::IndexSet;
use quorum_core::{Address, Amount, Operation, Timestamp, TransactionId};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Collecting approvals
    Pending,
    /// Effect applied
    Executed {
        /// Owner that executed
        executor: Address,
        /// Host time of execution
        at: Timestamp,
    },
    /// Withdrawn without effect
    Cancelled {
        /// Owner that cancelled
        by: Address,
        /// Host time of cancellation
        at: Timestamp,
    },
}

impl TransactionStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    /// Stable label for logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Executed { .. } => "executed",
            TransactionStatus::Cancelled { .. } => "cancelled",
        }
    }
}

/// A proposed operation and its approvals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    operation: Operation,
    proposer: Address,
    created_at: Timestamp,
    approvers: IndexSet<Address>,
    status: TransactionStatus,
}

impl Transaction {
    pub(crate) fn new(
        id: TransactionId,
        operation: Operation,
        proposer: Address,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            operation,
            proposer,
            created_at,
            approvers: IndexSet::new(),
            status: TransactionStatus::Pending,
        }
    }

    /// Transaction id
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Proposed operation
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Call target, `None` for governance operations
    pub fn to(&self) -> Option<Address> {
        self.operation.as_call().map(|call| call.to)
    }

    /// Value moved on execution
    pub fn value(&self) -> Amount {
        self.operation.value()
    }

    /// Owner that proposed
    pub fn proposer(&self) -> Address {
        self.proposer
    }

    /// Host time of the proposal
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Owners that currently approve, in approval order
    pub fn approvers(&self) -> impl Iterator<Item = &Address> {
        self.approvers.iter()
    }

    /// Number of distinct current approvals
    pub fn approval_count(&self) -> usize {
        self.approvers.len()
    }

    /// Whether `owner` currently approves
    pub fn has_approved(&self, owner: &Address) -> bool {
        self.approvers.contains(owner)
    }

    /// Lifecycle state
    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// Whether still collecting approvals
    pub fn is_pending(&self) -> bool {
        matches!(self.status, TransactionStatus::Pending)
    }

    /// Whether the effect was applied
    pub fn is_executed(&self) -> bool {
        matches!(self.status, TransactionStatus::Executed { .. })
    }

    /// Whether the transaction was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self.status, TransactionStatus::Cancelled { .. })
    }

    pub(crate) fn insert_approval(&mut self, owner: Address) -> bool {
        self.approvers.insert(owner)
    }

    pub(crate) fn remove_approval(&mut self, owner: &Address) -> bool {
        self.approvers.shift_remove(owner)
    }

    pub(crate) fn retain_approvals(&mut self, keep: impl FnMut(&Address) -> bool) -> usize {
        let before = self.approvers.len();
        self.approvers.retain(keep);
        before - self.approvers.len()
    }

    pub(crate) fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
    }
}
