//! Recovery records
//!
//! ```text
//! Initiated ──threshold met──▶ Approved ──now >= execute_after──▶ (Executable) ──▶ Executed
//!     │                           │                                   │
//!     └───────────────────────────┴──────────── cancel ───────────────┴──▶ Cancelled
//! ```
//!
//! `Executable` is never stored; `Recovery::phase` derives it from the
//! latched `execute_after` and the caller's `now`.

use indexmap::IndexSet;
use quorum_core::{Address, RecoveryId, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stored lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecoveryStatus {
    /// Collecting guardian approvals
    Initiated,
    /// Guardian threshold reached, time lock running
    Approved,
    /// Owner set replaced
    Executed {
        /// Identity that triggered execution
        by: Address,
        /// Host time of execution
        at: Timestamp,
    },
    /// Withdrawn by an owner
    Cancelled {
        /// Owner that cancelled
        by: Address,
        /// Host time of cancellation
        at: Timestamp,
    },
}

impl RecoveryStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecoveryStatus::Executed { .. } | RecoveryStatus::Cancelled { .. }
        )
    }

    /// Stable label for logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryStatus::Initiated => "initiated",
            RecoveryStatus::Approved => "approved",
            RecoveryStatus::Executed { .. } => "executed",
            RecoveryStatus::Cancelled { .. } => "cancelled",
        }
    }
}

/// Phase as observed at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryPhase {
    /// Below guardian threshold
    Initiated,
    /// Time lock running
    Approved,
    /// Time lock elapsed, ready to execute
    Executable,
    /// Owner set replaced
    Executed,
    /// Withdrawn
    Cancelled,
}

/// Proposed replacement of the owner set, approved by guardians.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recovery {
    id: RecoveryId,
    proposed_owners: Vec<Address>,
    proposed_threshold: u16,
    guardian_approvals: IndexSet<Address>,
    threshold_at_init: u16,
    period_at_init_ms: u64,
    initiator: Address,
    created_at: Timestamp,
    execute_after: Option<Timestamp>,
    status: RecoveryStatus,
}

impl Recovery {
    pub(crate) fn new(
        id: RecoveryId,
        proposed_owners: Vec<Address>,
        proposed_threshold: u16,
        threshold_at_init: u16,
        period_at_init_ms: u64,
        initiator: Address,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            proposed_owners,
            proposed_threshold,
            guardian_approvals: IndexSet::new(),
            threshold_at_init,
            period_at_init_ms,
            initiator,
            created_at,
            execute_after: None,
            status: RecoveryStatus::Initiated,
        }
    }

    /// Recovery id
    pub fn id(&self) -> RecoveryId {
        self.id
    }

    /// Owners installed on execution
    pub fn proposed_owners(&self) -> &[Address] {
        &self.proposed_owners
    }

    /// Threshold installed on execution
    pub fn proposed_threshold(&self) -> u16 {
        self.proposed_threshold
    }

    /// Guardians that approved, in approval order
    pub fn guardian_approvals(&self) -> impl Iterator<Item = &Address> {
        self.guardian_approvals.iter()
    }

    /// Number of guardian approvals
    pub fn approval_count(&self) -> usize {
        self.guardian_approvals.len()
    }

    /// Whether `guardian` approved
    pub fn has_approved(&self, guardian: &Address) -> bool {
        self.guardian_approvals.contains(guardian)
    }

    /// Guardian threshold captured at initiation
    pub fn threshold_at_init(&self) -> u16 {
        self.threshold_at_init
    }

    /// Time lock captured at initiation, in milliseconds
    pub fn period_at_init_ms(&self) -> u64 {
        self.period_at_init_ms
    }

    /// Guardian that initiated
    pub fn initiator(&self) -> Address {
        self.initiator
    }

    /// Host time of initiation
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Earliest execution time, once latched
    pub fn execute_after(&self) -> Option<Timestamp> {
        self.execute_after
    }

    /// Stored status
    pub fn status(&self) -> RecoveryStatus {
        self.status
    }

    /// Whether `approval_count >= threshold_at_init`
    pub fn threshold_met(&self) -> bool {
        self.guardian_approvals.len() >= usize::from(self.threshold_at_init)
    }

    /// Phase at `now`
    pub fn phase(&self, now: Timestamp) -> RecoveryPhase {
        match self.status {
            RecoveryStatus::Initiated => RecoveryPhase::Initiated,
            RecoveryStatus::Approved => match self.execute_after {
                Some(after) if now >= after => RecoveryPhase::Executable,
                _ => RecoveryPhase::Approved,
            },
            RecoveryStatus::Executed { .. } => RecoveryPhase::Executed,
            RecoveryStatus::Cancelled { .. } => RecoveryPhase::Cancelled,
        }
    }

    pub(crate) fn insert_approval(&mut self, guardian: Address) -> bool {
        self.guardian_approvals.insert(guardian)
    }

    /// Latch the time lock the first time the threshold is met.
    ///
    /// Returns the newly latched `execute_after`, or `None` if the threshold
    /// is not met or the lock was already latched.
    pub(crate) fn latch_if_ready(&mut self, now: Timestamp) -> Option<Timestamp> {
        if self.execute_after.is_some() || !self.threshold_met() {
            return None;
        }
        let after = now.saturating_add(Duration::from_millis(self.period_at_init_ms));
        self.execute_after = Some(after);
        self.status = RecoveryStatus::Approved;
        Some(after)
    }

    pub(crate) fn set_status(&mut self, status: RecoveryStatus) {
        self.status = status;
    }
}
