//! Transition records for external pollers
//!
//! Every committed transition produces one `VaultEvent`. Events are published
//! after the transition commits, in commit order, with a strictly increasing
//! `sequence`. Rejected operations publish nothing.

use crate::identifiers::{Address, RecoveryId, TransactionId};
use crate::time::Timestamp;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of transition an event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Transaction proposed
    Proposed,
    /// Owner approval recorded
    Approved,
    /// Owner approval withdrawn
    Revoked,
    /// Transaction executed and its effect applied
    Executed,
    /// Transaction cancelled
    Cancelled,
    /// Call executed through a bypass module
    BypassExecuted,
    /// Governance operation applied during execution
    GovernanceApplied,
    /// Recovery initiated by a guardian
    RecoveryInitiated,
    /// Guardian approval recorded on a recovery
    RecoveryApproved,
    /// Recovery reached its guardian threshold and the time lock started
    RecoveryTimelockStarted,
    /// Recovery executed, owner set replaced
    RecoveryExecuted,
    /// Recovery cancelled by an owner
    RecoveryCancelled,
}

impl EventKind {
    /// Stable name for journal keying and log output
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Proposed => "proposed",
            EventKind::Approved => "approved",
            EventKind::Revoked => "revoked",
            EventKind::Executed => "executed",
            EventKind::Cancelled => "cancelled",
            EventKind::BypassExecuted => "bypass_executed",
            EventKind::GovernanceApplied => "governance_applied",
            EventKind::RecoveryInitiated => "recovery_initiated",
            EventKind::RecoveryApproved => "recovery_approved",
            EventKind::RecoveryTimelockStarted => "recovery_timelock_started",
            EventKind::RecoveryExecuted => "recovery_executed",
            EventKind::RecoveryCancelled => "recovery_cancelled",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSubject {
    /// A transaction or bypass execution
    Transaction(TransactionId),
    /// A guardian recovery
    Recovery(RecoveryId),
}

impl fmt::Display for EventSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSubject::Transaction(id) => id.fmt(f),
            EventSubject::Recovery(id) => id.fmt(f),
        }
    }
}

/// Structured record of one committed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    /// Position in the vault's event stream
    pub sequence: u64,
    /// Transaction or recovery the event refers to
    pub subject: EventSubject,
    /// Identity that caused the transition
    pub actor: Address,
    /// Transition kind
    pub kind: EventKind,
    /// Host time of the transition
    pub timestamp: Timestamp,
    /// Free-form context (governance label, bypass module)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Consumer of committed events
pub trait EventSink: Send + Sync {
    /// Receive one event. Called in commit order.
    fn record(&self, event: VaultEvent);
}

/// Event sink that keeps every event in memory for polling.
#[derive(Debug, Default)]
pub struct InMemoryEventLog {
    events: Mutex<Vec<VaultEvent>>,
}

impl InMemoryEventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().clone()
    }

    /// Events with `sequence >= from`
    pub fn since(&self, from: u64) -> Vec<VaultEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.sequence >= from)
            .cloned()
            .collect()
    }

    /// Kinds of the events recorded for `subject`, in order
    pub fn kinds_for(&self, subject: EventSubject) -> Vec<EventKind> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.subject == subject)
            .map(|event| event.kind)
            .collect()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for InMemoryEventLog {
    fn record(&self, event: VaultEvent) {
        self.events.lock().push(event);
    }
}

/// Event sink that forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: VaultEvent) {
        tracing::info!(
            sequence = event.sequence,
            subject = %event.subject,
            actor = %event.actor,
            kind = %event.kind,
            timestamp = event.timestamp.as_millis(),
            detail = event.detail.as_deref().unwrap_or(""),
            "vault event"
        );
    }
}
