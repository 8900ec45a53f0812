//! Mutable vault state
//!
//! Everything a `Vault` guards lives here. Events produced by a transition
//! are staged in the outbox and only get a sequence number when the vault
//! publishes them after the transition commits.

use quorum_core::{
    Address, Call, EventKind, EventSubject, QuorumResult, Timestamp, TransactionId, VaultEvent,
};
use quorum_modules::{DailyLimit, Whitelist};
use quorum_multisig::{OwnerPolicy, TransactionRegistry};
use quorum_recovery::RecoveryEngine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bypass module that authorized a direct execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassModule {
    /// Target is whitelisted and value within cap
    Whitelist,
    /// Plain transfer within the remaining daily budget
    DailyLimit,
}

impl BypassModule {
    /// Stable label for events and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BypassModule::Whitelist => "whitelist",
            BypassModule::DailyLimit => "daily_limit",
        }
    }
}

impl fmt::Display for BypassModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of a call executed through a bypass module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassRecord {
    /// Id minted from the proposal nonce sequence
    pub id: TransactionId,
    /// Module that authorized the call
    pub module: BypassModule,
    /// Owner that executed
    pub executor: Address,
    /// Applied call
    pub call: Call,
    /// Host time of execution
    pub executed_at: Timestamp,
}

#[derive(Debug)]
pub(crate) struct VaultState {
    pub(crate) owners: OwnerPolicy,
    pub(crate) registry: TransactionRegistry,
    pub(crate) whitelist: Whitelist,
    pub(crate) daily_limit: DailyLimit,
    pub(crate) recovery: RecoveryEngine,
    pub(crate) bypass_log: Vec<BypassRecord>,
    next_sequence: u64,
    outbox: Vec<VaultEvent>,
}

impl VaultState {
    pub(crate) fn new(
        owners: OwnerPolicy,
        registry: TransactionRegistry,
        whitelist: Whitelist,
        daily_limit: DailyLimit,
        recovery: RecoveryEngine,
    ) -> Self {
        Self {
            owners,
            registry,
            whitelist,
            daily_limit,
            recovery,
            bypass_log: Vec::new(),
            next_sequence: 0,
            outbox: Vec::new(),
        }
    }

    /// Stage an event for publication after commit
    pub(crate) fn emit(
        &mut self,
        subject: EventSubject,
        actor: Address,
        kind: EventKind,
        timestamp: Timestamp,
        detail: Option<String>,
    ) {
        self.outbox.push(VaultEvent {
            sequence: 0,
            subject,
            actor,
            kind,
            timestamp,
            detail,
        });
    }

    pub(crate) fn outbox_mark(&self) -> usize {
        self.outbox.len()
    }

    /// Drop events staged after `mark` by a transition that failed
    pub(crate) fn discard_since(&mut self, mark: usize) {
        self.outbox.truncate(mark);
    }

    /// Take staged events, numbering them in commit order
    pub(crate) fn drain_outbox(&mut self) -> Vec<VaultEvent> {
        let mut events = std::mem::take(&mut self.outbox);
        for event in &mut events {
            event.sequence = self.next_sequence;
            self.next_sequence += 1;
        }
        events
    }

    /// Record a committed bypass execution and stage its event
    pub(crate) fn record_bypass(
        &mut self,
        module: BypassModule,
        executor: Address,
        call: Call,
        now: Timestamp,
    ) -> QuorumResult<TransactionId> {
        let id = self.registry.mint_id(&call.clone().into())?;
        self.bypass_log.push(BypassRecord {
            id,
            module,
            executor,
            call,
            executed_at: now,
        });
        self.emit(
            EventSubject::Transaction(id),
            executor,
            EventKind::BypassExecuted,
            now,
            Some(module.as_str().to_string()),
        );
        Ok(id)
    }
}
