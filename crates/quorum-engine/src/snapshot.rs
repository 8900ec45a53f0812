//! Serializable view of the whole vault

use crate::state::{BypassRecord, VaultState};
use quorum_core::Address;
use quorum_modules::{DailyLimit, WhitelistEntry};
use quorum_multisig::{ApprovalPolicy, Transaction};
use quorum_recovery::{GuardianConfig, Recovery};
use serde::Serialize;

/// Point-in-time copy of every piece of vault state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultSnapshot {
    /// Current owners
    pub owners: Vec<Address>,
    /// Approvals required to execute
    pub threshold: u16,
    /// Whether proposers auto-approve
    pub approval_policy: ApprovalPolicy,
    /// Every transaction ever proposed, in proposal order
    pub transactions: Vec<Transaction>,
    /// Whitelisted targets
    pub whitelist: Vec<WhitelistEntry>,
    /// Daily budget as stored (not lazily reset)
    pub daily_limit: DailyLimit,
    /// Guardian configuration
    pub guardians: GuardianConfig,
    /// Every recovery ever initiated
    pub recoveries: Vec<Recovery>,
    /// Bypass executions
    pub bypass_log: Vec<BypassRecord>,
}

impl VaultSnapshot {
    pub(crate) fn capture(state: &VaultState) -> Self {
        Self {
            owners: state.owners.owners().copied().collect(),
            threshold: state.owners.threshold(),
            approval_policy: state.registry.policy(),
            transactions: state.registry.iter().cloned().collect(),
            whitelist: state.whitelist.entries().copied().collect(),
            daily_limit: state.daily_limit,
            guardians: state.recovery.config().clone(),
            recoveries: state.recovery.iter().cloned().collect(),
            bypass_log: state.bypass_log.clone(),
        }
    }
}
