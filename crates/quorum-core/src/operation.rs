//! Proposed operations
//!
//! A transaction's payload is a tagged variant rather than opaque bytes: either
//! a raw call to an external target or a governance operation that edits the
//! vault's own configuration. Governance operations flow through the same
//! propose/approve/execute pipeline as value transfers.

pub use crate::amount::Amount;
use crate::identifiers::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An external call: send `value` to `to` with optional call `data`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Call {
    /// Call target
    pub to: Address,
    /// Value transferred with the call
    #[serde(with = "crate::amount")]
    pub value: Amount,
    /// Call payload, empty for a plain transfer
    #[serde(with = "hex::serde", default)]
    pub data: Vec<u8>,
}

impl Call {
    /// Create a call with payload
    pub fn new(to: Address, value: Amount, data: Vec<u8>) -> Self {
        Self { to, value, data }
    }

    /// Create a plain value transfer
    pub fn transfer(to: Address, value: Amount) -> Self {
        Self {
            to,
            value,
            data: Vec::new(),
        }
    }

    /// Whether this call carries no payload
    pub fn is_plain_transfer(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "call(to={}, value={}, data={}B)",
            self.to,
            self.value,
            self.data.len()
        )
    }
}

/// Area of vault configuration a governance operation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GovernanceDomain {
    /// Owner set and approval threshold
    Owners,
    /// Whitelist bypass module
    Whitelist,
    /// Daily-limit bypass module
    DailyLimit,
    /// Guardian set, guardian threshold and recovery period
    Recovery,
}

/// Configuration edits that must pass through consensus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GovernanceOp {
    /// Add a new owner
    AddOwner {
        /// Owner to add
        owner: Address,
    },
    /// Remove an existing owner
    RemoveOwner {
        /// Owner to remove
        owner: Address,
    },
    /// Change the number of approvals required
    ChangeThreshold {
        /// New threshold
        threshold: u16,
    },
    /// Whitelist a target, optionally capping per-call value
    AddWhitelistEntry {
        /// Target to whitelist
        address: Address,
        /// Maximum value per bypass call, `None` for unlimited
        #[serde(default, with = "crate::amount::option")]
        cap: Option<Amount>,
    },
    /// Remove a whitelisted target
    RemoveWhitelistEntry {
        /// Target to remove
        address: Address,
    },
    /// Change the cap on an existing whitelist entry
    SetWhitelistCap {
        /// Whitelisted target
        address: Address,
        /// New cap, `None` for unlimited
        #[serde(default, with = "crate::amount::option")]
        cap: Option<Amount>,
    },
    /// Change the daily bypass budget
    SetDailyLimit {
        /// New budget per window
        #[serde(with = "crate::amount")]
        limit: Amount,
    },
    /// Replace the guardian set and guardian threshold
    SetGuardians {
        /// New guardians
        guardians: Vec<Address>,
        /// Guardian approvals required to arm a recovery
        threshold: u16,
    },
    /// Change the recovery time lock
    SetRecoveryPeriod {
        /// Time lock in milliseconds
        period_ms: u64,
    },
}

impl GovernanceOp {
    /// Stable label used in events and logs
    pub fn label(&self) -> &'static str {
        match self {
            GovernanceOp::AddOwner { .. } => "add_owner",
            GovernanceOp::RemoveOwner { .. } => "remove_owner",
            GovernanceOp::ChangeThreshold { .. } => "change_threshold",
            GovernanceOp::AddWhitelistEntry { .. } => "add_whitelist_entry",
            GovernanceOp::RemoveWhitelistEntry { .. } => "remove_whitelist_entry",
            GovernanceOp::SetWhitelistCap { .. } => "set_whitelist_cap",
            GovernanceOp::SetDailyLimit { .. } => "set_daily_limit",
            GovernanceOp::SetGuardians { .. } => "set_guardians",
            GovernanceOp::SetRecoveryPeriod { .. } => "set_recovery_period",
        }
    }

    /// Configuration area this operation edits
    pub fn domain(&self) -> GovernanceDomain {
        match self {
            GovernanceOp::AddOwner { .. }
            | GovernanceOp::RemoveOwner { .. }
            | GovernanceOp::ChangeThreshold { .. } => GovernanceDomain::Owners,
            GovernanceOp::AddWhitelistEntry { .. }
            | GovernanceOp::RemoveWhitelistEntry { .. }
            | GovernanceOp::SetWhitelistCap { .. } => GovernanceDomain::Whitelist,
            GovernanceOp::SetDailyLimit { .. } => GovernanceDomain::DailyLimit,
            GovernanceOp::SetGuardians { .. } | GovernanceOp::SetRecoveryPeriod { .. } => {
                GovernanceDomain::Recovery
            }
        }
    }
}

/// Payload of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    /// External call applied through the effect layer
    Call(Call),
    /// Edit of the vault's own configuration
    Governance(GovernanceOp),
}

impl Operation {
    /// External call, if this is one
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Operation::Call(call) => Some(call),
            Operation::Governance(_) => None,
        }
    }

    /// Governance operation, if this is one
    pub fn as_governance(&self) -> Option<&GovernanceOp> {
        match self {
            Operation::Call(_) => None,
            Operation::Governance(op) => Some(op),
        }
    }

    /// Value moved by this operation (zero for governance)
    pub fn value(&self) -> Amount {
        self.as_call().map_or(0, |call| call.value)
    }

    /// Short description for logs
    pub fn label(&self) -> String {
        match self {
            Operation::Call(call) => call.to_string(),
            Operation::Governance(op) => format!("governance({})", op.label()),
        }
    }
}

impl From<Call> for Operation {
    fn from(call: Call) -> Self {
        Operation::Call(call)
    }
}

impl From<GovernanceOp> for Operation {
    fn from(op: GovernanceOp) -> Self {
        Operation::Governance(op)
    }
}
