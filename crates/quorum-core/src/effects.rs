//! External effect application
//!
//! The engine decides *whether* a call may happen; performing it belongs to
//! the host. Whatever implements `EffectApplier` is authoritative: an `Err`
//! makes the surrounding execute roll back as a unit.
//!
//! Implementations may call back into the vault (the host ledger allows
//! reentrant calls). The vault rejects such calls on any transaction whose
//! effect is still in flight.

use crate::identifiers::Address;
use crate::operation::Call;
use crate::QuorumError;
use serde::{Deserialize, Serialize};

/// Result data returned by a successful effect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectReceipt {
    /// Raw return data from the call target
    #[serde(with = "hex::serde", default)]
    pub return_data: Vec<u8>,
}

impl EffectReceipt {
    /// Receipt carrying no return data
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Failure reported by the effect layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum EffectError {
    /// The call target rejected the call
    #[error("call to {to} reverted: {reason}")]
    Reverted {
        /// Call target
        to: Address,
        /// Reason reported by the target
        reason: String,
    },
    /// The effect layer could not attempt the call
    #[error("effect layer unavailable: {reason}")]
    Unavailable {
        /// Reason reported by the host
        reason: String,
    },
}

impl From<EffectError> for QuorumError {
    fn from(err: EffectError) -> Self {
        QuorumError::effect_failure(err.to_string())
    }
}

/// Performs external calls on behalf of the vault
pub trait EffectApplier: Send + Sync {
    /// Perform `call`. Success or failure is authoritative for the commit.
    fn apply(&self, call: &Call) -> Result<EffectReceipt, EffectError>;
}
