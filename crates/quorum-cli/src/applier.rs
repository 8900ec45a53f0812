//! Simulated effect layer for script replay

use parking_lot::Mutex;
use quorum_core::{Address, Call, EffectApplier, EffectError, EffectReceipt};
use std::collections::HashSet;
use tracing::debug;

/// Accepts every call except those to targets marked as reverting.
#[derive(Debug, Default)]
pub struct SimulatedApplier {
    reverting: HashSet<Address>,
    applied: Mutex<Vec<Call>>,
}

impl SimulatedApplier {
    pub fn new(reverting: impl IntoIterator<Item = Address>) -> Self {
        Self {
            reverting: reverting.into_iter().collect(),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Calls that succeeded, in order
    pub fn applied(&self) -> Vec<Call> {
        self.applied.lock().clone()
    }
}

impl EffectApplier for SimulatedApplier {
    fn apply(&self, call: &Call) -> Result<EffectReceipt, EffectError> {
        if self.reverting.contains(&call.to) {
            debug!(%call, "simulated revert");
            return Err(EffectError::Reverted {
                to: call.to,
                reason: "target configured to revert".to_string(),
            });
        }
        debug!(%call, "simulated call");
        self.applied.lock().push(call.clone());
        Ok(EffectReceipt::empty())
    }
}
