//! Recording effect applier

use parking_lot::Mutex;
use quorum_core::{Address, Call, EffectApplier, EffectError, EffectReceipt};
use std::collections::HashSet;
use std::sync::Arc;

type ApplyHook = Arc<dyn Fn(&Call) + Send + Sync>;

/// Effect applier that records every successful call.
///
/// Calls to targets marked with `fail_calls_to` revert. A hook installed
/// with `on_apply` runs before each call is judged, which lets tests call
/// back into the vault from inside an effect.
#[derive(Default)]
pub struct RecordingApplier {
    applied: Mutex<Vec<Call>>,
    attempts: Mutex<usize>,
    failing: Mutex<HashSet<Address>>,
    hook: Mutex<Option<ApplyHook>>,
}

impl RecordingApplier {
    /// Create an applier that accepts every call
    pub fn new() -> Self {
        Self::default()
    }

    /// Make calls to `to` revert
    pub fn fail_calls_to(&self, to: Address) {
        self.failing.lock().insert(to);
    }

    /// Stop failing calls to `to`
    pub fn succeed_calls_to(&self, to: &Address) {
        self.failing.lock().remove(to);
    }

    /// Run `hook` at the start of every apply
    pub fn on_apply(&self, hook: impl Fn(&Call) + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    /// Calls applied successfully, in order
    pub fn applied(&self) -> Vec<Call> {
        self.applied.lock().clone()
    }

    /// Number of successful calls
    pub fn applied_count(&self) -> usize {
        self.applied.lock().len()
    }

    /// Number of apply attempts including failures
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl EffectApplier for RecordingApplier {
    fn apply(&self, call: &Call) -> Result<EffectReceipt, EffectError> {
        *self.attempts.lock() += 1;
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook(call);
        }
        if self.failing.lock().contains(&call.to) {
            return Err(EffectError::Reverted {
                to: call.to,
                reason: "target configured to fail".to_string(),
            });
        }
        self.applied.lock().push(call.clone());
        Ok(EffectReceipt::empty())
    }
}
