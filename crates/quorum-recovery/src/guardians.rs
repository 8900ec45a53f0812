//! Guardian set configuration

use indexmap::IndexSet;
use quorum_core::{Address, QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Guardians, the approvals needed to arm a recovery, and the time lock.
///
/// An empty guardian set (threshold 0) disables recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianConfig {
    guardians: IndexSet<Address>,
    threshold: u16,
    period_ms: u64,
}

impl GuardianConfig {
    /// Build a configuration, validating set, threshold and period together.
    pub fn new(
        guardians: impl IntoIterator<Item = Address>,
        threshold: u16,
        period_ms: u64,
    ) -> QuorumResult<Self> {
        let mut set = IndexSet::new();
        for guardian in guardians {
            if guardian.is_zero() {
                return Err(QuorumError::validation("null address cannot be a guardian"));
            }
            if !set.insert(guardian) {
                return Err(QuorumError::validation(format!(
                    "duplicate guardian {guardian}"
                )));
            }
        }
        if set.is_empty() {
            if threshold != 0 {
                return Err(QuorumError::validation(
                    "guardian threshold must be 0 without guardians",
                ));
            }
        } else {
            if threshold == 0 || usize::from(threshold) > set.len() {
                return Err(QuorumError::validation(format!(
                    "guardian threshold {threshold} must be within 1..={}",
                    set.len()
                )));
            }
            if period_ms == 0 {
                return Err(QuorumError::validation(
                    "recovery period must be positive",
                ));
            }
        }
        Ok(Self {
            guardians: set,
            threshold,
            period_ms,
        })
    }

    /// Recovery switched off
    pub fn disabled() -> Self {
        Self {
            guardians: IndexSet::new(),
            threshold: 0,
            period_ms: 0,
        }
    }

    /// Whether any guardian is configured
    pub fn is_enabled(&self) -> bool {
        !self.guardians.is_empty()
    }

    /// Whether `address` is a guardian
    pub fn is_guardian(&self, address: &Address) -> bool {
        self.guardians.contains(address)
    }

    /// Fail with `Authorization` unless `address` is a guardian
    pub fn require_guardian(&self, address: &Address) -> QuorumResult<()> {
        if self.is_guardian(address) {
            Ok(())
        } else {
            Err(QuorumError::unauthorized(format!(
                "{address} is not a guardian"
            )))
        }
    }

    /// Guardians in insertion order
    pub fn guardians(&self) -> impl Iterator<Item = &Address> {
        self.guardians.iter()
    }

    /// Guardian approvals required
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Time lock in milliseconds
    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Time lock
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Same guardians with a different period, validated
    pub fn with_period(&self, period_ms: u64) -> QuorumResult<Self> {
        Self::new(self.guardians.iter().copied(), self.threshold, period_ms)
    }
}
