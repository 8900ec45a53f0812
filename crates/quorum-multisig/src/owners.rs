//! Owner set and threshold policy
//!
//! `OwnerPolicy` is the authoritative list of owners together with the number
//! of distinct approvals a transaction needs. Every mutation validates before
//! writing, so `1 <= threshold <= owners.len()` holds in every reachable state.

use indexmap::IndexSet;
use quorum_core::{Address, QuorumError, QuorumResult};
use serde::{Deserialize, Serialize};

/// Owner identities and the approval threshold k.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerPolicy {
    owners: IndexSet<Address>,
    threshold: u16,
}

impl OwnerPolicy {
    /// Build a policy, rejecting null or duplicate owners and out-of-range thresholds.
    pub fn new(owners: impl IntoIterator<Item = Address>, threshold: u16) -> QuorumResult<Self> {
        let mut set = IndexSet::new();
        for owner in owners {
            if owner.is_zero() {
                return Err(QuorumError::validation("null address cannot be an owner"));
            }
            if !set.insert(owner) {
                return Err(QuorumError::validation(format!("duplicate owner {owner}")));
            }
        }
        check_threshold(threshold, set.len())?;
        Ok(Self {
            owners: set,
            threshold,
        })
    }

    /// Whether `address` is a current owner
    pub fn is_owner(&self, address: &Address) -> bool {
        self.owners.contains(address)
    }

    /// Fail with `Authorization` unless `address` is a current owner
    pub fn require_owner(&self, address: &Address) -> QuorumResult<()> {
        if self.is_owner(address) {
            Ok(())
        } else {
            Err(QuorumError::unauthorized(format!("{address} is not an owner")))
        }
    }

    /// Owners in insertion order
    pub fn owners(&self) -> impl Iterator<Item = &Address> {
        self.owners.iter()
    }

    /// Number of owners
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Always false for a constructed policy; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Required approvals
    pub fn threshold(&self) -> u16 {
        self.threshold
    }

    /// Add an owner that is neither present nor the null identity.
    pub fn add_owner(&mut self, owner: Address) -> QuorumResult<()> {
        if owner.is_zero() {
            return Err(QuorumError::validation("null address cannot be an owner"));
        }
        if self.owners.contains(&owner) {
            return Err(QuorumError::validation(format!(
                "{owner} is already an owner"
            )));
        }
        self.owners.insert(owner);
        Ok(())
    }

    /// Remove an owner, unless that would leave fewer owners than the threshold.
    pub fn remove_owner(&mut self, owner: &Address) -> QuorumResult<()> {
        if !self.owners.contains(owner) {
            return Err(QuorumError::validation(format!("{owner} is not an owner")));
        }
        let remaining = self.owners.len() - 1;
        if remaining < usize::from(self.threshold) {
            return Err(QuorumError::validation(format!(
                "removing {owner} would leave {remaining} owners below threshold {}",
                self.threshold
            )));
        }
        self.owners.shift_remove(owner);
        Ok(())
    }

    /// Change the threshold to `threshold` in `1..=len()`.
    pub fn change_threshold(&mut self, threshold: u16) -> QuorumResult<()> {
        check_threshold(threshold, self.owners.len())?;
        self.threshold = threshold;
        Ok(())
    }

    /// Replace owners and threshold wholesale, validating the replacement first.
    pub fn replace(
        &mut self,
        owners: impl IntoIterator<Item = Address>,
        threshold: u16,
    ) -> QuorumResult<()> {
        *self = Self::new(owners, threshold)?;
        Ok(())
    }
}

fn check_threshold(threshold: u16, owner_count: usize) -> QuorumResult<()> {
    if threshold == 0 || usize::from(threshold) > owner_count {
        return Err(QuorumError::validation(format!(
            "threshold {threshold} must be within 1..={owner_count}"
        )));
    }
    Ok(())
}
