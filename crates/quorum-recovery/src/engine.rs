//! Recovery state machine
//!
//! Guardians initiate and approve recoveries; any owner can cancel one; anyone
//! can execute one once its time lock has elapsed. Execution replaces the live
//! owner policy in a single step.
//!
//! Each recovery captures the guardian threshold and period at initiation and
//! never re-reads them. The guardian configuration itself is frozen while any
//! recovery is still open.

use crate::guardians::GuardianConfig;
use crate::recovery::{Recovery, RecoveryPhase, RecoveryStatus};
use quorum_core::config::DEFAULT_RECOVERY_PERIOD_MS;
use quorum_core::{Address, QuorumError, QuorumResult, RecoveryId, Timestamp};
use quorum_multisig::OwnerPolicy;
use std::collections::HashMap;
use tracing::debug;

/// Result of an initiation or guardian approval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryProgress {
    /// Recovery that advanced
    pub id: RecoveryId,
    /// Guardian approvals after the step
    pub approvals: usize,
    /// Set when this step reached the threshold and started the time lock
    pub timelock_started: Option<Timestamp>,
}

/// All recoveries plus the guardian configuration they run under.
#[derive(Debug, Clone)]
pub struct RecoveryEngine {
    config: GuardianConfig,
    recoveries: Vec<Recovery>,
    index: HashMap<RecoveryId, usize>,
    nonce: u64,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self::new(GuardianConfig::disabled())
    }
}

impl RecoveryEngine {
    /// Create an engine with no recoveries
    pub fn new(config: GuardianConfig) -> Self {
        Self {
            config,
            recoveries: Vec::new(),
            index: HashMap::new(),
            nonce: 0,
        }
    }

    /// Live guardian configuration
    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    /// Open a recovery proposing `new_owners` with `new_threshold`.
    ///
    /// The initiating guardian's approval is recorded immediately, so a
    /// guardian threshold of one starts the time lock at initiation.
    pub fn initiate(
        &mut self,
        guardian: Address,
        new_owners: Vec<Address>,
        new_threshold: u16,
        now: Timestamp,
    ) -> QuorumResult<RecoveryProgress> {
        self.config.require_guardian(&guardian)?;
        OwnerPolicy::new(new_owners.iter().copied(), new_threshold)?;

        let encoded = bincode::serialize(&(&new_owners, new_threshold))
            .map_err(|e| QuorumError::internal(format!("encoding recovery request: {e}")))?;
        let id = RecoveryId::derive(&encoded, self.nonce);
        self.nonce += 1;

        let mut recovery = Recovery::new(
            id,
            new_owners,
            new_threshold,
            self.config.threshold(),
            self.config.period_ms(),
            guardian,
            now,
        );
        recovery.insert_approval(guardian);
        let timelock_started = recovery.latch_if_ready(now);
        debug!(
            recovery_id = %id,
            guardian = %guardian,
            threshold_at_init = recovery.threshold_at_init(),
            "recovery initiated"
        );

        self.index.insert(id, self.recoveries.len());
        self.recoveries.push(recovery);
        Ok(RecoveryProgress {
            id,
            approvals: 1,
            timelock_started,
        })
    }

    /// Record `guardian`'s approval; latches the time lock on first reaching
    /// the threshold captured at initiation.
    pub fn approve(
        &mut self,
        guardian: Address,
        id: &RecoveryId,
        now: Timestamp,
    ) -> QuorumResult<RecoveryProgress> {
        self.config.require_guardian(&guardian)?;
        let recovery = self.open_mut(id)?;
        if !recovery.insert_approval(guardian) {
            return Err(QuorumError::state(format!(
                "{guardian} has already approved {id}"
            )));
        }
        let timelock_started = recovery.latch_if_ready(now);
        debug!(
            recovery_id = %id,
            guardian = %guardian,
            approvals = recovery.approval_count(),
            "recovery approval recorded"
        );
        Ok(RecoveryProgress {
            id: *id,
            approvals: recovery.approval_count(),
            timelock_started,
        })
    }

    /// Cancel an open recovery on behalf of a current owner.
    pub fn cancel(
        &mut self,
        owners: &OwnerPolicy,
        owner: Address,
        id: &RecoveryId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        owners.require_owner(&owner)?;
        let recovery = self.open_mut(id)?;
        recovery.set_status(RecoveryStatus::Cancelled { by: owner, at: now });
        debug!(recovery_id = %id, owner = %owner, "recovery cancelled");
        Ok(())
    }

    /// Execute an armed recovery whose time lock has elapsed, replacing
    /// `owners` wholesale. Callable by anyone.
    pub fn execute(
        &mut self,
        owners: &mut OwnerPolicy,
        executor: Address,
        id: &RecoveryId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        let recovery = self.open_mut(id)?;
        let after = recovery.execute_after().ok_or_else(|| {
            QuorumError::state(format!(
                "{id} has {} of {} guardian approvals",
                recovery.approval_count(),
                recovery.threshold_at_init()
            ))
        })?;
        if now < after {
            return Err(QuorumError::state(format!(
                "{id} is time locked until {after}"
            )));
        }
        if !recovery.threshold_met() {
            return Err(QuorumError::state(format!(
                "{id} no longer meets its guardian threshold"
            )));
        }
        owners.replace(
            recovery.proposed_owners().iter().copied(),
            recovery.proposed_threshold(),
        )?;
        recovery.set_status(RecoveryStatus::Executed { by: executor, at: now });
        debug!(recovery_id = %id, executor = %executor, "recovery executed");
        Ok(())
    }

    /// Whether any recovery is neither executed nor cancelled
    pub fn has_open(&self) -> bool {
        self.recoveries
            .iter()
            .any(|recovery| !recovery.status().is_terminal())
    }

    /// Fail with `State` while any recovery is open
    pub fn ensure_config_mutable(&self) -> QuorumResult<()> {
        match self.open().next() {
            Some(recovery) => Err(QuorumError::state(format!(
                "guardian configuration is frozen while {} is {}",
                recovery.id(),
                recovery.status().as_str()
            ))),
            None => Ok(()),
        }
    }

    /// Replace guardians and guardian threshold, keeping the period.
    pub fn set_guardians(&mut self, guardians: Vec<Address>, threshold: u16) -> QuorumResult<()> {
        self.ensure_config_mutable()?;
        let period_ms = if self.config.period_ms() == 0 {
            DEFAULT_RECOVERY_PERIOD_MS
        } else {
            self.config.period_ms()
        };
        self.config = GuardianConfig::new(guardians, threshold, period_ms)?;
        Ok(())
    }

    /// Change the time lock applied to future recoveries.
    pub fn set_period(&mut self, period_ms: u64) -> QuorumResult<()> {
        self.ensure_config_mutable()?;
        self.config = self.config.with_period(period_ms)?;
        Ok(())
    }

    /// Look up a recovery
    pub fn get(&self, id: &RecoveryId) -> Option<&Recovery> {
        self.index.get(id).map(|&slot| &self.recoveries[slot])
    }

    /// Phase of `id` at `now`
    pub fn phase(&self, id: &RecoveryId, now: Timestamp) -> QuorumResult<RecoveryPhase> {
        self.get(id)
            .map(|recovery| recovery.phase(now))
            .ok_or_else(|| QuorumError::not_found(format!("unknown recovery {id}")))
    }

    /// All recoveries in initiation order
    pub fn iter(&self) -> impl Iterator<Item = &Recovery> {
        self.recoveries.iter()
    }

    /// Recoveries that are neither executed nor cancelled
    pub fn open(&self) -> impl Iterator<Item = &Recovery> {
        self.recoveries
            .iter()
            .filter(|recovery| !recovery.status().is_terminal())
    }

    fn open_mut(&mut self, id: &RecoveryId) -> QuorumResult<&mut Recovery> {
        let slot = *self
            .index
            .get(id)
            .ok_or_else(|| QuorumError::not_found(format!("unknown recovery {id}")))?;
        let recovery = &mut self.recoveries[slot];
        if recovery.status().is_terminal() {
            return Err(QuorumError::state(format!(
                "{id} is already {}",
                recovery.status().as_str()
            )));
        }
        Ok(recovery)
    }
}
