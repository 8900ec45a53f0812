//! The vault facade
//!
//! `Vault` is the single writer over `VaultState`. Every public operation
//! holds one reentrant lock for its whole duration, so readiness and budget
//! checks are indivisible from the writes that follow them, and concurrent
//! callers are serialized.
//!
//! External effects and event sinks run with the lock held but no borrow of
//! the state outstanding. A call back into the vault from inside an effect
//! therefore reaches the state normally and is judged by the execution gate:
//! touching the transaction whose effect is in flight fails with `State`.

use crate::governance;
use crate::snapshot::VaultSnapshot;
use crate::state::{BypassModule, BypassRecord, VaultState};
use parking_lot::ReentrantMutex;
use quorum_core::{
    Address, Amount, Call, EffectApplier, EventKind, EventSink, EventSubject, Operation,
    QuorumError, QuorumResult, RecoveryId, Timestamp, TracingEventSink, TransactionId,
    VaultConfig,
};
use quorum_modules::{DailyLimit, Whitelist, WhitelistEntry};
use quorum_multisig::{ApprovalPolicy, OwnerPolicy, Transaction, TransactionRegistry};
use quorum_recovery::{GuardianConfig, Recovery, RecoveryEngine, RecoveryPhase};
use serde::{Deserialize, Serialize};
use std::cell::{RefCell, RefMut};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of a direct bypass attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BypassDecision {
    /// Effect applied without approvals
    Executed {
        /// Id of the bypass record
        id: TransactionId,
    },
    /// Module condition not met; nothing happened
    Refused {
        /// Why the module declined
        reason: String,
    },
}

/// Path a submitted call took
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum Submission {
    /// Executed immediately through a bypass module
    Bypassed {
        /// Id of the bypass record
        id: TransactionId,
        /// Module that allowed it
        module: BypassModule,
    },
    /// Recorded as a pending transaction awaiting approvals
    Proposed {
        /// Id of the new transaction
        id: TransactionId,
    },
}

/// Builder for a `Vault`
pub struct VaultBuilder {
    owners: OwnerPolicy,
    policy: ApprovalPolicy,
    whitelist: Whitelist,
    daily_limit: DailyLimit,
    guardians: GuardianConfig,
    sink: Arc<dyn EventSink>,
}

impl VaultBuilder {
    /// Approval policy for proposals
    pub fn approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Initial whitelist
    pub fn whitelist(mut self, whitelist: Whitelist) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Initial daily budget
    pub fn daily_limit(mut self, daily_limit: DailyLimit) -> Self {
        self.daily_limit = daily_limit;
        self
    }

    /// Guardian configuration
    pub fn guardians(mut self, guardians: GuardianConfig) -> Self {
        self.guardians = guardians;
        self
    }

    /// Consumer of committed events (defaults to `TracingEventSink`)
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Finish with the effect layer that applies calls
    pub fn build(self, effects: Arc<dyn EffectApplier>) -> Vault {
        let state = VaultState::new(
            self.owners,
            TransactionRegistry::new(self.policy),
            self.whitelist,
            self.daily_limit,
            RecoveryEngine::new(self.guardians),
        );
        Vault {
            state: ReentrantMutex::new(RefCell::new(state)),
            effects,
            sink: self.sink,
        }
    }
}

/// Multi-party authorization vault.
pub struct Vault {
    state: ReentrantMutex<RefCell<VaultState>>,
    effects: Arc<dyn EffectApplier>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

fn borrow_state(cell: &RefCell<VaultState>) -> QuorumResult<RefMut<'_, VaultState>> {
    cell.try_borrow_mut()
        .map_err(|_| QuorumError::internal("vault state is already borrowed"))
}

impl Vault {
    /// Start building a vault around `owners`
    pub fn builder(owners: OwnerPolicy) -> VaultBuilder {
        VaultBuilder {
            owners,
            policy: ApprovalPolicy::default(),
            whitelist: Whitelist::new(),
            daily_limit: DailyLimit::new(0),
            guardians: GuardianConfig::disabled(),
            sink: Arc::new(TracingEventSink),
        }
    }

    /// Build a vault from validated configuration
    pub fn from_config(
        config: &VaultConfig,
        effects: Arc<dyn EffectApplier>,
        sink: Arc<dyn EventSink>,
    ) -> QuorumResult<Self> {
        let owners = OwnerPolicy::new(
            config.owners.addresses.iter().copied(),
            config.owners.threshold,
        )?;
        let whitelist = Whitelist::from_entries(
            config
                .whitelist
                .entries
                .iter()
                .map(|entry| (entry.address, entry.cap.map(Amount::from))),
        )?;
        let guardians = GuardianConfig::new(
            config.recovery.guardians.iter().copied(),
            config.recovery.threshold,
            config.recovery.period_ms(),
        )?;
        info!(
            owners = owners.len(),
            threshold = owners.threshold(),
            whitelist = whitelist.len(),
            daily_limit = config.daily_limit.limit,
            guardians = config.recovery.guardians.len(),
            "vault configured"
        );
        Ok(Self::builder(owners)
            .approval_policy(ApprovalPolicy {
                proposer_auto_approves: config.owners.proposer_auto_approves,
            })
            .whitelist(whitelist)
            .daily_limit(DailyLimit::new(config.daily_limit.limit()))
            .guardians(guardians)
            .event_sink(sink)
            .build(effects))
    }

    // ----- transactions -----

    /// Propose `operation` on behalf of `proposer`.
    pub fn propose(
        &self,
        proposer: Address,
        operation: impl Into<Operation>,
        now: Timestamp,
    ) -> QuorumResult<TransactionId> {
        let operation = operation.into();
        self.transact("propose", |state| {
            let VaultState {
                owners, registry, ..
            } = &mut *state;
            let id = registry.propose(owners, proposer, operation, now)?;
            let auto = registry.policy().proposer_auto_approves;
            let subject = EventSubject::Transaction(id);
            state.emit(subject, proposer, EventKind::Proposed, now, None);
            if auto {
                state.emit(
                    subject,
                    proposer,
                    EventKind::Approved,
                    now,
                    Some("proposer".to_string()),
                );
            }
            info!(tx_id = %id, actor = %proposer, "transaction proposed");
            Ok(id)
        })
    }

    /// Record `owner`'s approval of `id`.
    pub fn approve(&self, owner: Address, id: &TransactionId, now: Timestamp) -> QuorumResult<()> {
        self.transact("approve", |state| {
            state.registry.approve(&state.owners, owner, id)?;
            state.emit(
                EventSubject::Transaction(*id),
                owner,
                EventKind::Approved,
                now,
                None,
            );
            info!(tx_id = %id, actor = %owner, "transaction approved");
            Ok(())
        })
    }

    /// Withdraw `owner`'s approval of `id`.
    pub fn revoke(&self, owner: Address, id: &TransactionId, now: Timestamp) -> QuorumResult<()> {
        self.transact("revoke", |state| {
            state.registry.revoke(&state.owners, owner, id)?;
            state.emit(
                EventSubject::Transaction(*id),
                owner,
                EventKind::Revoked,
                now,
                None,
            );
            info!(tx_id = %id, actor = %owner, "approval revoked");
            Ok(())
        })
    }

    /// Cancel `id` on behalf of `canceller`.
    pub fn cancel(
        &self,
        canceller: Address,
        id: &TransactionId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        self.transact("cancel", |state| {
            state.registry.cancel(&state.owners, canceller, id, now)?;
            state.emit(
                EventSubject::Transaction(*id),
                canceller,
                EventKind::Cancelled,
                now,
                None,
            );
            info!(tx_id = %id, actor = %canceller, "transaction cancelled");
            Ok(())
        })
    }

    /// Execute an approved transaction.
    ///
    /// Calls go to the effect layer; governance operations are applied to
    /// the vault. Either way the transaction is marked executed only if the
    /// effect succeeded, and an effect failure leaves it pending.
    pub fn execute(&self, executor: Address, id: &TransactionId, now: Timestamp) -> QuorumResult<()> {
        let guard = self.state.lock();
        let result = self.execute_locked(&guard, executor, id, now);
        if let Err(err) = &result {
            warn!(operation = "execute", tx_id = %id, actor = %executor, error = %err, "operation rejected");
        }
        self.publish(&guard);
        result
    }

    fn execute_locked(
        &self,
        cell: &RefCell<VaultState>,
        executor: Address,
        id: &TransactionId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        let operation = {
            let mut state = borrow_state(cell)?;
            let VaultState {
                owners, registry, ..
            } = &mut *state;
            registry.begin_execution(owners, executor, id)?
        };
        debug!(tx_id = %id, op = %operation.label(), "execution started");

        let outcome = match &operation {
            // No borrow is held while the effect runs
            Operation::Call(call) => self
                .effects
                .apply(call)
                .map(|_| ())
                .map_err(QuorumError::from),
            Operation::Governance(op) => {
                borrow_state(cell).and_then(|mut state| governance::apply(&mut *state, op))
            }
        };

        let mut state = borrow_state(cell)?;
        if let Err(err) = outcome {
            state.registry.abort_execution(id);
            return Err(err);
        }
        state.registry.commit_execution(id, executor, now)?;
        let subject = EventSubject::Transaction(*id);
        if let Operation::Governance(op) = &operation {
            state.emit(
                subject,
                executor,
                EventKind::GovernanceApplied,
                now,
                Some(op.label().to_string()),
            );
        }
        state.emit(subject, executor, EventKind::Executed, now, None);
        info!(tx_id = %id, actor = %executor, op = %operation.label(), "transaction executed");
        Ok(())
    }

    // ----- bypass modules -----

    /// Execute `call` without approvals if its target is whitelisted and the
    /// value is within the entry's cap.
    pub fn execute_whitelisted(
        &self,
        owner: Address,
        call: Call,
        now: Timestamp,
    ) -> QuorumResult<BypassDecision> {
        let guard = self.state.lock();
        let result = self.whitelist_locked(&guard, owner, call, now);
        if let Err(err) = &result {
            warn!(operation = "execute_whitelisted", actor = %owner, error = %err, "operation rejected");
        }
        self.publish(&guard);
        result
    }

    fn whitelist_locked(
        &self,
        cell: &RefCell<VaultState>,
        owner: Address,
        call: Call,
        now: Timestamp,
    ) -> QuorumResult<BypassDecision> {
        {
            let state = borrow_state(cell)?;
            state.owners.require_owner(&owner)?;
            if let Some(reason) = state.whitelist.refusal(&call.to, call.value) {
                debug!(actor = %owner, %reason, "whitelist bypass refused");
                return Ok(BypassDecision::Refused { reason });
            }
        }

        self.effects.apply(&call)?;

        let mut state = borrow_state(cell)?;
        let to = call.to;
        let id = state.record_bypass(BypassModule::Whitelist, owner, call, now)?;
        info!(tx_id = %id, actor = %owner, to = %to, "whitelist bypass executed");
        Ok(BypassDecision::Executed { id })
    }

    /// Execute a plain transfer without approvals if it fits in the
    /// remaining daily budget.
    ///
    /// Budget is reserved before the effect runs and refunded if it fails.
    pub fn execute_within_daily_limit(
        &self,
        owner: Address,
        call: Call,
        now: Timestamp,
    ) -> QuorumResult<BypassDecision> {
        let guard = self.state.lock();
        let result = self.daily_limit_locked(&guard, owner, call, now);
        if let Err(err) = &result {
            warn!(operation = "execute_within_daily_limit", actor = %owner, error = %err, "operation rejected");
        }
        self.publish(&guard);
        result
    }

    fn daily_limit_locked(
        &self,
        cell: &RefCell<VaultState>,
        owner: Address,
        call: Call,
        now: Timestamp,
    ) -> QuorumResult<BypassDecision> {
        let receipt = {
            let mut state = borrow_state(cell)?;
            state.owners.require_owner(&owner)?;
            if let Some(reason) = state.daily_limit.refusal(call.value, &call.data, now) {
                debug!(actor = %owner, %reason, "daily limit bypass refused");
                return Ok(BypassDecision::Refused { reason });
            }
            state.daily_limit.spend(call.value, &call.data, now)?
        };

        if let Err(err) = self.effects.apply(&call) {
            let mut state = borrow_state(cell)?;
            state.daily_limit.refund(receipt);
            return Err(err.into());
        }

        let mut state = borrow_state(cell)?;
        let value = receipt.value();
        let id = state.record_bypass(BypassModule::DailyLimit, owner, call, now)?;
        info!(
            tx_id = %id,
            actor = %owner,
            value = %value,
            remaining = %state.daily_limit.remaining(now),
            "daily limit bypass executed"
        );
        Ok(BypassDecision::Executed { id })
    }

    /// Route `call` through the cheapest path that accepts it: whitelist,
    /// then daily limit, then an ordinary proposal.
    pub fn submit(&self, owner: Address, call: Call, now: Timestamp) -> QuorumResult<Submission> {
        let _guard = self.state.lock();
        if let BypassDecision::Executed { id } = self.execute_whitelisted(owner, call.clone(), now)? {
            return Ok(Submission::Bypassed {
                id,
                module: BypassModule::Whitelist,
            });
        }
        if let BypassDecision::Executed { id } =
            self.execute_within_daily_limit(owner, call.clone(), now)?
        {
            return Ok(Submission::Bypassed {
                id,
                module: BypassModule::DailyLimit,
            });
        }
        let id = self.propose(owner, call, now)?;
        Ok(Submission::Proposed { id })
    }

    // ----- recovery -----

    /// Open a recovery proposing a new owner set.
    pub fn initiate_recovery(
        &self,
        guardian: Address,
        new_owners: Vec<Address>,
        new_threshold: u16,
        now: Timestamp,
    ) -> QuorumResult<RecoveryId> {
        self.transact("initiate_recovery", |state| {
            let progress = state
                .recovery
                .initiate(guardian, new_owners, new_threshold, now)?;
            let subject = EventSubject::Recovery(progress.id);
            state.emit(subject, guardian, EventKind::RecoveryInitiated, now, None);
            if let Some(after) = progress.timelock_started {
                state.emit(
                    subject,
                    guardian,
                    EventKind::RecoveryTimelockStarted,
                    now,
                    Some(format!("execute_after={}", after.as_millis())),
                );
            }
            info!(recovery_id = %progress.id, actor = %guardian, "recovery initiated");
            Ok(progress.id)
        })
    }

    /// Record a guardian approval on `id`.
    pub fn approve_recovery(
        &self,
        guardian: Address,
        id: &RecoveryId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        self.transact("approve_recovery", |state| {
            let progress = state.recovery.approve(guardian, id, now)?;
            let subject = EventSubject::Recovery(*id);
            state.emit(subject, guardian, EventKind::RecoveryApproved, now, None);
            if let Some(after) = progress.timelock_started {
                state.emit(
                    subject,
                    guardian,
                    EventKind::RecoveryTimelockStarted,
                    now,
                    Some(format!("execute_after={}", after.as_millis())),
                );
                info!(recovery_id = %id, execute_after = %after, "recovery time lock started");
            }
            info!(recovery_id = %id, actor = %guardian, approvals = progress.approvals, "recovery approved");
            Ok(())
        })
    }

    /// Cancel an open recovery on behalf of a current owner.
    pub fn cancel_recovery(&self, owner: Address, id: &RecoveryId, now: Timestamp) -> QuorumResult<()> {
        self.transact("cancel_recovery", |state| {
            state.recovery.cancel(&state.owners, owner, id, now)?;
            state.emit(
                EventSubject::Recovery(*id),
                owner,
                EventKind::RecoveryCancelled,
                now,
                None,
            );
            info!(recovery_id = %id, actor = %owner, "recovery cancelled");
            Ok(())
        })
    }

    /// Execute a recovery whose time lock has elapsed. Anyone may call this.
    pub fn execute_recovery(
        &self,
        executor: Address,
        id: &RecoveryId,
        now: Timestamp,
    ) -> QuorumResult<()> {
        self.transact("execute_recovery", |state| {
            let VaultState {
                owners,
                registry,
                recovery,
                ..
            } = &mut *state;
            recovery.execute(owners, executor, id, now)?;
            let pruned = registry.prune_approvals(owners);
            state.emit(
                EventSubject::Recovery(*id),
                executor,
                EventKind::RecoveryExecuted,
                now,
                None,
            );
            info!(
                recovery_id = %id,
                actor = %executor,
                owners = state.owners.len(),
                threshold = state.owners.threshold(),
                pruned,
                "recovery executed, owner set replaced"
            );
            Ok(())
        })
    }

    // ----- queries -----

    /// Transaction `id`, if known
    pub fn transaction(&self, id: &TransactionId) -> QuorumResult<Option<Transaction>> {
        self.read(|state| state.registry.get(id).cloned())
    }

    /// Pending transactions in proposal order
    pub fn pending_transactions(&self) -> QuorumResult<Vec<Transaction>> {
        self.read(|state| state.registry.pending().cloned().collect())
    }

    /// Whether `id` has enough approvals and is still pending
    pub fn is_executable(&self, id: &TransactionId) -> QuorumResult<bool> {
        self.read(|state| state.registry.is_executable(&state.owners, id))?
    }

    /// Current owners
    pub fn owners(&self) -> QuorumResult<Vec<Address>> {
        self.read(|state| state.owners.owners().copied().collect())
    }

    /// Current threshold
    pub fn threshold(&self) -> QuorumResult<u16> {
        self.read(|state| state.owners.threshold())
    }

    /// Whitelist entry for `address`
    pub fn whitelist_entry(&self, address: &Address) -> QuorumResult<Option<WhitelistEntry>> {
        self.read(|state| state.whitelist.get(address).copied())
    }

    /// Daily budget left at `now`
    pub fn daily_limit_remaining(&self, now: Timestamp) -> QuorumResult<Amount> {
        self.read(|state| state.daily_limit.remaining(now))
    }

    /// Recovery `id`, if known
    pub fn recovery(&self, id: &RecoveryId) -> QuorumResult<Option<Recovery>> {
        self.read(|state| state.recovery.get(id).cloned())
    }

    /// Phase of recovery `id` at `now`
    pub fn recovery_phase(&self, id: &RecoveryId, now: Timestamp) -> QuorumResult<RecoveryPhase> {
        self.read(|state| state.recovery.phase(id, now))?
    }

    /// Bypass executions in order
    pub fn bypass_log(&self) -> QuorumResult<Vec<BypassRecord>> {
        self.read(|state| state.bypass_log.clone())
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> QuorumResult<VaultSnapshot> {
        self.read(VaultSnapshot::capture)
    }

    // ----- plumbing -----

    /// Run a state transition that calls nothing external.
    fn transact<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut VaultState) -> QuorumResult<T>,
    ) -> QuorumResult<T> {
        let guard = self.state.lock();
        let result = {
            let mut state = borrow_state(&guard)?;
            let mark = state.outbox_mark();
            let result = f(&mut *state);
            if result.is_err() {
                state.discard_since(mark);
            }
            result
        };
        if let Err(err) = &result {
            warn!(operation, error = %err, "operation rejected");
        }
        self.publish(&guard);
        result
    }

    fn read<T>(&self, f: impl FnOnce(&VaultState) -> T) -> QuorumResult<T> {
        let guard = self.state.lock();
        let state = guard
            .try_borrow()
            .map_err(|_| QuorumError::internal("vault state is already borrowed"))?;
        Ok(f(&state))
    }

    /// Hand staged events to the sink, outside any borrow
    fn publish(&self, cell: &RefCell<VaultState>) {
        let events = match cell.try_borrow_mut() {
            Ok(mut state) => state.drain_outbox(),
            Err(_) => return,
        };
        for event in events {
            self.sink.record(event);
        }
    }
}
