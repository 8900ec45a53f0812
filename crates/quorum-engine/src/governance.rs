//! Governance dispatch
//!
//! Applies an approved `GovernanceOp` to the vault's own configuration. Each
//! arm delegates to a primitive that validates before writing, so a rejected
//! operation leaves the state exactly as it was.

use crate::state::VaultState;
use quorum_core::{GovernanceOp, QuorumResult};
use tracing::debug;

pub(crate) fn apply(state: &mut VaultState, op: &GovernanceOp) -> QuorumResult<()> {
    match op {
        GovernanceOp::AddOwner { owner } => state.owners.add_owner(*owner),
        GovernanceOp::RemoveOwner { owner } => {
            state.owners.remove_owner(owner)?;
            let pruned = state.registry.prune_approvals(&state.owners);
            debug!(owner = %owner, pruned, "owner removed");
            Ok(())
        }
        GovernanceOp::ChangeThreshold { threshold } => state.owners.change_threshold(*threshold),
        GovernanceOp::AddWhitelistEntry { address, cap } => {
            state.whitelist.add_entry(*address, *cap)
        }
        GovernanceOp::RemoveWhitelistEntry { address } => {
            state.whitelist.remove_entry(address).map(|_| ())
        }
        GovernanceOp::SetWhitelistCap { address, cap } => state.whitelist.set_cap(address, *cap),
        GovernanceOp::SetDailyLimit { limit } => {
            state.daily_limit.set_limit(*limit);
            Ok(())
        }
        GovernanceOp::SetGuardians {
            guardians,
            threshold,
        } => state.recovery.set_guardians(guardians.clone(), *threshold),
        GovernanceOp::SetRecoveryPeriod { period_ms } => state.recovery.set_period(*period_ms),
    }
}
