//! Configuration edits routed through the approval pipeline.

use assert_matches::assert_matches;
use proptest::prelude::*;
use quorum_core::{Address, Call, EventKind, EventSubject, GovernanceOp, QuorumError, TransactionId};
use quorum_engine::BypassDecision;
use quorum_testkit::*;

fn pass(h: &VaultHarness, op: GovernanceOp) -> Result<TransactionId, QuorumError> {
    let owners = h.vault.owners().unwrap();
    let threshold = usize::from(h.vault.threshold().unwrap());
    let id = h.vault.propose(owners[0], op, t0())?;
    for owner in owners.iter().take(threshold) {
        h.vault.approve(*owner, &id, t0())?;
    }
    h.vault.execute(owners[0], &id, t0())?;
    Ok(id)
}

#[test]
fn add_owner_and_raise_threshold() {
    let h = VaultHarness::basic();
    let d = address(0xa4);

    let id = pass(&h, GovernanceOp::AddOwner { owner: d }).unwrap();
    pass(&h, GovernanceOp::ChangeThreshold { threshold: 4 }).unwrap();
    assert_eq!(h.vault.owners().unwrap().len(), 4);
    assert_eq!(h.vault.threshold().unwrap(), 4);

    let kinds = h.events.kinds_for(EventSubject::Transaction(id));
    assert!(kinds.contains(&EventKind::GovernanceApplied));
    assert_eq!(kinds.last(), Some(&EventKind::Executed));
    let detail = h
        .events
        .events()
        .into_iter()
        .find(|e| e.kind == EventKind::GovernanceApplied)
        .and_then(|e| e.detail);
    assert_eq!(detail.as_deref(), Some("add_owner"));

    assert_matches!(
        pass(&h, GovernanceOp::ChangeThreshold { threshold: 5 }),
        Err(QuorumError::Validation { .. })
    );
    assert_matches!(
        pass(&h, GovernanceOp::AddOwner { owner: d }),
        Err(QuorumError::Validation { .. })
    );
}

#[test]
fn governance_cannot_bypass_consensus() {
    let h = VaultHarness::basic();
    let [a, _, _] = owners_abc();
    let id = h
        .vault
        .propose(a, GovernanceOp::AddOwner { owner: address(0xa4) }, t0())
        .unwrap();
    h.vault.approve(a, &id, t0()).unwrap();
    assert_matches!(
        h.vault.execute(a, &id, t0()),
        Err(QuorumError::State { .. })
    );
    assert_eq!(h.vault.owners().unwrap().len(), 3);
}

#[test]
fn removed_owner_approvals_are_pruned() {
    let h = VaultHarness::basic();
    let [a, b, c] = owners_abc();

    let pending = h
        .vault
        .propose(a, Call::transfer(target_x(), 1), t0())
        .unwrap();
    h.vault.approve(c, &pending, t0()).unwrap();
    h.vault.approve(b, &pending, t0()).unwrap();
    assert!(h.vault.is_executable(&pending).unwrap());

    pass(&h, GovernanceOp::RemoveOwner { owner: c }).unwrap();

    let tx = h.vault.transaction(&pending).unwrap().unwrap();
    assert_eq!(tx.approvers().copied().collect::<Vec<Address>>(), vec![b]);
    assert!(!h.vault.is_executable(&pending).unwrap());
    assert_matches!(
        h.vault.approve(c, &pending, t0()),
        Err(QuorumError::Authorization { .. })
    );
}

#[test]
fn whitelist_and_daily_limit_change_only_through_consensus() {
    let h = VaultHarness::full();
    let [a, _, _] = owners_abc();
    let v = address(0x56);

    assert_matches!(
        h.vault
            .execute_whitelisted(a, Call::transfer(v, 1), t0())
            .unwrap(),
        BypassDecision::Refused { .. }
    );

    pass(&h, GovernanceOp::AddWhitelistEntry { address: v, cap: None }).unwrap();
    assert_eq!(h.vault.whitelist_entry(&v).unwrap().unwrap().cap, None);
    assert_matches!(
        h.vault
            .execute_whitelisted(a, Call::transfer(v, 1_000_000), t0())
            .unwrap(),
        BypassDecision::Executed { .. }
    );

    pass(&h, GovernanceOp::SetWhitelistCap { address: v, cap: Some(3) }).unwrap();
    assert_matches!(
        h.vault
            .execute_whitelisted(a, Call::transfer(v, 4), t0())
            .unwrap(),
        BypassDecision::Refused { .. }
    );

    pass(&h, GovernanceOp::RemoveWhitelistEntry { address: v }).unwrap();
    assert!(h.vault.whitelist_entry(&v).unwrap().is_none());
    assert_matches!(
        pass(&h, GovernanceOp::RemoveWhitelistEntry { address: v }),
        Err(QuorumError::Validation { .. })
    );
    assert_matches!(
        pass(&h, GovernanceOp::SetWhitelistCap { address: v, cap: None }),
        Err(QuorumError::Validation { .. })
    );

    pass(&h, GovernanceOp::SetDailyLimit { limit: 500 }).unwrap();
    assert_eq!(h.vault.daily_limit_remaining(t0()).unwrap(), 500);
}

#[test]
fn recovery_configuration_frozen_while_recovery_open() {
    let h = VaultHarness::full();
    let [a, _, _] = owners_abc();
    let [g1, g2, g3] = guardians_g123();

    let recovery = h
        .vault
        .initiate_recovery(g1, vec![address(0xd1)], 1, t0())
        .unwrap();

    assert_matches!(
        pass(
            &h,
            GovernanceOp::SetGuardians {
                guardians: vec![g1, g2, g3],
                threshold: 3
            }
        ),
        Err(QuorumError::State { .. })
    );
    assert_matches!(
        pass(&h, GovernanceOp::SetRecoveryPeriod { period_ms: 1 }),
        Err(QuorumError::State { .. })
    );
    assert_eq!(
        h.vault.recovery(&recovery).unwrap().unwrap().threshold_at_init(),
        2
    );

    h.vault.cancel_recovery(a, &recovery, t0()).unwrap();
    pass(&h, GovernanceOp::SetRecoveryPeriod { period_ms: 1 }).unwrap();
    pass(
        &h,
        GovernanceOp::SetGuardians {
            guardians: vec![g1, g2, g3],
            threshold: 3,
        },
    )
    .unwrap();
    let snapshot = h.vault.snapshot().unwrap();
    assert_eq!(snapshot.guardians.threshold(), 3);
    assert_eq!(snapshot.guardians.period_ms(), 1);
}

#[test]
fn recovery_prunes_approvals_of_replaced_owners() {
    let h = VaultHarness::full();
    let [a, b, _] = owners_abc();
    let [g1, g2, _] = guardians_g123();
    let d = address(0xd1);

    let pending = h
        .vault
        .propose(a, Call::transfer(target_x(), 1), t0())
        .unwrap();
    h.vault.approve(a, &pending, t0()).unwrap();
    h.vault.approve(b, &pending, t0()).unwrap();

    let id = h.vault.initiate_recovery(g1, vec![a, d], 2, t0()).unwrap();
    h.vault.approve_recovery(g2, &id, t0()).unwrap();
    h.vault
        .execute_recovery(g1, &id, plus_hours(t0(), 24))
        .unwrap();

    let tx = h.vault.transaction(&pending).unwrap().unwrap();
    assert_eq!(tx.approvers().copied().collect::<Vec<Address>>(), vec![a]);
    assert!(!h.vault.is_executable(&pending).unwrap());
    assert_matches!(
        h.vault.cancel_recovery(b, &id, t0()),
        Err(QuorumError::Authorization { .. })
    );
}

#[derive(Debug, Clone)]
enum Edit {
    Add(u8),
    Remove(u8),
    Threshold(u16),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0xa1u8..0xa8).prop_map(Edit::Add),
        (0xa1u8..0xa8).prop_map(Edit::Remove),
        (0u16..8).prop_map(Edit::Threshold),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: 1 <= threshold <= |owners| after any sequence of governance
    /// transactions, accepted or rejected.
    #[test]
    fn threshold_stays_within_owner_count(edits in prop::collection::vec(edit(), 0..16)) {
        let h = VaultHarness::basic();
        for edit in edits {
            let op = match edit {
                Edit::Add(n) => GovernanceOp::AddOwner { owner: address(n) },
                Edit::Remove(n) => GovernanceOp::RemoveOwner { owner: address(n) },
                Edit::Threshold(k) => GovernanceOp::ChangeThreshold { threshold: k },
            };
            let _ = pass(&h, op);
            let owners = h.vault.owners().unwrap().len();
            let threshold = usize::from(h.vault.threshold().unwrap());
            prop_assert!(threshold >= 1);
            prop_assert!(threshold <= owners);
        }
    }
}
