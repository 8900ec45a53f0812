//! Exactly-once execution, rollback, reentrancy and serialization.

use assert_matches::assert_matches;
use parking_lot::Mutex;
use proptest::prelude::*;
use quorum_core::{
    Call, EventKind, EventSubject, GovernanceOp, QuorumError, QuorumResult, TransactionId,
};
use quorum_engine::BypassDecision;
use quorum_testkit::*;
use std::sync::Arc;

fn approved_transfer(h: &VaultHarness, value: u128) -> TransactionId {
    let [a, b, _] = owners_abc();
    let id = h
        .vault
        .propose(a, Call::transfer(target_x(), value), t0())
        .unwrap();
    h.vault.approve(a, &id, t0()).unwrap();
    h.vault.approve(b, &id, t0()).unwrap();
    id
}

#[test]
fn second_execute_fails_without_reapplying() {
    let h = VaultHarness::basic();
    let [_, _, c] = owners_abc();
    let id = approved_transfer(&h, 10);

    h.vault.execute(c, &id, t0()).unwrap();
    assert_matches!(
        h.vault.execute(c, &id, t0()),
        Err(QuorumError::State { .. })
    );
    assert_eq!(h.effects.attempts(), 1);
}

#[test]
fn non_owner_cannot_execute() {
    let h = VaultHarness::basic();
    let id = approved_transfer(&h, 10);
    assert_matches!(
        h.vault.execute(address(0x99), &id, t0()),
        Err(QuorumError::Authorization { .. })
    );
    assert_eq!(h.effects.attempts(), 0);
}

#[test]
fn effect_failure_rolls_back_execute() {
    let h = VaultHarness::basic();
    let [a, _, _] = owners_abc();
    let id = approved_transfer(&h, 10);
    let before = h.events.len();

    h.effects.fail_calls_to(target_x());
    assert_matches!(
        h.vault.execute(a, &id, t0()),
        Err(QuorumError::EffectFailure { .. })
    );
    let tx = h.vault.transaction(&id).unwrap().unwrap();
    assert!(tx.is_pending());
    assert!(h.vault.is_executable(&id).unwrap());
    assert_eq!(h.events.len(), before);

    // The caller re-issues once the target recovers
    h.effects.succeed_calls_to(&target_x());
    h.vault.execute(a, &id, t0()).unwrap();
    assert!(h.vault.transaction(&id).unwrap().unwrap().is_executed());
    assert_eq!(h.effects.applied_count(), 1);
}

#[test]
fn failed_daily_limit_effect_refunds_budget() {
    let h = VaultHarness::full();
    let [a, _, _] = owners_abc();
    h.effects.fail_calls_to(target_x());

    assert_matches!(
        h.vault
            .execute_within_daily_limit(a, Call::transfer(target_x(), 60), t0()),
        Err(QuorumError::EffectFailure { .. })
    );
    assert_eq!(h.vault.daily_limit_remaining(t0()).unwrap(), 100);
    assert!(h.vault.bypass_log().unwrap().is_empty());
}

#[test]
fn reentrant_execute_of_same_transaction_is_refused() {
    let h = VaultHarness::basic();
    let [a, _, c] = owners_abc();
    let id = approved_transfer(&h, 10);

    let inner: Arc<Mutex<Option<QuorumResult<()>>>> = Arc::new(Mutex::new(None));
    let vault = Arc::downgrade(&h.vault);
    let seen = inner.clone();
    h.effects.on_apply(move |_| {
        if let Some(vault) = vault.upgrade() {
            *seen.lock() = Some(vault.execute(a, &id, t0()));
        }
    });

    h.vault.execute(c, &id, t0()).unwrap();

    let nested = inner.lock().take().expect("hook ran");
    assert_matches!(nested, Err(QuorumError::State { .. }));
    assert_eq!(h.effects.applied_count(), 1);
    assert!(h.vault.transaction(&id).unwrap().unwrap().is_executed());
}

#[test]
fn reentrant_calls_on_other_transactions_proceed() {
    let h = VaultHarness::basic();
    let [a, b, c] = owners_abc();
    let outer = approved_transfer(&h, 10);
    let other = h
        .vault
        .propose(b, Call::transfer(target_x(), 3), t0())
        .unwrap();

    let vault = Arc::downgrade(&h.vault);
    let results: Arc<Mutex<Vec<QuorumResult<()>>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = results.clone();
    h.effects.on_apply(move |call| {
        if call.value != 10 {
            return;
        }
        if let Some(vault) = vault.upgrade() {
            seen.lock().push(vault.approve(a, &other, t0()));
            seen.lock().push(vault.revoke(a, &outer, t0()));
        }
    });

    h.vault.execute(c, &outer, t0()).unwrap();

    let results = results.lock();
    assert!(results[0].is_ok());
    assert_matches!(results[1], Err(QuorumError::State { .. }));

    // The nested approval commits before the outer execution
    let kinds: Vec<(EventSubject, EventKind)> = h
        .events
        .events()
        .into_iter()
        .map(|e| (e.subject, e.kind))
        .collect();
    let nested = kinds
        .iter()
        .position(|k| *k == (EventSubject::Transaction(other), EventKind::Approved))
        .unwrap();
    let executed = kinds
        .iter()
        .position(|k| *k == (EventSubject::Transaction(outer), EventKind::Executed))
        .unwrap();
    assert!(nested < executed);
}

#[test]
fn reentrant_owner_removal_keeps_in_flight_approvals() {
    let h = VaultHarness::basic();
    let [a, b, c] = owners_abc();
    let outer = approved_transfer(&h, 10);
    let remove_b = h
        .vault
        .propose(a, GovernanceOp::RemoveOwner { owner: b }, t0())
        .unwrap();
    h.vault.approve(a, &remove_b, t0()).unwrap();
    h.vault.approve(c, &remove_b, t0()).unwrap();
    let bystander = h
        .vault
        .propose(c, Call::transfer(address(0x61), 1), t0())
        .unwrap();
    h.vault.approve(b, &bystander, t0()).unwrap();

    let nested: Arc<Mutex<Option<QuorumResult<()>>>> = Arc::new(Mutex::new(None));
    let vault = Arc::downgrade(&h.vault);
    let seen = nested.clone();
    h.effects.on_apply(move |call| {
        if call.value != 10 {
            return;
        }
        if let Some(vault) = vault.upgrade() {
            *seen.lock() = Some(vault.execute(c, &remove_b, t0()));
        }
    });

    h.vault.execute(c, &outer, t0()).unwrap();

    assert_matches!(nested.lock().take(), Some(Ok(())));
    assert_eq!(h.vault.owners().unwrap(), vec![a, c]);
    let executed = h.vault.transaction(&outer).unwrap().unwrap();
    assert!(executed.is_executed());
    assert_eq!(executed.approval_count(), 2);
    assert_eq!(
        h.vault
            .transaction(&bystander)
            .unwrap()
            .unwrap()
            .approval_count(),
        0
    );
}

#[test]
fn concurrent_daily_limit_bypasses_never_overspend() {
    let h = VaultHarness::full();
    let [a, b, c] = owners_abc();
    let owners = [a, b, c];
    let now = t0();

    std::thread::scope(|scope| {
        for i in 0..8 {
            let vault = h.vault.clone();
            let owner = owners[i % owners.len()];
            scope.spawn(move || {
                for _ in 0..10 {
                    let _ = vault.execute_within_daily_limit(
                        owner,
                        Call::transfer(target_x(), 7),
                        now,
                    );
                }
            });
        }
    });

    let spent: u128 = h.effects.applied().iter().map(|call| call.value).sum();
    assert_eq!(spent, 98);
    assert_eq!(h.effects.applied_count(), 14);
    assert_eq!(h.vault.bypass_log().unwrap().len(), 14);
    assert_eq!(h.vault.daily_limit_remaining(now).unwrap(), 2);
}

#[test]
fn concurrent_executes_apply_effect_once() {
    let h = VaultHarness::basic();
    let id = approved_transfer(&h, 10);
    let owners = owners_abc();

    let successes = Mutex::new(0usize);
    std::thread::scope(|scope| {
        for owner in owners {
            let vault = h.vault.clone();
            let successes = &successes;
            scope.spawn(move || {
                if vault.execute(owner, &id, t0()).is_ok() {
                    *successes.lock() += 1;
                }
            });
        }
    });

    assert_eq!(*successes.lock(), 1);
    assert_eq!(h.effects.applied_count(), 1);
}

#[test]
fn rejected_operations_publish_nothing() {
    let h = VaultHarness::basic();
    let [a, _, _] = owners_abc();
    let id = h
        .vault
        .propose(a, Call::transfer(target_x(), 1), t0())
        .unwrap();
    let before = h.events.len();

    let _ = h.vault.approve(address(0x99), &id, t0());
    let _ = h.vault.revoke(a, &id, t0());
    let _ = h.vault.execute(a, &id, t0());
    let refused = h
        .vault
        .execute_whitelisted(a, Call::transfer(target_x(), 1), t0())
        .unwrap();
    assert_matches!(refused, BypassDecision::Refused { .. });

    assert_eq!(h.events.len(), before);
    let sequences: Vec<u64> = h.events.events().iter().map(|e| e.sequence).collect();
    assert!(sequences.windows(2).all(|w| w[0] < w[1]));
}

#[derive(Debug, Clone)]
enum Step {
    Approve(usize, usize),
    Revoke(usize, usize),
    Cancel(usize, usize),
    Execute(usize, usize),
    BreakTarget(bool),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0usize..3, 0usize..3).prop_map(|(o, t)| Step::Approve(o, t)),
        (0usize..3, 0usize..3).prop_map(|(o, t)| Step::Revoke(o, t)),
        (0usize..3, 0usize..3).prop_map(|(o, t)| Step::Cancel(o, t)),
        (0usize..3, 0usize..3).prop_map(|(o, t)| Step::Execute(o, t)),
        any::<bool>().prop_map(Step::BreakTarget),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: whatever the interleaving, no transaction is both executed
    /// and cancelled, and each effect is applied at most once per transaction.
    #[test]
    fn executed_and_cancelled_are_exclusive(steps in prop::collection::vec(step(), 0..40)) {
        let h = VaultHarness::basic();
        let owners = owners_abc();
        let ids: Vec<TransactionId> = (0..3u8)
            .map(|n| {
                h.vault
                    .propose(owners[usize::from(n)], Call::transfer(address(0x60 + n), 1), t0())
                    .unwrap()
            })
            .collect();

        for step in steps {
            match step {
                Step::Approve(o, t) => { let _ = h.vault.approve(owners[o], &ids[t], t0()); }
                Step::Revoke(o, t) => { let _ = h.vault.revoke(owners[o], &ids[t], t0()); }
                Step::Cancel(o, t) => { let _ = h.vault.cancel(owners[o], &ids[t], t0()); }
                Step::Execute(o, t) => { let _ = h.vault.execute(owners[o], &ids[t], t0()); }
                Step::BreakTarget(broken) => {
                    for n in 0..3u8 {
                        if broken {
                            h.effects.fail_calls_to(address(0x60 + n));
                        } else {
                            h.effects.succeed_calls_to(&address(0x60 + n));
                        }
                    }
                }
            }
        }

        let applied = h.effects.applied();
        for (n, id) in ids.iter().enumerate() {
            let tx = h.vault.transaction(id).unwrap().unwrap();
            prop_assert!(!(tx.is_executed() && tx.is_cancelled()));
            let target = address(0x60 + n as u8);
            let times = applied.iter().filter(|call| call.to == target).count();
            prop_assert_eq!(times, usize::from(tx.is_executed()));
        }
    }
}
