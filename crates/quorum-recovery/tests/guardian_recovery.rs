//! End-to-end guardian recovery flows.

use assert_matches::assert_matches;
use quorum_core::{Address, QuorumError, Timestamp};
use quorum_multisig::OwnerPolicy;
use quorum_recovery::{GuardianConfig, RecoveryEngine, RecoveryPhase, RecoveryStatus};

const HOUR_MS: u64 = 60 * 60 * 1000;
const DAY_MS: u64 = 24 * HOUR_MS;

fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xaa;
    bytes[19] = n;
    Address::new(bytes)
}

fn guardians() -> [Address; 3] {
    [addr(0xc1), addr(0xc2), addr(0xc3)]
}

fn hours(t0: Timestamp, h: u64) -> Timestamp {
    Timestamp::from_millis(t0.as_millis() + h * HOUR_MS)
}

#[test]
fn time_lock_latches_on_threshold_and_gates_execution() {
    let [g1, g2, g3] = guardians();
    let mut engine = RecoveryEngine::new(GuardianConfig::new([g1, g2, g3], 2, DAY_MS).unwrap());
    let mut owners = OwnerPolicy::new([addr(1), addr(2), addr(3)], 2).unwrap();
    let new_owners = vec![addr(0x11), addr(0x12)];
    let t0 = Timestamp::from_secs(10_000);

    let started = engine
        .initiate(g1, new_owners.clone(), 1, t0)
        .expect("guardian initiates");
    let id = started.id;
    assert_eq!(started.timelock_started, None);
    assert_eq!(engine.phase(&id, t0).unwrap(), RecoveryPhase::Initiated);

    let latched = engine.approve(g2, &id, hours(t0, 1)).unwrap();
    let expected = Timestamp::from_millis(hours(t0, 1).as_millis() + DAY_MS);
    assert_eq!(latched.timelock_started, Some(expected));

    let later = engine.approve(g3, &id, hours(t0, 2)).unwrap();
    assert_eq!(later.timelock_started, None);
    assert_eq!(later.approvals, 3);
    assert_eq!(engine.get(&id).unwrap().execute_after(), Some(expected));

    let too_early = hours(t0, 1 + 23);
    assert_eq!(engine.phase(&id, too_early).unwrap(), RecoveryPhase::Approved);
    assert_matches!(
        engine.execute(&mut owners, addr(0x77), &id, too_early),
        Err(QuorumError::State { .. })
    );
    assert!(owners.is_owner(&addr(1)));

    let ready = hours(t0, 1 + 25);
    assert_eq!(engine.phase(&id, ready).unwrap(), RecoveryPhase::Executable);
    engine
        .execute(&mut owners, addr(0x77), &id, ready)
        .expect("time lock elapsed");

    assert_eq!(owners.owners().copied().collect::<Vec<_>>(), new_owners);
    assert_eq!(owners.threshold(), 1);
    assert_eq!(
        engine.get(&id).unwrap().status(),
        RecoveryStatus::Executed {
            by: addr(0x77),
            at: ready
        }
    );
    assert_matches!(
        engine.execute(&mut owners, addr(0x77), &id, ready),
        Err(QuorumError::State { .. })
    );
}

#[test]
fn guardian_threshold_is_captured_at_initiation() {
    let [g1, g2, g3] = guardians();
    let mut engine = RecoveryEngine::new(GuardianConfig::new([g1, g2, g3], 2, DAY_MS).unwrap());
    let owners = OwnerPolicy::new([addr(1)], 1).unwrap();

    let first = engine
        .initiate(g1, vec![addr(0x11)], 1, Timestamp::EPOCH)
        .unwrap()
        .id;
    assert_matches!(
        engine.set_guardians(vec![g1, g2, g3], 3),
        Err(QuorumError::State { .. })
    );
    assert_eq!(engine.get(&first).unwrap().threshold_at_init(), 2);

    engine
        .cancel(&owners, addr(1), &first, Timestamp::EPOCH)
        .unwrap();
    engine.set_guardians(vec![g1, g2, g3], 3).unwrap();

    let second = engine
        .initiate(g2, vec![addr(0x11)], 1, Timestamp::EPOCH)
        .unwrap()
        .id;
    assert_eq!(engine.get(&first).unwrap().threshold_at_init(), 2);
    assert_eq!(engine.get(&second).unwrap().threshold_at_init(), 3);
}

#[test]
fn cancelled_recovery_never_executes() {
    let [g1, g2, _] = guardians();
    let mut engine = RecoveryEngine::new(GuardianConfig::new([g1, g2], 1, 1_000).unwrap());
    let mut owners = OwnerPolicy::new([addr(1), addr(2)], 2).unwrap();
    let before = owners.clone();

    let progress = engine
        .initiate(g1, vec![addr(0x11)], 1, Timestamp::EPOCH)
        .unwrap();
    assert_eq!(progress.timelock_started, Some(Timestamp::from_millis(1_000)));

    engine
        .cancel(&owners, addr(2), &progress.id, Timestamp::from_millis(500))
        .unwrap();
    assert_matches!(
        engine.execute(&mut owners, g1, &progress.id, Timestamp::from_millis(5_000)),
        Err(QuorumError::State { .. })
    );
    assert_eq!(owners, before);
    assert_eq!(
        engine.phase(&progress.id, Timestamp::from_millis(5_000)).unwrap(),
        RecoveryPhase::Cancelled
    );
    assert!(!engine.has_open());
}
