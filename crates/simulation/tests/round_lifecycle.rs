//! End-to-end round lifecycle against the simulated ledger.

use std::time::Duration;
use trivia_core::Notification;
use trivia_simulation::{LedgerConfig, SimulationRunner};
use trivia_types::test_utils::test_content;
use trivia_types::{commitment_digest, EngineError, ParticipantId, Phase, RoundId};
use tracing_test::traced_test;

fn participant() -> ParticipantId {
    ParticipantId::new("0x1234567890abcdef")
}

fn runner_from(config: LedgerConfig) -> SimulationRunner {
    let mut runner = SimulationRunner::new(participant(), config, 42);
    runner.initialize();
    runner.verify();
    runner.run_for(Duration::from_secs(1));
    runner
}

fn round_seven() -> LedgerConfig {
    LedgerConfig {
        first_round: 7,
        ..Default::default()
    }
}

#[traced_test]
#[test]
fn test_commit_then_second_submit_rejected() {
    let mut runner = runner_from(round_seven());
    assert!(runner.engine().is_verified());

    let round_id = runner.start_round(test_content(), 30, 1).unwrap();
    assert_eq!(round_id, RoundId(7));
    runner.run_for(Duration::from_secs(1));
    assert_eq!(runner.observed_phase(round_id), Some(Phase::Open));

    runner.select_option(1);
    runner.submit();
    runner.run_for(Duration::from_secs(1));

    assert_eq!(runner.observed_phase(round_id), Some(Phase::Committed));
    assert_eq!(runner.ledger().commitment_count(round_id), 1);
    assert!(runner.notifications().iter().any(|(_, n)| matches!(
        n,
        Notification::CommitmentAccepted { round_id: RoundId(7), digest }
            if *digest == commitment_digest("Paris")
    )));

    runner.submit();
    runner.run_for(Duration::from_secs(1));

    assert!(matches!(
        runner.rejections().last(),
        Some(EngineError::PhaseViolation {
            phase: Phase::Committed,
            ..
        })
    ));
    assert_eq!(runner.stats().submissions, 1);
    assert_eq!(runner.ledger().commitment_count(round_id), 1);
}

#[traced_test]
#[test]
fn test_expiry_without_reveal_stays_open() {
    let mut runner = runner_from(round_seven());
    let round_id = runner.start_round(test_content(), 5, 1).unwrap();
    runner.run_for(Duration::from_secs(3));
    let queries_before_expiry = runner.stats().round_queries;

    runner.run_for(Duration::from_secs(4));
    assert!(runner.engine().clock().is_expired());
    assert!(runner.stats().round_queries > queries_before_expiry);
    assert_eq!(runner.engine().round().map(|r| r.phase()), Some(Phase::Open));
    assert!(runner.engine().round().unwrap().correct_option().is_none());

    // Still unresolved: the refresh keeps asking.
    let queries_after_expiry = runner.stats().round_queries;
    runner.run_for(Duration::from_secs(11));
    assert!(runner.stats().round_queries >= queries_after_expiry + 2);
    assert_eq!(runner.engine().round().map(|r| r.phase()), Some(Phase::Open));

    assert!(runner.reveal_round(round_id));
    runner.run_for(Duration::from_secs(1));
    let round = runner.engine().round().unwrap();
    assert_eq!(round.phase(), Phase::Revealed);
    assert_eq!(round.correct_option(), Some("Paris"));
}

#[traced_test]
#[test]
fn test_missed_reveal_recovered_by_refresh() {
    let mut runner = runner_from(LedgerConfig {
        drop_reveal_rate: 1.0,
        ..round_seven()
    });
    let round_id = runner.start_round(test_content(), 3, 1).unwrap();
    runner.run_for(Duration::from_secs(5));

    assert!(runner.reveal_round(round_id));
    assert_eq!(runner.stats().reveals_dropped, 1);
    runner.run_for(Duration::from_secs(1));
    assert_ne!(runner.observed_phase(round_id), Some(Phase::Revealed));

    runner.run_for(Duration::from_secs(10));
    assert_eq!(runner.observed_phase(round_id), Some(Phase::Revealed));
    assert!(runner.stats().stats_fetches >= 2);
}

#[traced_test]
#[test]
fn test_submit_requires_selection() {
    let mut runner = runner_from(round_seven());
    let round_id = runner.start_round(test_content(), 30, 1).unwrap();
    runner.run_for(Duration::from_secs(1));

    // Someone else's commitment never changes our phase.
    let now = runner.now_secs();
    runner
        .ledger_mut()
        .commit_as(round_id, &ParticipantId::new("0xb0b"), "London", now)
        .unwrap();
    runner.run_for(Duration::from_secs(1));
    assert_eq!(runner.engine().round().map(|r| r.phase()), Some(Phase::Open));

    // Nothing selected yet.
    runner.submit();
    runner.run_for(Duration::from_millis(10));
    assert!(matches!(
        runner.rejections().last(),
        Some(EngineError::InvalidOption { .. })
    ));
    assert_eq!(runner.stats().submissions, 0);

    runner.select_option(2);
    runner.submit();
    runner.run_for(Duration::from_secs(1));
    assert_eq!(runner.observed_phase(round_id), Some(Phase::Committed));
}

#[traced_test]
#[test]
fn test_unverified_submit_rejected() {
    let mut runner = SimulationRunner::new(
        participant(),
        LedgerConfig {
            verify_ok: false,
            ..round_seven()
        },
        42,
    );
    runner.initialize();
    runner.verify();
    runner.run_for(Duration::from_secs(1));
    assert!(!runner.engine().is_verified());
    assert!(runner
        .rejections()
        .iter()
        .any(|err| matches!(err, EngineError::VerificationFailed { .. })));

    runner.start_round(test_content(), 30, 1).unwrap();
    runner.run_for(Duration::from_secs(1));
    runner.select_option(1);
    runner.submit();
    runner.run_for(Duration::from_secs(1));

    assert!(matches!(
        runner.rejections().last(),
        Some(EngineError::VerificationFailed { .. })
    ));
    assert_eq!(runner.stats().submissions, 0);
}
