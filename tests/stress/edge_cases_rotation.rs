//! Edge case tests: racing rotations, stale controllers, malformed inputs,
//! wait bounds and secret handling.

use std::sync::Arc;
use std::time::Duration;

use authkey_rotate::crypto::keys::{encode_private_key, parse_private_key};
use authkey_rotate::gateway::{ChainGateway, InMemoryGateway, ScriptedOutcome};
use authkey_rotate::{
    AccountAddress, FinalityPolicy, Identity, RotationConfig, RotationError,
    RotationProofBuilder, RotationState, RotationWorkflow, TxnHandle,
};

fn policy(timeout_secs: u64) -> FinalityPolicy {
    FinalityPolicy {
        timeout: Duration::from_secs(timeout_secs),
        poll_interval: Duration::from_secs(1),
    }
}

// === Racing rotations ===

#[tokio::test(start_paused = true)]
async fn edge_two_rotations_of_one_account_only_one_wins() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.set_outcome(ScriptedOutcome::Confirm { after_polls: 2 });
    let alice = Identity::generate();
    let bob = Identity::generate();
    let carol = Identity::generate();
    gateway.create_account(&alice);

    let mut to_bob =
        RotationWorkflow::new(gateway.clone(), alice.clone(), bob.clone(), policy(10)).unwrap();
    let mut to_carol =
        RotationWorkflow::new(gateway.clone(), alice.clone(), carol.clone(), policy(10)).unwrap();

    let (first, second) = tokio::join!(to_bob.run(), to_carol.run());

    let (winner, loser_err, loser_state) = match (first, second) {
        (Ok(rotated), Err(e)) => (rotated, e, to_carol.state().clone()),
        (Err(e), Ok(rotated)) => (rotated, e, to_bob.state().clone()),
        other => panic!("exactly one rotation should win, got {other:?}"),
    };

    assert_eq!(winner.address(), alice.address());
    assert!(matches!(
        loser_err,
        RotationError::Rejected { ref reason, .. } if reason.contains("SEQUENCE_NUMBER_TOO_OLD")
    ));
    assert!(matches!(loser_state, RotationState::Rejected { .. }));
    assert_eq!(
        gateway.auth_key_of(&alice.address()),
        Some(winner.authentication_key())
    );
    assert_eq!(gateway.sequence_number(&alice.address()).await.unwrap(), 1);
}

#[tokio::test]
async fn edge_stale_controller_is_refused_at_submission() {
    let gateway = Arc::new(InMemoryGateway::new());
    let alice = Identity::generate();
    let bob = Identity::generate();
    gateway.create_account(&alice);

    let mut first = RotationWorkflow::new(
        gateway.clone(),
        alice.clone(),
        bob,
        FinalityPolicy::default(),
    )
    .unwrap();
    first.run().await.unwrap();

    // Alice's key no longer controls the account.
    let mut replay = RotationWorkflow::new(
        gateway.clone(),
        alice,
        Identity::generate(),
        FinalityPolicy::default(),
    )
    .unwrap();
    let err = replay.run().await.unwrap_err();
    assert!(matches!(err, RotationError::Submission(ref m) if m.contains("INVALID_AUTH_KEY")));
    assert!(matches!(
        replay.state(),
        RotationState::Failed { handle: None, .. }
    ));
}

// === Missing or malformed inputs ===

#[tokio::test]
async fn edge_missing_account_fails_submission() {
    let gateway = Arc::new(InMemoryGateway::new());
    let mut workflow = RotationWorkflow::new(
        gateway.clone(),
        Identity::generate(),
        Identity::generate(),
        FinalityPolicy::default(),
    )
    .unwrap();

    let err = workflow.run().await.unwrap_err();
    assert!(matches!(err, RotationError::Submission(ref m) if m.contains("does not exist")));
    assert_eq!(gateway.calls().submit, 0);
}

#[test]
fn edge_rotate_to_same_key_is_refused() {
    let alice = Identity::generate();
    let err = RotationProofBuilder::new(&alice)
        .build(alice.derive_public_key())
        .unwrap_err();
    assert!(matches!(err, RotationError::Signing(_)));
}

#[test]
fn edge_key_parsing_accepts_case_and_prefix_variants() {
    let lower = "9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";
    let upper = lower.to_uppercase();
    let a = parse_private_key(lower).unwrap();
    let b = parse_private_key(&format!("0x{upper}")).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
    assert_eq!(encode_private_key(&b), format!("0x{lower}"));
}

#[test]
fn edge_key_parsing_rejects_wrong_lengths() {
    let bad_keys = [
        String::new(),
        "0x".to_string(),
        "0x00".to_string(),
        "ab".repeat(31),
        "ab".repeat(33),
        "ab".repeat(64),
    ];
    for bad in &bad_keys {
        assert!(
            matches!(parse_private_key(bad), Err(RotationError::MalformedKey(_))),
            "{bad:?} should be malformed"
        );
    }
}

#[test]
fn edge_key_errors_never_echo_the_secret() {
    let secret = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae15zz";
    let err = parse_private_key(secret).unwrap_err();
    assert!(!err.to_string().contains("9bf49a6a"));
}

#[test]
fn edge_short_addresses_are_left_padded() {
    let short = AccountAddress::from_hex("0x1").unwrap();
    assert_eq!(short, AccountAddress::CORE);
    assert!(AccountAddress::from_hex("0x").is_err());
    assert!(AccountAddress::from_hex(&format!("0x{}", "1".repeat(65))).is_err());
}

#[test]
fn edge_config_rejects_degenerate_waits() {
    let key_a = format!("0x{}", "11".repeat(32));
    let key_b = format!("0x{}", "22".repeat(32));

    let zero = RotationConfig::new("http://localhost:8080/v1", key_a.clone(), key_b.clone())
        .finality_timeout(Duration::ZERO);
    assert!(matches!(zero.validate(), Err(RotationError::InvalidConfig(_))));

    let inverted = RotationConfig::new("http://localhost:8080/v1", key_a, key_b)
        .finality_timeout(Duration::from_secs(1))
        .poll_interval(Duration::from_secs(5));
    assert!(matches!(
        inverted.validate(),
        Err(RotationError::InvalidConfig(_))
    ));
}

// === Waiting ===

#[test]
fn edge_workflow_refuses_overflowing_or_spinning_policy() {
    let gateway = Arc::new(InMemoryGateway::new());
    let alice = Identity::generate();
    gateway.create_account(&alice);

    let overflowing = FinalityPolicy {
        timeout: Duration::from_secs(u64::MAX),
        poll_interval: Duration::from_millis(10),
    };
    let spinning = FinalityPolicy {
        timeout: Duration::from_millis(200),
        poll_interval: Duration::ZERO,
    };
    for policy in [overflowing, spinning] {
        let err = RotationWorkflow::new(
            gateway.clone(),
            alice.clone(),
            Identity::generate(),
            policy,
        )
        .unwrap_err();
        assert!(matches!(err, RotationError::InvalidConfig(_)));
    }
    assert_eq!(gateway.calls().total(), 0);
}

#[tokio::test(start_paused = true)]
async fn edge_await_finality_clamps_an_unchecked_policy() {
    let gateway = InMemoryGateway::new();
    let policy = FinalityPolicy {
        timeout: Duration::from_secs(u64::MAX),
        poll_interval: Duration::ZERO,
    };
    let handle = TxnHandle::new("0xfeed");

    // Never final, so only the outer bound stops the wait.
    let waited = tokio::time::timeout(
        Duration::from_millis(200),
        gateway.await_finality(&handle, &policy),
    )
    .await;
    assert!(waited.is_err());
    assert!(gateway.calls().poll <= 21, "polls: {}", gateway.calls().poll);
}

#[tokio::test(start_paused = true)]
async fn edge_timeout_bound_is_respected_with_slow_chain() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.set_outcome(ScriptedOutcome::NeverFinalize);
    let alice = Identity::generate();
    gateway.create_account(&alice);

    let started = tokio::time::Instant::now();
    let mut workflow =
        RotationWorkflow::new(gateway.clone(), alice, Identity::generate(), policy(60)).unwrap();
    let err = workflow.run().await.unwrap_err();

    assert!(matches!(err, RotationError::TimedOut { .. }));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(60));
    assert!(elapsed < Duration::from_secs(62));
    assert!(gateway.calls().poll <= 61);
}

#[tokio::test(start_paused = true)]
async fn edge_late_confirmation_after_timeout_is_still_resolvable() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.set_outcome(ScriptedOutcome::Confirm { after_polls: 4 });
    let alice = Identity::generate();
    let bob = Identity::generate();
    gateway.create_account(&alice);

    let mut workflow =
        RotationWorkflow::new(gateway.clone(), alice.clone(), bob.clone(), policy(2)).unwrap();
    let handle = match workflow.run().await.unwrap_err() {
        RotationError::TimedOut { handle, .. } => handle,
        other => panic!("expected TimedOut, got {other:?}"),
    };

    // Two more polls from someone else let the chain execute it.
    gateway.poll_status(&handle).await.unwrap();
    gateway.poll_status(&handle).await.unwrap();
    assert_eq!(
        gateway.auth_key_of(&alice.address()),
        Some(bob.authentication_key())
    );

    let mut resumed = RotationWorkflow::resume_confirmed(
        gateway.clone(),
        alice.address(),
        bob,
        handle,
        FinalityPolicy::default(),
    )
    .unwrap();
    assert_eq!(resumed.run().await.unwrap().address(), alice.address());
}

// === Secrets ===

#[test]
fn edge_debug_output_hides_private_keys() {
    let alice = Identity::generate();
    let hex = alice.export_snapshot().private_key_hex;

    assert!(!format!("{alice:?}").contains(&hex[2..]));
    assert!(!format!("{:?}", alice.export_snapshot()).contains(&hex[2..]));

    let config = RotationConfig::new("http://localhost:8080/v1", hex.clone(), hex.clone());
    assert!(!format!("{config:?}").contains(&hex[2..]));
}
