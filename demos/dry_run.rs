//! Dry Run — rotate an account on the simulated chain and print each step.
//!
//! Run with:
//!   cargo run --example dry_run -p authkey-rotate

use std::sync::Arc;

use authkey_rotate::gateway::{ChainGateway, InMemoryGateway};
use authkey_rotate::{FinalityPolicy, Identity, RotationProofBuilder, RotationWorkflow};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gateway = Arc::new(InMemoryGateway::new());
    let alice = Identity::generate();
    let bob = Identity::generate();
    gateway.create_account(&alice);

    println!("Account:   {}", alice.address());
    println!("Old key:   {}", alice.authentication_key());
    println!("New key:   {}", bob.authentication_key());
    println!();

    // ── 1. Inspect the proof the workflow will submit ───────────────────────
    //
    // The current key signs the challenge; the new key countersigns it to
    // show it is held by whoever asked for the hand-off.
    let authorization = RotationProofBuilder::new(&alice)
        .sequence_number(gateway.sequence_number(&alice.address()).await?)
        .build(bob.derive_public_key())?
        .countersign(&bob)?;
    authorization.verify()?;
    println!("Challenge: {} bytes", authorization.challenge().to_bytes().len());
    println!();

    // ── 2. Run the hand-off ─────────────────────────────────────────────────
    let mut workflow = RotationWorkflow::new(
        gateway.clone(),
        alice.clone(),
        bob.clone(),
        FinalityPolicy::default(),
    )?;
    let rotated = workflow.run().await?;

    println!("State:     {}", workflow.state());
    println!(
        "Rotated:   {} (same address: {})",
        rotated.address(),
        rotated.address() == alice.address()
    );
    println!(
        "Chain key: {}",
        gateway
            .auth_key_of(&alice.address())
            .map(|k| k.to_hex())
            .unwrap_or_default()
    );

    // ── 3. The old key no longer signs for the account ──────────────────────
    let mut stale = RotationWorkflow::new(
        gateway.clone(),
        alice,
        Identity::generate(),
        FinalityPolicy::default(),
    )?;
    match stale.run().await {
        Ok(_) => println!("Unexpected: old key rotated again"),
        Err(e) => println!("Old key refused: {e}"),
    }

    Ok(())
}
