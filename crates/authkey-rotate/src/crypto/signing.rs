//! Ed25519 signing and verification.
//!
//! Provides a simple API for signing arbitrary messages and verifying
//! signatures against known public keys.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier};

use crate::crypto::keys::PublicKey;
use crate::error::{RotationError, Result};

/// Sign a message with an Ed25519 signing key.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> Signature {
    signing_key.sign(message)
}

/// Sign a message and check the result verifies under the signer's own
/// public key. A mismatch means the key material is corrupted.
pub fn sign_checked(signing_key: &SigningKey, message: &[u8]) -> Result<Signature> {
    let signature = sign(signing_key, message);
    signing_key
        .verifying_key()
        .verify(message, &signature)
        .map_err(|e| RotationError::Signing(format!("self-verification failed: {e}")))?;
    Ok(signature)
}

/// Verify an Ed25519 signature against a public key and message.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<()> {
    public_key
        .verifying_key()?
        .verify_strict(message, signature)
        .map_err(|_| RotationError::Signing("signature verification failed".into()))
}
