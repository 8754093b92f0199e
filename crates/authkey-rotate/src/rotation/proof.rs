//! Rotation authorization — the signed consent to hand an address over
//! to a new key.

use ed25519_dalek::Signature;

use crate::crypto::keys::PublicKey;
use crate::crypto::signing;
use crate::error::{RotationError, Result};
use crate::identity::{AccountAddress, AuthenticationKey, Identity};

use super::challenge::RotationProofChallenge;

/// A signed request to rotate `from_address` onto `new_public_key`.
///
/// Built once, submitted once, then discarded. Resubmitting after the
/// account's sequence number moved requires a fresh authorization.
#[derive(Debug, Clone)]
pub struct RotationAuthorization {
    pub from_address: AccountAddress,
    pub current_public_key: PublicKey,
    pub new_public_key: PublicKey,
    pub sequence_number: u64,
    /// Current key's signature over the challenge.
    pub proof: Signature,
    /// Incoming key's signature over the same challenge.
    pub new_key_proof: Option<Signature>,
}

impl RotationAuthorization {
    /// Rebuild the challenge these proofs sign.
    pub fn challenge(&self) -> RotationProofChallenge {
        RotationProofChallenge {
            sequence_number: self.sequence_number,
            originator: self.from_address,
            current_auth_key: AuthenticationKey::ed25519(&self.current_public_key),
            new_public_key: self.new_public_key,
        }
    }

    /// Add the incoming key's consent. The successor must own
    /// `new_public_key`.
    pub fn countersign(mut self, successor: &Identity) -> Result<Self> {
        if successor.derive_public_key() != self.new_public_key {
            return Err(RotationError::Signing(
                "successor key does not match the authorized public key".into(),
            ));
        }
        let signature = successor.sign(&self.challenge().to_bytes())?;
        self.new_key_proof = Some(signature);
        Ok(self)
    }

    pub fn is_countersigned(&self) -> bool {
        self.new_key_proof.is_some()
    }

    /// The incoming key's proof, required by the chain.
    pub fn require_new_key_proof(&self) -> Result<&Signature> {
        self.new_key_proof.as_ref().ok_or_else(|| {
            RotationError::Signing("authorization is missing the new key's proof".into())
        })
    }

    /// Check the current key's proof and, if present, the new key's proof.
    pub fn verify(&self) -> Result<()> {
        let message = self.challenge().to_bytes();
        signing::verify(&self.current_public_key, &message, &self.proof)?;
        if let Some(sig) = &self.new_key_proof {
            signing::verify(&self.new_public_key, &message, sig)?;
        }
        Ok(())
    }
}

/// Builds the authorization for an identity to hand over its address.
pub struct RotationProofBuilder<'a> {
    current: &'a Identity,
    sequence_number: u64,
}

impl<'a> RotationProofBuilder<'a> {
    /// Start building a proof signed by the current controller.
    pub fn new(current: &'a Identity) -> Self {
        Self {
            current,
            sequence_number: 0,
        }
    }

    /// Bind the proof to the account's current sequence number.
    pub fn sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Sign and finalize the authorization.
    pub fn build(self, new_public_key: PublicKey) -> Result<RotationAuthorization> {
        let current_public_key = self.current.derive_public_key();
        if current_public_key == new_public_key {
            return Err(RotationError::Signing(
                "new public key equals the current one".into(),
            ));
        }

        let challenge = RotationProofChallenge {
            sequence_number: self.sequence_number,
            originator: self.current.address(),
            current_auth_key: AuthenticationKey::ed25519(&current_public_key),
            new_public_key,
        };
        let proof = self.current.sign(&challenge.to_bytes())?;

        Ok(RotationAuthorization {
            from_address: self.current.address(),
            current_public_key,
            new_public_key,
            sequence_number: self.sequence_number,
            proof,
            new_key_proof: None,
        })
    }
}
