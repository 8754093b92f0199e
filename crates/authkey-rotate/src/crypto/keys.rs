//! Ed25519 key material: private-key hex codec and public-key derivation.
//!
//! The secret is the 32-byte Ed25519 seed. Public keys are always derived
//! from it on demand and never stored alongside.

use ed25519_dalek::{SigningKey, VerifyingKey};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{RotationError, Result};

/// Secret key (seed) length for the Ed25519 single-signer scheme.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Ed25519 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Raw private key bytes, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyBytes([u8; PRIVATE_KEY_LENGTH]);

impl PrivateKeyBytes {
    /// Wrap a byte slice, checking the scheme's secret-key length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; PRIVATE_KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| RotationError::InvalidKeyLength {
                    expected: PRIVATE_KEY_LENGTH,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }

    /// Borrow the raw secret bytes.
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for PrivateKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKeyBytes(<redacted>)")
    }
}

/// Strip an optional `0x`/`0X` prefix.
pub(crate) fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a hex-encoded Ed25519 private key.
///
/// Accepts an optional `0x` prefix and mixed case. The key text is never
/// echoed back in the error.
pub fn parse_private_key(hex_str: &str) -> Result<PrivateKeyBytes> {
    let digits = strip_hex_prefix(hex_str.trim());
    let mut decoded = hex::decode(digits)
        .map_err(|e| RotationError::MalformedKey(format!("not valid hex: {e}")))?;

    if decoded.len() != PRIVATE_KEY_LENGTH {
        let actual = decoded.len();
        decoded.zeroize();
        return Err(RotationError::MalformedKey(format!(
            "expected {PRIVATE_KEY_LENGTH} bytes, got {actual}"
        )));
    }

    let key = PrivateKeyBytes::from_slice(&decoded);
    decoded.zeroize();
    key
}

/// Encode private key bytes as `0x` + lowercase hex.
pub fn encode_private_key(key: &PrivateKeyBytes) -> String {
    format!("0x{}", hex::encode(key.as_bytes()))
}

/// An Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.0
    }

    /// `0x` + lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Convert to a dalek verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0)
            .map_err(|e| RotationError::Signing(format!("invalid public key: {e}")))
    }
}

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Build a signing key from private key bytes.
pub fn signing_key(key: &PrivateKeyBytes) -> SigningKey {
    SigningKey::from_bytes(key.as_bytes())
}

/// Derive the public key for a private key. Deterministic and side-effect free.
pub fn derive_public_key(key: &PrivateKeyBytes) -> PublicKey {
    PublicKey::from(signing_key(key).verifying_key())
}

/// Generate a fresh random private key.
pub fn generate_private_key() -> PrivateKeyBytes {
    let signing = SigningKey::generate(&mut rand::thread_rng());
    PrivateKeyBytes(signing.to_bytes())
}
