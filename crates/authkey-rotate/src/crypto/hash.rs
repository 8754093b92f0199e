//! SHA3-256 hashing and chain domain-separated digests.

use sha3::{Digest, Sha3_256};

/// Scheme identifier appended to a public key when deriving its
/// authentication key (single-signer Ed25519).
pub const ED25519_SCHEME: u8 = 0x00;

fn finish(hasher: Sha3_256) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Computes the SHA3-256 hash of arbitrary data.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    finish(hasher)
}

/// Prefix hash for a domain-separated signing message:
/// `SHA3-256("APTOS::" || type_name)`.
pub fn domain_prefix(type_name: &str) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(b"APTOS::");
    hasher.update(type_name.as_bytes());
    finish(hasher)
}

/// Authentication key for an Ed25519 public key: `SHA3-256(pk || 0x00)`.
pub fn authentication_key(public_key: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(public_key);
    hasher.update([ED25519_SCHEME]);
    finish(hasher)
}
