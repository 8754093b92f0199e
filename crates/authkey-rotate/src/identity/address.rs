//! Account addresses and authentication keys.
//!
//! An address is the stable 32-byte account identifier. An authentication
//! key is the credential currently allowed to sign for it. Before any
//! rotation they coincide (the *natural address* of a keypair); after a
//! rotation the address stays and the key moves on.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::hash;
use crate::crypto::keys::{strip_hex_prefix, PublicKey};
use crate::error::{RotationError, Result};

/// Account address length in bytes.
pub const ADDRESS_LENGTH: usize = 32;

/// A 32-byte chain account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; ADDRESS_LENGTH]);

impl AccountAddress {
    /// The core framework address `0x1`.
    pub const CORE: Self = {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = 1;
        Self(bytes)
    };

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Parse from hex, accepting an optional `0x` prefix and the short
    /// form (`0x1`), which is left-padded with zeros.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = strip_hex_prefix(s.trim());
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(RotationError::InvalidAddress(format!(
                "expected 1..={} hex digits, got {}",
                ADDRESS_LENGTH * 2,
                digits.len()
            )));
        }

        let padded = format!("{digits:0>width$}", width = ADDRESS_LENGTH * 2);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| RotationError::InvalidAddress(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Full-length `0x` + 64 lowercase hex digits.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountAddress({})", self.to_hex())
    }
}

impl std::str::FromStr for AccountAddress {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AccountAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Authentication key: `SHA3-256(public_key || scheme)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthenticationKey([u8; 32]);

impl AuthenticationKey {
    /// Derive the single-signer Ed25519 authentication key.
    pub fn ed25519(public_key: &PublicKey) -> Self {
        Self(hash::authentication_key(public_key.as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The natural address for this key: the address an account created
    /// by it would receive.
    pub fn account_address(&self) -> AccountAddress {
        AccountAddress(self.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for AuthenticationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for AuthenticationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthenticationKey({})", self.to_hex())
    }
}
