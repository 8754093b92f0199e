//! Account identity — an address plus the keypair that controls it.
//!
//! Only the secret is held; the public key is derived from it on every
//! call so the two can never drift apart. Identities are immutable:
//! rotation produces a new value via [`Identity::rebind`].

use ed25519_dalek::Signature;
use serde::{Deserialize, Serialize};

use crate::crypto::keys::{self, PrivateKeyBytes, PublicKey};
use crate::crypto::signing;
use crate::error::Result;

use super::address::{AccountAddress, AuthenticationKey};

/// Placeholder printed instead of the private key in redacted snapshots.
pub const REDACTED: &str = "<redacted>";

/// An account address bound to the Ed25519 key that signs for it.
#[derive(Clone)]
pub struct Identity {
    address: AccountAddress,
    private_key: PrivateKeyBytes,
}

impl Identity {
    /// Bind raw private key bytes to an address.
    pub fn create(private_key: &[u8], address: AccountAddress) -> Result<Self> {
        Ok(Self {
            address,
            private_key: PrivateKeyBytes::from_slice(private_key)?,
        })
    }

    /// Identity at the key's natural address (no rotation history).
    pub fn from_private_key(private_key: &[u8]) -> Result<Self> {
        let private_key = PrivateKeyBytes::from_slice(private_key)?;
        let address = natural_address(&private_key);
        Ok(Self {
            address,
            private_key,
        })
    }

    /// Parse a hex private key and optional hex address. A missing address
    /// means the key's natural address.
    pub fn from_hex(private_key_hex: &str, address_hex: Option<&str>) -> Result<Self> {
        let private_key = keys::parse_private_key(private_key_hex)?;
        let address = match address_hex {
            Some(a) => AccountAddress::from_hex(a)?,
            None => natural_address(&private_key),
        };
        Ok(Self {
            address,
            private_key,
        })
    }

    /// Fresh random identity at its natural address.
    pub fn generate() -> Self {
        let private_key = keys::generate_private_key();
        let address = natural_address(&private_key);
        Self {
            address,
            private_key,
        }
    }

    /// The account address this identity acts for.
    pub fn address(&self) -> AccountAddress {
        self.address
    }

    /// Derive the public key from the private key.
    pub fn derive_public_key(&self) -> PublicKey {
        keys::derive_public_key(&self.private_key)
    }

    /// Authentication key of this identity's keypair.
    pub fn authentication_key(&self) -> AuthenticationKey {
        AuthenticationKey::ed25519(&self.derive_public_key())
    }

    /// The address this keypair would own had it never been rotated onto
    /// another account. Used as the lookup key for origin resolution.
    pub fn natural_address(&self) -> AccountAddress {
        natural_address(&self.private_key)
    }

    /// Sign a message, self-verifying the signature.
    pub fn sign(&self, message: &[u8]) -> Result<Signature> {
        signing::sign_checked(&keys::signing_key(&self.private_key), message)
    }

    /// Same keypair, bound to another address. `self` is left untouched.
    pub fn rebind(&self, address: AccountAddress) -> Self {
        Self {
            address,
            private_key: self.private_key.clone(),
        }
    }

    /// Whether both identities hold the same keypair.
    pub fn same_keypair(&self, other: &Identity) -> bool {
        self.derive_public_key() == other.derive_public_key()
    }

    /// Read-only projection for display by callers.
    pub fn export_snapshot(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            address: self.address.to_hex(),
            public_key_hex: self.derive_public_key().to_hex(),
            private_key_hex: keys::encode_private_key(&self.private_key),
        }
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address)
            .field("public_key", &self.derive_public_key())
            .finish_non_exhaustive()
    }
}

fn natural_address(private_key: &PrivateKeyBytes) -> AccountAddress {
    AuthenticationKey::ed25519(&keys::derive_public_key(private_key)).account_address()
}

/// Exportable view of an identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySnapshot {
    pub address: String,
    pub public_key_hex: String,
    pub private_key_hex: String,
}

impl IdentitySnapshot {
    /// Copy with the private key replaced by a fixed marker, for logs.
    pub fn redacted(&self) -> Self {
        Self {
            private_key_hex: REDACTED.to_string(),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for IdentitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySnapshot")
            .field("address", &self.address)
            .field("public_key_hex", &self.public_key_hex)
            .field("private_key_hex", &REDACTED)
            .finish()
    }
}
