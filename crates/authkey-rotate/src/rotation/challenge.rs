//! Canonical rotation proof challenge.
//!
//! Both the outgoing and the incoming key sign the BCS encoding of this
//! struct. Its leading type tag (`0x1::account::RotationProofChallenge`)
//! is what the chain prepends when it rebuilds the message for
//! verification, so the tag doubles as the intent and version marker:
//! a different layout would need a different struct name.

use crate::crypto::bcs::BcsWriter;
use crate::crypto::keys::PublicKey;
use crate::identity::{AccountAddress, AuthenticationKey};

/// Module that defines the challenge type.
pub const CHALLENGE_MODULE: &str = "account";

/// Struct name of the challenge type.
pub const CHALLENGE_STRUCT: &str = "RotationProofChallenge";

/// The message that authorizes `originator` to switch from
/// `current_auth_key` to `new_public_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationProofChallenge {
    /// Sequence number of the rotated account at signing time.
    pub sequence_number: u64,
    /// Address whose control is being transferred.
    pub originator: AccountAddress,
    /// Authentication key of the key giving up control.
    pub current_auth_key: AuthenticationKey,
    /// Key taking over control.
    pub new_public_key: PublicKey,
}

impl RotationProofChallenge {
    /// BCS bytes to be signed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = BcsWriter::new();
        w.fixed(AccountAddress::CORE.as_bytes())
            .str(CHALLENGE_MODULE)
            .str(CHALLENGE_STRUCT)
            .u64(self.sequence_number)
            .fixed(self.originator.as_bytes())
            .fixed(self.current_auth_key.as_bytes())
            .bytes(self.new_public_key.as_bytes());
        w.finish()
    }
}
