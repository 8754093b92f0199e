//! Transaction encoding for the rotation entry function.
//!
//! A rotation is a call to
//! `0x1::account::rotate_authentication_key(from_scheme, from_public_key,
//! to_scheme, to_public_key, cap_rotate_key, cap_update_table)`, sent by
//! the account being rotated and signed by its current key.

use ed25519_dalek::Signature;

use crate::crypto::bcs::{self, BcsWriter};
use crate::crypto::hash::{self, ED25519_SCHEME};
use crate::crypto::keys::PublicKey;
use crate::error::Result;
use crate::identity::{AccountAddress, Identity};
use crate::rotation::RotationAuthorization;

/// Function invoked by a rotation transaction.
pub const ROTATE_FUNCTION: &str = "rotate_authentication_key";

/// Module hosting [`ROTATE_FUNCTION`].
pub const ACCOUNT_MODULE: &str = "account";

/// `TransactionPayload::EntryFunction` variant index.
const PAYLOAD_ENTRY_FUNCTION: u32 = 2;

/// `TransactionAuthenticator::Ed25519` variant index.
const AUTHENTICATOR_ED25519: u32 = 0;

/// `Transaction::UserTransaction` variant index.
const TRANSACTION_USER: u8 = 0;

/// A call to a public entry function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFunction {
    pub module_address: AccountAddress,
    pub module_name: String,
    pub function: String,
    /// Each argument BCS-encoded on its own.
    pub args: Vec<Vec<u8>>,
}

impl EntryFunction {
    /// The rotation call for a countersigned authorization.
    pub fn rotate_authentication_key(authorization: &RotationAuthorization) -> Result<Self> {
        let new_key_proof = authorization.require_new_key_proof()?;
        Ok(Self {
            module_address: AccountAddress::CORE,
            module_name: ACCOUNT_MODULE.to_string(),
            function: ROTATE_FUNCTION.to_string(),
            args: vec![
                vec![ED25519_SCHEME],
                bcs::encode_bytes(authorization.current_public_key.as_bytes()),
                vec![ED25519_SCHEME],
                bcs::encode_bytes(authorization.new_public_key.as_bytes()),
                bcs::encode_bytes(&authorization.proof.to_bytes()),
                bcs::encode_bytes(&new_key_proof.to_bytes()),
            ],
        })
    }

    fn encode(&self, w: &mut BcsWriter) {
        w.variant(PAYLOAD_ENTRY_FUNCTION)
            .fixed(self.module_address.as_bytes())
            .str(&self.module_name)
            .str(&self.function)
            // no type arguments
            .seq_len(0)
            .seq_len(self.args.len());
        for arg in &self.args {
            w.bytes(arg);
        }
    }
}

/// An unsigned user transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransaction {
    pub sender: AccountAddress,
    pub sequence_number: u64,
    pub payload: EntryFunction,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    pub expiration_timestamp_secs: u64,
    pub chain_id: u8,
}

impl RawTransaction {
    pub fn to_bcs(&self) -> Vec<u8> {
        let mut w = BcsWriter::new();
        self.encode(&mut w);
        w.finish()
    }

    fn encode(&self, w: &mut BcsWriter) {
        w.fixed(self.sender.as_bytes()).u64(self.sequence_number);
        self.payload.encode(w);
        w.u64(self.max_gas_amount)
            .u64(self.gas_unit_price)
            .u64(self.expiration_timestamp_secs)
            .u8(self.chain_id);
    }

    /// Bytes the sender signs: domain prefix followed by the BCS body.
    pub fn signing_message(&self) -> Vec<u8> {
        let mut message = hash::domain_prefix("RawTransaction").to_vec();
        message.extend_from_slice(&self.to_bcs());
        message
    }

    /// Sign with the sender's key.
    pub fn sign(self, signer: &Identity) -> Result<SignedTransaction> {
        let signature = signer.sign(&self.signing_message())?;
        Ok(SignedTransaction {
            raw: self,
            public_key: signer.derive_public_key(),
            signature,
        })
    }
}

/// A raw transaction plus its single-signer authenticator.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: RawTransaction,
    pub public_key: PublicKey,
    pub signature: Signature,
}

impl SignedTransaction {
    /// Submission body.
    pub fn to_bcs(&self) -> Vec<u8> {
        let mut w = BcsWriter::new();
        self.raw.encode(&mut w);
        w.variant(AUTHENTICATOR_ED25519)
            .bytes(self.public_key.as_bytes())
            .bytes(&self.signature.to_bytes());
        w.finish()
    }

    /// The hash the chain will index this transaction under.
    pub fn hash(&self) -> String {
        let mut preimage = hash::domain_prefix("Transaction").to_vec();
        preimage.push(TRANSACTION_USER);
        preimage.extend_from_slice(&self.to_bcs());
        format!("0x{}", hex::encode(hash::sha3_256(&preimage)))
    }
}
