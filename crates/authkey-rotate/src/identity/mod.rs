//! Identity management — addresses, authentication keys, keypairs.
//!
//! The identity module provides the [`Identity`] value: an account
//! address together with the Ed25519 key that currently controls it.

pub mod account;
pub mod address;

pub use account::{Identity, IdentitySnapshot, REDACTED};
pub use address::{AccountAddress, AuthenticationKey, ADDRESS_LENGTH};
