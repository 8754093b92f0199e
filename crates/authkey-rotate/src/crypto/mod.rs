//! Cryptographic primitives for authkey-rotate.
//!
//! This module provides:
//! - Ed25519 private-key parsing, hex codec and key handling
//! - Ed25519 signing and verification
//! - SHA3-256 hashing with chain domain prefixes
//! - A minimal BCS (canonical binary) writer

pub mod bcs;
pub mod hash;
pub mod keys;
pub mod signing;
