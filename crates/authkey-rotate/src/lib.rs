//! authkey-rotate — hand a chain account over to a new keypair.
//!
//! Rotates an account's authentication key from keypair A to keypair B
//! while the account address stays the same, then rebuilds a local
//! identity for "the original address, now controlled by B".

pub mod crypto;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod rotation;
pub mod time;

// Re-export primary types
pub use error::{Result, RotationError};
pub use gateway::{
    ChainGateway, FinalStatus, FinalityPolicy, InMemoryGateway, OperationStatus,
    PendingOperation, RestGateway, TxnHandle,
};
pub use identity::{AccountAddress, AuthenticationKey, Identity, IdentitySnapshot};
pub use rotation::{
    RotationAuthorization, RotationConfig, RotationProofBuilder, RotationState, RotationWorkflow,
};
