//! Authentication-key rotation — proof, configuration, workflow.
//!
//! A rotation hands an account's authentication key from the current
//! keypair to a successor while the address stays put. The current key
//! signs a [`challenge::RotationProofChallenge`], the successor
//! countersigns it, the chain executes the swap, and the successor is
//! rebound to the original address.

pub mod challenge;
pub mod config;
pub mod proof;
pub mod workflow;

pub use challenge::RotationProofChallenge;
pub use config::RotationConfig;
pub use proof::{RotationAuthorization, RotationProofBuilder};
pub use workflow::{RotationState, RotationWorkflow};
