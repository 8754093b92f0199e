//! Chain gateway — the boundary between the rotation core and the chain.
//!
//! The core needs four things from a chain: the account's sequence
//! number, submission of a signed rotation, the status of a submitted
//! transaction, and the originating-address lookup. Everything else
//! (wire format, retries of idempotent reads, fee handling) lives behind
//! this trait.
//!
//! # Implementations
//!
//! - [`rest::RestGateway`] — talks to a fullnode's REST API.
//! - [`memory::InMemoryGateway`] — a simulated chain for tests and dry runs.

pub mod memory;
pub mod rest;
pub mod transaction;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{RotationError, Result};
use crate::identity::{AccountAddress, Identity};
use crate::rotation::RotationAuthorization;

pub use memory::{InMemoryGateway, ScriptedOutcome};
pub use rest::{GasSettings, RestGateway};

/// Opaque identifier of a submitted transaction (its hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxnHandle(pub String);

impl TxnHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a submitted operation as seen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    Confirmed,
    TimedOut,
    Rejected,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A submitted operation and its last known status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub handle: TxnHandle,
    status: OperationStatus,
}

impl PendingOperation {
    /// A freshly submitted operation.
    pub fn pending(handle: TxnHandle) -> Self {
        Self {
            handle,
            status: OperationStatus::Pending,
        }
    }

    /// An operation already known to have committed.
    pub fn confirmed(handle: TxnHandle) -> Self {
        Self {
            handle,
            status: OperationStatus::Confirmed,
        }
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Move to `next`. Terminal statuses never change again.
    pub fn advance(&mut self, next: OperationStatus) -> Result<()> {
        if self.status.is_terminal() && next != self.status {
            return Err(RotationError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{next:?}"),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// Result of a single status poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    /// Not yet executed (or not yet visible to this node).
    Pending,
    /// Executed successfully.
    Committed { version: Option<u64> },
    /// Executed and aborted; the reason is the chain's VM status.
    Failed { reason: String },
}

/// Outcome of waiting for finality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalStatus {
    Confirmed {
        version: Option<u64>,
    },
    Rejected {
        reason: String,
    },
    /// The bound elapsed without a terminal status. The transaction may
    /// still land later.
    TimedOut {
        waited: Duration,
        last_error: Option<String>,
    },
}

impl FinalStatus {
    pub fn operation_status(&self) -> OperationStatus {
        match self {
            Self::Confirmed { .. } => OperationStatus::Confirmed,
            Self::Rejected { .. } => OperationStatus::Rejected,
            Self::TimedOut { .. } => OperationStatus::TimedOut,
        }
    }
}

/// Shortest pause allowed between two status polls.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Longest finality wait a policy may ask for.
pub const MAX_FINALITY_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Bounds for waiting on finality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalityPolicy {
    /// Total time to wait before reporting `TimedOut`.
    pub timeout: Duration,
    /// Pause between polls.
    pub poll_interval: Duration,
}

impl FinalityPolicy {
    /// Check that the wait is finite and polling cannot spin.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(RotationError::InvalidConfig(
                "finality timeout must be > 0".into(),
            ));
        }
        if self.timeout > MAX_FINALITY_TIMEOUT {
            return Err(RotationError::InvalidConfig(format!(
                "finality timeout exceeds {}s",
                MAX_FINALITY_TIMEOUT.as_secs()
            )));
        }
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(RotationError::InvalidConfig(format!(
                "poll interval must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }
        if self.poll_interval > self.timeout {
            return Err(RotationError::InvalidConfig(
                "poll interval exceeds finality timeout".into(),
            ));
        }
        Ok(())
    }
}

impl Default for FinalityPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Chain operations the rotation workflow consumes.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Current sequence number of an account.
    async fn sequence_number(&self, address: &AccountAddress) -> Result<u64>;

    /// Submit a countersigned rotation, paid for and signed by `signer`
    /// (the current controller of `authorization.from_address`).
    ///
    /// Errors with [`RotationError::Submission`] when the chain refuses the
    /// transaction outright.
    async fn submit_rotation(
        &self,
        signer: &Identity,
        authorization: &RotationAuthorization,
    ) -> Result<PendingOperation>;

    /// Poll the status of a submitted transaction once.
    async fn poll_status(&self, handle: &TxnHandle) -> Result<ChainStatus>;

    /// Address originally owned by an account now controlled by the key
    /// whose natural address is `controller`.
    ///
    /// Errors with [`RotationError::NotFound`] if no rotation onto that key
    /// was recorded.
    async fn resolve_original_address(&self, controller: &AccountAddress)
        -> Result<AccountAddress>;

    /// Poll until the transaction is final or `policy.timeout` elapses.
    ///
    /// The policy is clamped to [`MAX_FINALITY_TIMEOUT`] and
    /// [`MIN_POLL_INTERVAL`]. Transient errors are logged and polling
    /// continues; the last one is reported with `TimedOut`. Any other
    /// error aborts the wait. Dropping the returned future only stops local waiting; it
    /// cannot retract a transaction the chain already accepted.
    async fn await_finality(
        &self,
        handle: &TxnHandle,
        policy: &FinalityPolicy,
    ) -> Result<FinalStatus> {
        let started = Instant::now();
        let timeout = policy.timeout.min(MAX_FINALITY_TIMEOUT);
        let poll_interval = policy.poll_interval.max(MIN_POLL_INTERVAL);
        let deadline = started + timeout;
        let mut last_error: Option<String> = None;
        let mut polls: u64 = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(FinalStatus::TimedOut {
                    waited: started.elapsed(),
                    last_error,
                });
            }

            polls += 1;
            match tokio::time::timeout(remaining, self.poll_status(handle)).await {
                Ok(Ok(ChainStatus::Committed { version })) => {
                    log::debug!("{handle} committed after {polls} poll(s)");
                    return Ok(FinalStatus::Confirmed { version });
                }
                Ok(Ok(ChainStatus::Failed { reason })) => {
                    log::debug!("{handle} failed on chain: {reason}");
                    return Ok(FinalStatus::Rejected { reason });
                }
                Ok(Ok(ChainStatus::Pending)) => {
                    log::debug!("{handle} pending (poll {polls})");
                }
                Ok(Err(e)) if e.is_transient() => {
                    log::warn!("{handle} status poll failed, will retry: {e}");
                    last_error = Some(e.to_string());
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    last_error = Some("status poll did not answer before the deadline".into());
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(poll_interval.min(remaining)).await;
        }
    }
}
