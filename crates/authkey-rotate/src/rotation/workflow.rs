//! Rotation workflow — build, submit, await finality, resolve, rebind.
//!
//! ```text
//! Built ──► Submitted ──► Confirmed ──► Resolved
//!   │           │  │  │        │
//!   ▼           │  │  ▼        ▼
//! Failed ◄──────┘  │ Rejected  Failed
//!                  ▼
//!               TimedOut
//! ```
//!
//! Nothing is retried automatically. A timed-out wait or a failed lookup
//! is resumed by the caller with a fresh workflow
//! ([`RotationWorkflow::resume_submitted`],
//! [`RotationWorkflow::resume_confirmed`]); a failed submission needs a
//! fresh authorization. Dropping a running workflow only stops local
//! waiting: a transaction the chain already accepted still executes.

use std::sync::Arc;

use crate::error::{RotationError, Result};
use crate::gateway::{
    ChainGateway, FinalStatus, FinalityPolicy, OperationStatus, PendingOperation, RestGateway,
    TxnHandle,
};
use crate::identity::{AccountAddress, Identity};

use super::config::RotationConfig;
use super::proof::RotationProofBuilder;

/// Where a rotation stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationState {
    /// Inputs validated, nothing sent yet.
    Built,
    Submitted {
        handle: TxnHandle,
    },
    Confirmed {
        handle: TxnHandle,
    },
    /// The wait bound elapsed; the transaction may still land.
    TimedOut {
        handle: TxnHandle,
    },
    Rejected {
        handle: TxnHandle,
        reason: String,
    },
    Resolved {
        handle: TxnHandle,
        address: AccountAddress,
    },
    /// `handle` is set when the failure came after submission.
    Failed {
        handle: Option<TxnHandle>,
        reason: String,
    },
}

impl RotationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Submitted { .. } => "submitted",
            Self::Confirmed { .. } => "confirmed",
            Self::TimedOut { .. } => "timed_out",
            Self::Rejected { .. } => "rejected",
            Self::Resolved { .. } => "resolved",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TimedOut { .. } | Self::Rejected { .. } | Self::Resolved { .. } | Self::Failed { .. }
        )
    }

    /// Whether the transition table allows moving to `next`.
    pub fn can_advance_to(&self, next: &RotationState) -> bool {
        use RotationState::*;
        matches!(
            (self, next),
            (Built, Submitted { .. })
                | (Built, Failed { .. })
                | (Submitted { .. }, Confirmed { .. })
                | (Submitted { .. }, TimedOut { .. })
                | (Submitted { .. }, Rejected { .. })
                | (Submitted { .. }, Failed { .. })
                | (Confirmed { .. }, Resolved { .. })
                | (Confirmed { .. }, Failed { .. })
        )
    }

    pub fn handle(&self) -> Option<&TxnHandle> {
        match self {
            Self::Built => None,
            Self::Submitted { handle }
            | Self::Confirmed { handle }
            | Self::TimedOut { handle }
            | Self::Rejected { handle, .. }
            | Self::Resolved { handle, .. } => Some(handle),
            Self::Failed { handle, .. } => handle.as_ref(),
        }
    }
}

impl std::fmt::Display for RotationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One rotation request, driven to a terminal state by [`run`](Self::run).
pub struct RotationWorkflow {
    gateway: Arc<dyn ChainGateway>,
    /// Only needed while `Built`; resumed workflows have no current key.
    current: Option<Identity>,
    from_address: AccountAddress,
    successor: Identity,
    policy: FinalityPolicy,
    operation: Option<PendingOperation>,
    state: RotationState,
}

impl RotationWorkflow {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        current: Identity,
        successor: Identity,
        policy: FinalityPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        if current.same_keypair(&successor) {
            return Err(RotationError::InvalidConfig(
                "current and successor keys are identical".into(),
            ));
        }
        Ok(Self {
            gateway,
            from_address: current.address(),
            current: Some(current),
            successor,
            policy,
            operation: None,
            state: RotationState::Built,
        })
    }

    /// Parse both secrets from `config`. Fails before touching the gateway.
    pub fn from_config(config: &RotationConfig, gateway: Arc<dyn ChainGateway>) -> Result<Self> {
        config.validate()?;
        let current = config.current_identity()?;
        let successor = config.successor_identity()?;
        Self::new(gateway, current, successor, config.finality_policy())
    }

    /// Like [`from_config`](Self::from_config), talking to `config.endpoint`.
    pub fn connect(config: &RotationConfig) -> Result<Self> {
        config.validate()?;
        // Keys first so a malformed secret never opens a connection.
        let current = config.current_identity()?;
        let successor = config.successor_identity()?;

        let mut gateway = RestGateway::new(&config.endpoint)?.with_gas(config.gas);
        if let Some(chain_id) = config.chain_id {
            gateway = gateway.with_chain_id(chain_id);
        }
        Self::new(
            Arc::new(gateway),
            current,
            successor,
            config.finality_policy(),
        )
    }

    /// Continue waiting on a rotation that previously timed out.
    pub fn resume_submitted(
        gateway: Arc<dyn ChainGateway>,
        from_address: AccountAddress,
        successor: Identity,
        handle: TxnHandle,
        policy: FinalityPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            gateway,
            current: None,
            from_address,
            successor,
            policy,
            operation: Some(PendingOperation::pending(handle.clone())),
            state: RotationState::Submitted { handle },
        })
    }

    /// Retry origin resolution for a rotation already confirmed on chain.
    pub fn resume_confirmed(
        gateway: Arc<dyn ChainGateway>,
        from_address: AccountAddress,
        successor: Identity,
        handle: TxnHandle,
        policy: FinalityPolicy,
    ) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            gateway,
            current: None,
            from_address,
            successor,
            policy,
            operation: Some(PendingOperation::confirmed(handle.clone())),
            state: RotationState::Confirmed { handle },
        })
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn from_address(&self) -> AccountAddress {
        self.from_address
    }

    pub fn successor(&self) -> &Identity {
        &self.successor
    }

    /// Last known status of the submitted transaction.
    pub fn operation(&self) -> Option<&PendingOperation> {
        self.operation.as_ref()
    }

    /// Move to `next` if the transition table allows it.
    pub fn advance(&mut self, next: RotationState) -> Result<()> {
        if !self.state.can_advance_to(&next) {
            return Err(RotationError::InvalidTransition {
                from: self.state.name().to_string(),
                to: next.name().to_string(),
            });
        }
        log::info!(
            "rotation of {}: {} -> {}",
            self.from_address,
            self.state,
            next
        );
        self.state = next;
        Ok(())
    }

    /// Drive the rotation from its current state to a terminal one.
    ///
    /// Returns the rotated identity: the successor's keypair bound to the
    /// original address.
    pub async fn run(&mut self) -> Result<Identity> {
        if matches!(self.state, RotationState::Built) {
            self.submit().await?;
        }
        if let RotationState::Submitted { handle } = self.state.clone() {
            self.await_finality(handle).await?;
        }
        match self.state.clone() {
            RotationState::Confirmed { handle } => self.resolve(handle).await,
            other => Err(RotationError::InvalidTransition {
                from: other.name().to_string(),
                to: "run".to_string(),
            }),
        }
    }

    fn fail(&mut self, handle: Option<TxnHandle>, err: RotationError) -> RotationError {
        let next = RotationState::Failed {
            handle,
            reason: err.to_string(),
        };
        match self.advance(next) {
            Ok(()) => err,
            Err(transition) => transition,
        }
    }

    fn record(&mut self, status: OperationStatus) -> Result<()> {
        match self.operation.as_mut() {
            Some(op) => op.advance(status),
            None => Ok(()),
        }
    }

    async fn submit(&mut self) -> Result<()> {
        let Some(current) = self.current.clone() else {
            return Err(RotationError::InvalidTransition {
                from: self.state.name().to_string(),
                to: "submitted".to_string(),
            });
        };

        let sequence_number = match self.gateway.sequence_number(&self.from_address).await {
            Ok(seq) => seq,
            Err(e) => {
                let err =
                    RotationError::Submission(format!("cannot read sequence number: {e}"));
                return Err(self.fail(None, err));
            }
        };

        let authorization = match RotationProofBuilder::new(&current)
            .sequence_number(sequence_number)
            .build(self.successor.derive_public_key())
            .and_then(|auth| auth.countersign(&self.successor))
        {
            Ok(auth) => auth,
            Err(e) => return Err(self.fail(None, e)),
        };

        let operation = match self
            .gateway
            .submit_rotation(&current, &authorization)
            .await
        {
            Ok(op) => op,
            Err(e) => {
                let err = match e {
                    RotationError::Submission(_) => e,
                    other => RotationError::Submission(other.to_string()),
                };
                return Err(self.fail(None, err));
            }
        };

        log::info!(
            "rotation of {} submitted as {} (seq {sequence_number})",
            self.from_address,
            operation.handle
        );
        let handle = operation.handle.clone();
        self.operation = Some(operation);
        self.advance(RotationState::Submitted { handle })
    }

    async fn await_finality(&mut self, handle: TxnHandle) -> Result<()> {
        let status = match self.gateway.await_finality(&handle, &self.policy).await {
            Ok(status) => status,
            Err(e) => {
                let err = RotationError::Finality {
                    handle: handle.clone(),
                    source: Box::new(e),
                };
                return Err(self.fail(Some(handle), err));
            }
        };
        self.record(status.operation_status())?;

        match status {
            FinalStatus::Confirmed { version } => {
                log::debug!("{handle} final at version {version:?}");
                self.advance(RotationState::Confirmed { handle })
            }
            FinalStatus::Rejected { reason } => {
                self.advance(RotationState::Rejected {
                    handle: handle.clone(),
                    reason: reason.clone(),
                })?;
                Err(RotationError::Rejected { handle, reason })
            }
            FinalStatus::TimedOut { waited, last_error } => {
                self.advance(RotationState::TimedOut {
                    handle: handle.clone(),
                })?;
                Err(RotationError::TimedOut {
                    handle,
                    waited,
                    last_error,
                })
            }
        }
    }

    async fn resolve(&mut self, handle: TxnHandle) -> Result<Identity> {
        let controller = self.successor.natural_address();
        let address = match self.gateway.resolve_original_address(&controller).await {
            Ok(address) => address,
            Err(e) => {
                let err = RotationError::Resolution {
                    handle: handle.clone(),
                    source: Box::new(e),
                };
                return Err(self.fail(Some(handle), err));
            }
        };

        if address != self.from_address {
            log::warn!(
                "{controller} resolves to {address}, expected {}",
                self.from_address
            );
        }
        self.advance(RotationState::Resolved { handle, address })?;
        Ok(self.successor.rebind(address))
    }
}

impl std::fmt::Debug for RotationWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationWorkflow")
            .field("from_address", &self.from_address)
            .field("successor", &self.successor)
            .field("policy", &self.policy)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
