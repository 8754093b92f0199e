//! In-memory gateway — a deterministic stand-in for a chain.
//!
//! Accounts, the originating-address table and submitted transactions
//! live in process memory. Submissions go through the same admission
//! checks a node applies (account exists, sequence number, sender key),
//! and execution re-verifies both rotation proofs. Outcomes and failure
//! modes can be scripted for tests and dry runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::crypto::hash;
use crate::error::{RotationError, Result};
use crate::identity::{AccountAddress, AuthenticationKey, Identity};
use crate::rotation::RotationAuthorization;

use super::{ChainGateway, ChainStatus, PendingOperation, TxnHandle};

/// What happens to the next submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Execute (and normally commit) once it has been polled this many times.
    Confirm { after_polls: u32 },
    /// Abort on execution with this VM status.
    Reject { reason: String },
    /// Stay pending forever.
    NeverFinalize,
    /// Answer every status poll with a node API error.
    PollError { status: u16, message: String },
}

impl Default for ScriptedOutcome {
    fn default() -> Self {
        Self::Confirm { after_polls: 1 }
    }
}

/// Per-operation call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub sequence_number: usize,
    pub submit: usize,
    pub poll: usize,
    pub resolve: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.sequence_number + self.submit + self.poll + self.resolve
    }
}

#[derive(Debug, Clone)]
struct AccountState {
    auth_key: AuthenticationKey,
    sequence_number: u64,
}

#[derive(Debug)]
struct TxnRecord {
    authorization: RotationAuthorization,
    outcome: ScriptedOutcome,
    polls: u32,
    status: ChainStatus,
}

#[derive(Debug, Default)]
struct ChainState {
    accounts: HashMap<AccountAddress, AccountState>,
    /// Natural address of the controlling key -> originating address.
    originating: HashMap<AccountAddress, AccountAddress>,
    /// Table updates held back while indexing is paused.
    unindexed: Vec<(Option<AccountAddress>, AccountAddress, AccountAddress)>,
    txns: HashMap<TxnHandle, TxnRecord>,
    version: u64,
}

/// Simulated chain implementing [`ChainGateway`].
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<ChainState>,
    outcome: Mutex<ScriptedOutcome>,
    refusal: Mutex<Option<String>>,
    indexing_paused: Mutex<bool>,
    transient_poll_errors: AtomicU32,
    sequence_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    resolve_calls: AtomicUsize,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Create an account at `identity`'s address controlled by its key.
    pub fn create_account(&self, identity: &Identity) {
        self.state().accounts.insert(
            identity.address(),
            AccountState {
                auth_key: identity.authentication_key(),
                sequence_number: 0,
            },
        );
    }

    /// Set the outcome applied to subsequently submitted transactions.
    pub fn set_outcome(&self, outcome: ScriptedOutcome) {
        *self.outcome.lock().unwrap_or_else(|p| p.into_inner()) = outcome;
    }

    /// Refuse every submission with `reason` (or accept again with `None`).
    pub fn refuse_submissions(&self, reason: Option<String>) {
        *self.refusal.lock().unwrap_or_else(|p| p.into_inner()) = reason;
    }

    /// Make the next `count` polls fail with a transport error.
    pub fn fail_next_polls(&self, count: u32) {
        self.transient_poll_errors.store(count, Ordering::SeqCst);
    }

    /// Hold originating-address updates back, as an indexer lagging
    /// behind execution would.
    pub fn pause_indexing(&self) {
        *self.indexing_paused.lock().unwrap_or_else(|p| p.into_inner()) = true;
    }

    /// Apply held-back table updates and resume normal indexing.
    pub fn resume_indexing(&self) {
        *self.indexing_paused.lock().unwrap_or_else(|p| p.into_inner()) = false;
        let mut state = self.state();
        let pending = std::mem::take(&mut state.unindexed);
        for (old, new, origin) in pending {
            index_origin(&mut state, old, new, origin);
        }
    }

    /// Current authentication key of an account.
    pub fn auth_key_of(&self, address: &AccountAddress) -> Option<AuthenticationKey> {
        self.state().accounts.get(address).map(|a| a.auth_key)
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            sequence_number: self.sequence_calls.load(Ordering::SeqCst),
            submit: self.submit_calls.load(Ordering::SeqCst),
            poll: self.poll_calls.load(Ordering::SeqCst),
            resolve: self.resolve_calls.load(Ordering::SeqCst),
        }
    }

    fn execute(&self, state: &mut ChainState, handle: &TxnHandle) {
        let Some(record) = state.txns.get(handle) else {
            return;
        };
        let authorization = record.authorization.clone();
        let outcome = record.outcome.clone();
        let from = authorization.from_address;

        // Prologue: a competing transaction may have consumed the sequence
        // number or changed the key since admission. Such a transaction is
        // discarded without touching the account.
        let current_key = AuthenticationKey::ed25519(&authorization.current_public_key);
        let stale = match state.accounts.get(&from) {
            Some(account) if account.sequence_number != authorization.sequence_number => {
                Some("SEQUENCE_NUMBER_TOO_OLD")
            }
            Some(account) if account.auth_key != current_key => Some("INVALID_AUTH_KEY"),
            Some(_) => None,
            None => Some("SENDING_ACCOUNT_DOES_NOT_EXIST"),
        };
        if let Some(reason) = stale {
            if let Some(record) = state.txns.get_mut(handle) {
                record.status = ChainStatus::Failed {
                    reason: reason.to_string(),
                };
            }
            return;
        }

        state.version += 1;
        let version = state.version;

        let status = match outcome {
            ScriptedOutcome::Reject { reason } => ChainStatus::Failed { reason },
            _ => match authorization.verify() {
                Err(_) => ChainStatus::Failed {
                    reason: "Move abort in 0x1::account: EINVALID_PROPOSED_PUBLIC_KEY".into(),
                },
                Ok(()) => {
                    let old_key = state.accounts.get(&from).map(|a| a.auth_key);
                    let new_key = AuthenticationKey::ed25519(&authorization.new_public_key);
                    if let Some(account) = state.accounts.get_mut(&from) {
                        account.auth_key = new_key;
                    }
                    let update = (
                        old_key.map(|k| k.account_address()),
                        new_key.account_address(),
                        from,
                    );
                    if *self.indexing_paused.lock().unwrap_or_else(|p| p.into_inner()) {
                        state.unindexed.push(update);
                    } else {
                        index_origin(state, update.0, update.1, update.2);
                    }
                    ChainStatus::Committed {
                        version: Some(version),
                    }
                }
            },
        };

        // Executed transactions consume the sequence number either way.
        if let Some(account) = state.accounts.get_mut(&from) {
            account.sequence_number += 1;
        }
        if let Some(record) = state.txns.get_mut(handle) {
            record.status = status;
        }
    }
}

fn index_origin(
    state: &mut ChainState,
    old: Option<AccountAddress>,
    new: AccountAddress,
    origin: AccountAddress,
) {
    if let Some(old) = old {
        if state.originating.get(&old) == Some(&origin) {
            state.originating.remove(&old);
        }
    }
    state.originating.insert(new, origin);
}

fn handle_for(authorization: &RotationAuthorization) -> TxnHandle {
    let mut preimage = authorization.challenge().to_bytes();
    preimage.extend_from_slice(&authorization.proof.to_bytes());
    TxnHandle::new(format!("0x{}", hex::encode(hash::sha3_256(&preimage))))
}

#[async_trait]
impl ChainGateway for InMemoryGateway {
    async fn sequence_number(&self, address: &AccountAddress) -> Result<u64> {
        self.sequence_calls.fetch_add(1, Ordering::SeqCst);
        self.state()
            .accounts
            .get(address)
            .map(|a| a.sequence_number)
            .ok_or_else(|| RotationError::NotFound(format!("account {address} does not exist")))
    }

    async fn submit_rotation(
        &self,
        signer: &Identity,
        authorization: &RotationAuthorization,
    ) -> Result<PendingOperation> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.refusal.lock().unwrap_or_else(|p| p.into_inner()).clone() {
            return Err(RotationError::Submission(reason));
        }
        authorization.require_new_key_proof()?;

        let from = authorization.from_address;
        let mut state = self.state();
        let account = state
            .accounts
            .get(&from)
            .ok_or_else(|| RotationError::Submission(format!("account {from} does not exist")))?;

        if signer.address() != from {
            return Err(RotationError::Submission(format!(
                "sender {} does not match rotated account {from}",
                signer.address()
            )));
        }
        if signer.authentication_key() != account.auth_key {
            return Err(RotationError::Submission("INVALID_AUTH_KEY".into()));
        }
        if authorization.sequence_number < account.sequence_number {
            return Err(RotationError::Submission("SEQUENCE_NUMBER_TOO_OLD".into()));
        }
        if authorization.sequence_number > account.sequence_number {
            return Err(RotationError::Submission("SEQUENCE_NUMBER_TOO_NEW".into()));
        }

        let handle = handle_for(authorization);
        if state.txns.contains_key(&handle) {
            return Err(RotationError::Submission(format!(
                "transaction {handle} already submitted"
            )));
        }

        let outcome = self.outcome.lock().unwrap_or_else(|p| p.into_inner()).clone();
        state.txns.insert(
            handle.clone(),
            TxnRecord {
                authorization: authorization.clone(),
                outcome,
                polls: 0,
                status: ChainStatus::Pending,
            },
        );
        Ok(PendingOperation::pending(handle))
    }

    async fn poll_status(&self, handle: &TxnHandle) -> Result<ChainStatus> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .transient_poll_errors
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(RotationError::Transport("connection reset by peer".into()));
        }

        let mut state = self.state();
        let due = match state.txns.get_mut(handle) {
            None => return Ok(ChainStatus::Pending),
            Some(record) if record.status != ChainStatus::Pending => {
                return Ok(record.status.clone())
            }
            Some(record) => {
                record.polls += 1;
                match &record.outcome {
                    ScriptedOutcome::Confirm { after_polls } => record.polls >= *after_polls,
                    ScriptedOutcome::Reject { .. } => true,
                    ScriptedOutcome::NeverFinalize => false,
                    ScriptedOutcome::PollError { status, message } => {
                        return Err(RotationError::Api {
                            status: *status,
                            message: message.clone(),
                        })
                    }
                }
            }
        };

        if due {
            self.execute(&mut state, handle);
        }
        Ok(state
            .txns
            .get(handle)
            .map(|r| r.status.clone())
            .unwrap_or(ChainStatus::Pending))
    }

    async fn resolve_original_address(
        &self,
        controller: &AccountAddress,
    ) -> Result<AccountAddress> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.state()
            .originating
            .get(controller)
            .copied()
            .ok_or_else(|| {
                RotationError::NotFound(format!("no originating address recorded for {controller}"))
            })
    }
}
