//! Error types for authkey-rotate.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.

use std::time::Duration;

use crate::gateway::TxnHandle;

/// Rotation error types covering every stage of the hand-off.
#[derive(Debug, thiserror::Error)]
pub enum RotationError {
    // ── Local, pre-flight (never touch the network) ─────────────────────
    #[error("Malformed private key: {0}")]
    MalformedKey(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Chain boundary, mid-flight ──────────────────────────────────────
    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Rotation {handle} rejected by chain: {reason}")]
    Rejected { handle: TxnHandle, reason: String },

    #[error("Rotation {handle} not final after {}ms{}", waited.as_millis(), last_error.as_ref().map(|e| format!(" (last error: {e})")).unwrap_or_default())]
    TimedOut {
        handle: TxnHandle,
        waited: Duration,
        last_error: Option<String>,
    },

    #[error("Rotation {handle} submitted but its status is unknown: {source}")]
    Finality {
        handle: TxnHandle,
        #[source]
        source: Box<RotationError>,
    },

    // ── Post-confirmation ───────────────────────────────────────────────
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rotation {handle} confirmed but original address unresolved: {source}")]
    Resolution {
        handle: TxnHandle,
        #[source]
        source: Box<RotationError>,
    },

    // ── Plumbing ────────────────────────────────────────────────────────
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Chain API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl RotationError {
    /// True for errors raised before any gateway call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedKey(_)
                | Self::InvalidKeyLength { .. }
                | Self::InvalidAddress(_)
                | Self::Signing(_)
                | Self::InvalidConfig(_)
        )
    }

    /// True for network hiccups and server-side failures that are safe
    /// to retry for read-only calls.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The transaction handle this error refers to, if the rotation got
    /// far enough to have one.
    pub fn handle(&self) -> Option<&TxnHandle> {
        match self {
            Self::Rejected { handle, .. }
            | Self::TimedOut { handle, .. }
            | Self::Finality { handle, .. }
            | Self::Resolution { handle, .. } => Some(handle),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RotationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Serialization(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for RotationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, RotationError>;
