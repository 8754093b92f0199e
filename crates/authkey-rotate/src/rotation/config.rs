//! Explicit configuration for one rotation run.

use std::time::Duration;

use zeroize::Zeroize;

use crate::error::{RotationError, Result};
use crate::gateway::{FinalityPolicy, GasSettings};
use crate::identity::{AccountAddress, Identity};

/// Everything a rotation needs, passed in rather than read from globals.
///
/// Private keys are redacted from `Debug` and zeroized on drop.
#[derive(Clone)]
pub struct RotationConfig {
    /// Fullnode REST endpoint.
    pub endpoint: String,
    /// Address being rotated. Defaults to the current key's natural address.
    pub current_address: Option<String>,
    /// Hex private key currently controlling the account.
    pub current_private_key: String,
    /// Natural address of the successor key. Informational only: after
    /// rotation the successor acts for the rotated address, and a value
    /// that does not parse is logged and ignored.
    pub successor_address: Option<String>,
    /// Hex private key taking over.
    pub successor_private_key: String,
    pub finality_timeout: Duration,
    pub poll_interval: Duration,
    pub gas: GasSettings,
    /// Pin the chain id instead of asking the node.
    pub chain_id: Option<u8>,
}

impl RotationConfig {
    pub fn new(
        endpoint: impl Into<String>,
        current_private_key: impl Into<String>,
        successor_private_key: impl Into<String>,
    ) -> Self {
        let policy = FinalityPolicy::default();
        Self {
            endpoint: endpoint.into(),
            current_address: None,
            current_private_key: current_private_key.into(),
            successor_address: None,
            successor_private_key: successor_private_key.into(),
            finality_timeout: policy.timeout,
            poll_interval: policy.poll_interval,
            gas: GasSettings::default(),
            chain_id: None,
        }
    }

    pub fn current_address(mut self, address: impl Into<String>) -> Self {
        self.current_address = Some(address.into());
        self
    }

    pub fn successor_address(mut self, address: impl Into<String>) -> Self {
        self.successor_address = Some(address.into());
        self
    }

    pub fn finality_timeout(mut self, timeout: Duration) -> Self {
        self.finality_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check bounds and the endpoint URL.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.endpoint).map_err(|e| {
            RotationError::InvalidConfig(format!("endpoint {:?}: {e}", self.endpoint))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RotationError::InvalidConfig(format!(
                "endpoint must be http(s), got {}",
                url.scheme()
            )));
        }
        self.finality_policy().validate()
    }

    pub fn finality_policy(&self) -> FinalityPolicy {
        FinalityPolicy {
            timeout: self.finality_timeout,
            poll_interval: self.poll_interval,
        }
    }

    /// Identity currently controlling the account.
    pub fn current_identity(&self) -> Result<Identity> {
        Identity::from_hex(&self.current_private_key, self.current_address.as_deref())
    }

    /// Identity taking over, at its (informational) own address.
    pub fn successor_identity(&self) -> Result<Identity> {
        let address = match self.successor_address.as_deref() {
            Some(raw) => match AccountAddress::from_hex(raw) {
                Ok(_) => Some(raw),
                Err(e) => {
                    log::warn!("ignoring successor address: {e}");
                    None
                }
            },
            None => None,
        };
        Identity::from_hex(&self.successor_private_key, address)
    }
}

impl std::fmt::Debug for RotationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationConfig")
            .field("endpoint", &self.endpoint)
            .field("current_address", &self.current_address)
            .field("current_private_key", &crate::identity::REDACTED)
            .field("successor_address", &self.successor_address)
            .field("successor_private_key", &crate::identity::REDACTED)
            .field("finality_timeout", &self.finality_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("gas", &self.gas)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl Drop for RotationConfig {
    fn drop(&mut self) {
        self.current_private_key.zeroize();
        self.successor_private_key.zeroize();
    }
}
