//! REST gateway — drives a rotation through a fullnode's HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{RotationError, Result};
use crate::identity::{AccountAddress, Identity};
use crate::rotation::RotationAuthorization;

use super::transaction::{EntryFunction, RawTransaction};
use super::{ChainGateway, ChainStatus, PendingOperation, TxnHandle};

/// Content type for BCS-encoded signed transactions.
pub const BCS_SIGNED_TRANSACTION: &str = "application/x.aptos.signed_transaction+bcs";

/// Resource holding the originating-address table.
const ORIGINATING_ADDRESS_RESOURCE: &str = "0x1::account::OriginatingAddress";

/// Gas and expiry for submitted transactions. Fees are fixed, not estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSettings {
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    /// How long the transaction stays valid after submission.
    pub transaction_ttl: Duration,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            max_gas_amount: 2_000,
            gas_unit_price: 100,
            transaction_ttl: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LedgerInfo {
    chain_id: u8,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct SubmittedTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionInfo {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OriginatingAddressResource {
    data: OriginatingAddressData,
}

#[derive(Debug, Deserialize)]
struct OriginatingAddressData {
    address_map: TableHandle,
}

#[derive(Debug, Deserialize)]
struct TableHandle {
    handle: String,
}

#[derive(Debug, Serialize)]
struct TableItemRequest<'a> {
    key_type: &'a str,
    value_type: &'a str,
    key: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// HTTP client for a chain fullnode.
pub struct RestGateway {
    client: Client,
    base_url: String,
    gas: GasSettings,
    chain_id: Option<u8>,
}

impl RestGateway {
    /// Create a gateway for a node endpoint such as
    /// `https://fullnode.devnet.aptoslabs.com/v1`.
    pub fn new(endpoint: &str) -> Result<Self> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| RotationError::InvalidConfig(format!("endpoint {endpoint}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RotationError::InvalidConfig(format!(
                "endpoint must be http(s), got {}",
                url.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            gas: GasSettings::default(),
            chain_id: None,
        })
    }

    pub fn with_gas(mut self, gas: GasSettings) -> Self {
        self.gas = gas;
        self
    }

    /// Pin the chain id instead of asking the node.
    pub fn with_chain_id(mut self, chain_id: u8) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chain id, from the pinned value or the node's ledger info.
    pub async fn chain_id(&self) -> Result<u8> {
        if let Some(id) = self.chain_id {
            return Ok(id);
        }
        let info: LedgerInfo = self.get("/").await?;
        Ok(info.chain_id)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        self.handle_response(path, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        self.handle_response(path, response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            Ok(response.json().await?)
        } else if status == StatusCode::NOT_FOUND {
            Err(RotationError::NotFound(path.to_string()))
        } else {
            Err(RotationError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            })
        }
    }

    async fn submit_bcs(&self, body: Vec<u8>) -> Result<SubmittedTransaction> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(header::CONTENT_TYPE, BCS_SIGNED_TRANSACTION)
            .body(body)
            .send()
            .await
            .map_err(|e| RotationError::Submission(format!("transport: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| RotationError::Submission(format!("unreadable response: {e}")));
        }
        Err(RotationError::Submission(format!(
            "node returned {}: {}",
            status.as_u16(),
            error_message(response).await
        )))
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text)
}

#[async_trait]
impl ChainGateway for RestGateway {
    async fn sequence_number(&self, address: &AccountAddress) -> Result<u64> {
        let account: AccountData = self
            .get(&format!("/accounts/{address}"))
            .await
            .map_err(|e| match e {
                RotationError::NotFound(_) => {
                    RotationError::NotFound(format!("account {address} does not exist"))
                }
                other => other,
            })?;
        account.sequence_number.parse().map_err(|_| {
            RotationError::Serialization(format!(
                "bad sequence number {:?}",
                account.sequence_number
            ))
        })
    }

    async fn submit_rotation(
        &self,
        signer: &Identity,
        authorization: &RotationAuthorization,
    ) -> Result<PendingOperation> {
        if signer.address() != authorization.from_address {
            return Err(RotationError::Submission(format!(
                "signer {} is not the rotated account {}",
                signer.address(),
                authorization.from_address
            )));
        }

        let chain_id = self
            .chain_id()
            .await
            .map_err(|e| RotationError::Submission(format!("chain id unavailable: {e}")))?;

        let expiration = crate::time::expiration_from_now(self.gas.transaction_ttl);
        let raw = RawTransaction {
            sender: authorization.from_address,
            sequence_number: authorization.sequence_number,
            payload: EntryFunction::rotate_authentication_key(authorization)?,
            max_gas_amount: self.gas.max_gas_amount,
            gas_unit_price: self.gas.gas_unit_price,
            expiration_timestamp_secs: expiration,
            chain_id,
        };
        let signed = raw.sign(signer)?;
        let local_hash = signed.hash();

        log::debug!(
            "submitting rotation of {} (seq {}, expires {})",
            authorization.from_address,
            authorization.sequence_number,
            crate::time::secs_to_rfc3339(expiration)
        );
        let submitted = self.submit_bcs(signed.to_bcs()).await?;
        if submitted.hash != local_hash {
            log::warn!(
                "node reported hash {} but local hash is {local_hash}",
                submitted.hash
            );
        }

        Ok(PendingOperation::pending(TxnHandle::new(submitted.hash)))
    }

    async fn poll_status(&self, handle: &TxnHandle) -> Result<ChainStatus> {
        let info: TransactionInfo = match self
            .get(&format!("/transactions/by_hash/{handle}"))
            .await
        {
            Ok(info) => info,
            // Not yet visible to this node.
            Err(RotationError::NotFound(_)) => return Ok(ChainStatus::Pending),
            Err(e) => return Err(e),
        };

        if info.kind == "pending_transaction" {
            return Ok(ChainStatus::Pending);
        }
        let version = info.version.as_deref().and_then(|v| v.parse().ok());
        match info.success {
            Some(true) => Ok(ChainStatus::Committed { version }),
            Some(false) => Ok(ChainStatus::Failed {
                reason: info.vm_status.unwrap_or_else(|| "unknown".to_string()),
            }),
            None => Err(RotationError::Serialization(format!(
                "transaction {handle} of type {} has no success flag",
                info.kind
            ))),
        }
    }

    async fn resolve_original_address(
        &self,
        controller: &AccountAddress,
    ) -> Result<AccountAddress> {
        let resource: OriginatingAddressResource = self
            .get(&format!(
                "/accounts/{}/resource/{ORIGINATING_ADDRESS_RESOURCE}",
                AccountAddress::CORE
            ))
            .await?;

        let request = TableItemRequest {
            key_type: "address",
            value_type: "address",
            key: controller.to_hex(),
        };
        let path = format!("/tables/{}/item", resource.data.address_map.handle);
        self.post(&path, &request).await.map_err(|e| match e {
            RotationError::NotFound(_) => RotationError::NotFound(format!(
                "no originating address recorded for {controller}"
            )),
            other => other,
        })
    }
}
